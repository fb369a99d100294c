//! `ObservedProcess` – handle to the process being pinned.
//!
//! The handle sits between the OS and the control strategy.  It receives raw
//! OS notifications through its `on_*` handlers and republishes what the
//! strategy cares about through the emitter it was constructed with:
//!
//! | Handler | Publishes |
//! |---|---|
//! | [`on_task_created`][ObservedProcess::on_task_created] | `TaskCreated` |
//! | [`on_task_terminated`][ObservedProcess::on_task_terminated] | `TaskTerminated` |
//! | [`on_comm_channel`][ObservedProcess::on_comm_channel] | `UserMessage` for user-tagged messages |
//! | [`on_proc_terminated`][ObservedProcess::on_proc_terminated] | `ProcessExited` when the pid matches |

use autopin_kernel::Diagnostics;
use autopin_types::{CommMessage, Pid, Tid};

pub trait ObservedProcess: Send + Sync {
    /// Read options (command line, attach target, …).
    fn init(&mut self, diagnostics: &Diagnostics);

    /// Launch or attach to the process.  After a successful start
    /// [`pid`][ObservedProcess::pid] returns `Some`.
    fn start(&mut self, diagnostics: &Diagnostics);

    fn pid(&self) -> Option<Pid>;

    /// Tasks currently known to belong to the process.
    fn tasks(&self) -> Vec<Tid>;

    fn on_task_created(&mut self, tid: Tid, diagnostics: &Diagnostics);

    fn on_task_terminated(&mut self, tid: Tid, diagnostics: &Diagnostics);

    fn on_comm_channel(&mut self, message: CommMessage, diagnostics: &Diagnostics);

    /// An OS signal reported that `pid` exited with `status`.
    fn on_proc_terminated(&mut self, pid: Pid, status: i32, diagnostics: &Diagnostics);
}
