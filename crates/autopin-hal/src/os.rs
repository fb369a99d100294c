//! `OsServices` – the watchdog's window onto the operating system.
//!
//! An implementation tracks the tasks of the observed process and the
//! process's communication channel, and publishes what it sees through the
//! [`Emitter`][autopin_middleware::Emitter] handed to it at construction:
//! `TaskCreated`, `TaskTerminated` and `CommChannel` events, all routed to the
//! observed process.  It also performs the actual pinning on behalf of
//! strategies.

use autopin_kernel::Diagnostics;
use autopin_types::{AutopinError, Tid};

pub trait OsServices: Send + Sync {
    /// Acquire OS resources (trace hooks, sockets, …).
    fn init(&mut self, diagnostics: &Diagnostics);

    /// Number of execution units available for pinning.
    fn cpu_count(&self) -> usize;

    /// Restrict task `tid` to the execution units in `cpus`.
    ///
    /// # Errors
    ///
    /// [`AutopinError::System`] when the OS refuses the request.
    fn set_affinity(&self, tid: Tid, cpus: &[usize]) -> Result<(), AutopinError>;
}
