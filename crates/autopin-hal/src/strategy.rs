//! `ControlStrategy` – the algorithm deciding pinning adjustments.
//!
//! A strategy does not own anything it depends on.  Every call receives a
//! [`StrategyEnv`] that lends it the observed process, the OS services, the
//! monitor set and the diagnostics context for the duration of the call.

use autopin_kernel::Diagnostics;
use autopin_types::Tid;

use crate::monitor::Monitor;
use crate::os::OsServices;
use crate::process::ObservedProcess;
use crate::tags::StrategyType;

/// Borrowed view of the components a strategy works with.
pub struct StrategyEnv<'a> {
    pub process: &'a dyn ObservedProcess,
    pub os: &'a dyn OsServices,
    pub monitors: &'a mut [Box<dyn Monitor>],
    pub diagnostics: &'a Diagnostics,
}

impl StrategyEnv<'_> {
    /// Look up a monitor by its identifier.
    pub fn monitor(&mut self, name: &str) -> Option<&mut dyn Monitor> {
        self.monitors
            .iter_mut()
            .find(|m| m.name() == name)
            .map(|m| m.as_mut() as &mut dyn Monitor)
    }
}

/// A pinning strategy.
///
/// Handlers are invoked from the watchdog's event loop, one at a time, in
/// emission order.  A strategy must not pin anything before
/// [`on_ready`][ControlStrategy::on_ready] has been called.
pub trait ControlStrategy: Send + Sync {
    fn strategy_type(&self) -> StrategyType;

    fn init(&mut self, env: &mut StrategyEnv<'_>);

    fn on_task_created(&mut self, tid: Tid, env: &mut StrategyEnv<'_>);

    fn on_task_terminated(&mut self, tid: Tid, env: &mut StrategyEnv<'_>);

    /// Tagged numeric message sent by the observed process.
    fn on_user_message(&mut self, arg: i32, value: f64, env: &mut StrategyEnv<'_>);

    /// Bootstrap finished and the process is running.
    fn on_ready(&mut self, env: &mut StrategyEnv<'_>);
}
