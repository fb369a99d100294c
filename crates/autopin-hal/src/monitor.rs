//! Generic `Monitor` trait for anything that samples a performance signal of
//! the observed process.
//!
//! Monitors are created by the [`ComponentFactory`][crate::factory::ComponentFactory]
//! from the `PerformanceMonitors` option and live in the watchdog's monitor
//! set for the whole run.  Strategies read them through
//! [`StrategyEnv::monitors`][crate::strategy::StrategyEnv].

use autopin_kernel::Diagnostics;
use autopin_types::{Pid, Tid};

use crate::tags::MonitorType;

/// A performance monitor.
///
/// [`init`][Monitor::init] is called twice per run: once during the
/// initialisation pass and again right before the process id is bound.
/// Implementations must make the second call leave them in the same state as
/// a single initialisation (no duplicated counters, handles or threads).
pub trait Monitor: Send + Sync {
    /// User-supplied identifier, unique within a run.
    fn name(&self) -> &str;

    /// Implementation tag this instance was created for.
    fn monitor_type(&self) -> MonitorType;

    /// Read options and acquire resources.  Problems go to `diagnostics`.
    fn init(&mut self, diagnostics: &Diagnostics);

    /// Bind the monitor to the started observed process.
    fn set_observed_process_pid(&mut self, pid: Pid);

    /// Current sample for task `tid`.
    fn value(&mut self, tid: Tid) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingMonitor {
        inits: usize,
        pid: Option<Pid>,
    }

    impl Monitor for CountingMonitor {
        fn name(&self) -> &str {
            "counting"
        }
        fn monitor_type(&self) -> MonitorType {
            MonitorType::GPerf
        }
        fn init(&mut self, _diagnostics: &Diagnostics) {
            self.inits += 1;
        }
        fn set_observed_process_pid(&mut self, pid: Pid) {
            self.pid = Some(pid);
        }
        fn value(&mut self, tid: Tid) -> f64 {
            f64::from(tid)
        }
    }

    #[test]
    fn monitor_is_usable_as_trait_object() {
        let ctx = Diagnostics::new("test");
        let mut monitors: Vec<Box<dyn Monitor>> = vec![Box::new(CountingMonitor {
            inits: 0,
            pid: None,
        })];

        for m in &mut monitors {
            m.init(&ctx);
            m.set_observed_process_pid(77);
        }

        assert_eq!(monitors[0].name(), "counting");
        assert_eq!(monitors[0].monitor_type(), MonitorType::GPerf);
        assert!((monitors[0].value(3) - 3.0).abs() < f64::EPSILON);
    }
}
