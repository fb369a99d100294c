//! [`RandomMonitor`] – the `random` performance monitor.
//!
//! Returns uniformly distributed samples in `[<name>.rand_min,
//! <name>.rand_max]` (defaults `0.0` and `1.0`).  Useful for exercising a
//! strategy without touching hardware counters.

use autopin_kernel::Diagnostics;
use autopin_types::{Category, ErrorKind, Pid, Tid};
use rand::Rng;
use tracing::debug;

use crate::config::Configuration;
use crate::monitor::Monitor;
use crate::tags::MonitorType;

const DEFAULT_MIN: f64 = 0.0;
const DEFAULT_MAX: f64 = 1.0;

pub struct RandomMonitor {
    name: String,
    configured_min: Result<Option<f64>, String>,
    configured_max: Result<Option<f64>, String>,
    min: f64,
    max: f64,
    pid: Option<Pid>,
}

impl RandomMonitor {
    /// Capture the monitor's options; they are validated by
    /// [`init`][Monitor::init].
    pub fn new(name: &str, config: &dyn Configuration, _diagnostics: &Diagnostics) -> Self {
        let read = |suffix: &str| {
            config
                .get_double(&format!("{name}.{suffix}"))
                .map_err(|e| e.to_string())
        };
        Self {
            name: name.to_string(),
            configured_min: read("rand_min"),
            configured_max: read("rand_max"),
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            pid: None,
        }
    }

    /// Bound process, if any.
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    /// Effective sampling range.
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl Monitor for RandomMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn monitor_type(&self) -> MonitorType {
        MonitorType::Random
    }

    fn init(&mut self, diagnostics: &Diagnostics) {
        let bound = |configured: &Result<Option<f64>, String>, default: f64| match configured {
            Ok(value) => value.unwrap_or(default),
            Err(e) => {
                diagnostics.report(ErrorKind::BadConfig, Category::Inconsistent, e.clone());
                default
            }
        };
        let min = bound(&self.configured_min, DEFAULT_MIN);
        let max = bound(&self.configured_max, DEFAULT_MAX);

        if !min.is_finite() || !max.is_finite() {
            diagnostics.report(
                ErrorKind::BadConfig,
                Category::Inconsistent,
                format!("Range of monitor {} must be finite", self.name),
            );
            (self.min, self.max) = (DEFAULT_MIN, DEFAULT_MAX);
        } else if min > max {
            diagnostics.report(
                ErrorKind::BadConfig,
                Category::Inconsistent,
                format!(
                    "Lower bound {min} of monitor {} exceeds its upper bound {max}",
                    self.name
                ),
            );
            (self.min, self.max) = (DEFAULT_MIN, DEFAULT_MAX);
        } else if !(max - min).is_finite() {
            diagnostics.report(
                ErrorKind::BadConfig,
                Category::Inconsistent,
                format!("Range of monitor {} is too wide to sample", self.name),
            );
            (self.min, self.max) = (DEFAULT_MIN, DEFAULT_MAX);
        } else {
            (self.min, self.max) = (min, max);
        }
        debug!(monitor = %self.name, min = self.min, max = self.max, "random monitor initialised");
    }

    fn set_observed_process_pid(&mut self, pid: Pid) {
        self.pid = Some(pid);
    }

    fn value(&mut self, _tid: Tid) -> f64 {
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfiguration;

    #[test]
    fn defaults_to_unit_interval() {
        let ctx = Diagnostics::new("test");
        let cfg = MapConfiguration::new();
        let mut monitor = RandomMonitor::new("m1", &cfg, &ctx);
        monitor.init(&ctx);

        assert_eq!(monitor.range(), (0.0, 1.0));
        for tid in 0..100 {
            let v = monitor.value(tid);
            assert!((0.0..=1.0).contains(&v), "{v} out of range");
        }
        assert!(!ctx.is_error());
    }

    #[test]
    fn reads_its_own_range() {
        let ctx = Diagnostics::new("test");
        let cfg = MapConfiguration::new()
            .with("m1.rand_min", ["10"])
            .with("m1.rand_max", ["20"])
            .with("m2.rand_min", ["-5"]);
        let mut monitor = RandomMonitor::new("m1", &cfg, &ctx);
        monitor.init(&ctx);
        assert_eq!(monitor.range(), (10.0, 20.0));
    }

    #[test]
    fn inverted_range_is_reported() {
        let ctx = Diagnostics::new("test");
        let cfg = MapConfiguration::new()
            .with("m1.rand_min", ["3"])
            .with("m1.rand_max", ["1"]);
        let mut monitor = RandomMonitor::new("m1", &cfg, &ctx);
        monitor.init(&ctx);

        assert!(ctx.is_error());
        assert_eq!(ctx.count_category(&Category::Inconsistent), 1);
        assert_eq!(monitor.range(), (0.0, 1.0));
    }

    #[test]
    fn overflowing_width_falls_back_to_defaults() {
        let ctx = Diagnostics::new("test");
        let cfg = MapConfiguration::new()
            .with("m1.rand_min", ["-1e308"])
            .with("m1.rand_max", ["1e308"]);
        let mut monitor = RandomMonitor::new("m1", &cfg, &ctx);
        monitor.init(&ctx);

        assert_eq!(ctx.count_category(&Category::Inconsistent), 1);
        assert_eq!(ctx.reports()[0].kind, ErrorKind::BadConfig);
        assert_eq!(monitor.range(), (0.0, 1.0));
        let v = monitor.value(1);
        assert!((0.0..=1.0).contains(&v), "{v} out of range");
    }

    #[test]
    fn unparsable_bound_is_reported() {
        let ctx = Diagnostics::new("test");
        let cfg = MapConfiguration::new().with("m1.rand_max", ["high"]);
        let mut monitor = RandomMonitor::new("m1", &cfg, &ctx);
        monitor.init(&ctx);
        assert!(ctx.is_error());
    }

    #[test]
    fn second_init_is_equivalent_to_first() {
        let ctx = Diagnostics::new("test");
        let cfg = MapConfiguration::new()
            .with("m1.rand_min", ["2"])
            .with("m1.rand_max", ["4"]);
        let mut monitor = RandomMonitor::new("m1", &cfg, &ctx);

        monitor.init(&ctx);
        let first = monitor.range();
        monitor.init(&ctx);
        monitor.set_observed_process_pid(4242);

        assert_eq!(monitor.range(), first);
        assert_eq!(monitor.pid(), Some(4242));
        assert!(ctx.reports().is_empty());
    }

    #[test]
    fn degenerate_range_returns_the_bound() {
        let ctx = Diagnostics::new("test");
        let cfg = MapConfiguration::new()
            .with("m1.rand_min", ["0.5"])
            .with("m1.rand_max", ["0.5"]);
        let mut monitor = RandomMonitor::new("m1", &cfg, &ctx);
        monitor.init(&ctx);
        assert!((monitor.value(1) - 0.5).abs() < f64::EPSILON);
    }
}
