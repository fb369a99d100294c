//! [`ComponentFactory`] – turns configuration values into plugin instances.
//!
//! The factory maps every implementation tag to a constructor registered by
//! the embedding application.  The two singletons (OS services and observed
//! process) are mandatory and passed to [`ComponentFactory::new`]; monitor,
//! strategy and logger constructors are registered per tag.
//!
//! No constructor call fails: every configuration problem is
//! [reported][Diagnostics::report] and resolution carries on with the next
//! entry, so a single pass surfaces every independent mistake.
//!
//! # Reports
//!
//! | Situation | Kind / category |
//! |---|---|
//! | `PerformanceMonitors` empty or absent | `BadConfig` / `option_missing` |
//! | monitor identifier used twice | `BadConfig` / `inconsistent` |
//! | `<monitor>.type` absent | `BadConfig` / `option_missing` |
//! | `<monitor>.type` given more than once | `BadConfig` / `inconsistent` |
//! | `ControlStrategy` absent | `BadConfig` / `option_missing` |
//! | `ControlStrategy` given more than once | `BadConfig` / `inconsistent` |
//! | unknown tag, or known tag without constructor | `Unsupported` / `critical` |

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use autopin_kernel::Diagnostics;
use autopin_middleware::Emitter;
use autopin_types::{AutopinError, Category, ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Configuration, keys};
use crate::logger::DataLogger;
use crate::monitor::Monitor;
use crate::noop::NoopStrategy;
use crate::os::OsServices;
use crate::process::ObservedProcess;
use crate::random::RandomMonitor;
use crate::strategy::{ControlStrategy, StrategyEnv};
use crate::tags::{LoggerType, MonitorType, StrategyType};

pub type OsServicesCtor = Box<dyn Fn(Emitter, &Diagnostics) -> Box<dyn OsServices> + Send + Sync>;

pub type ProcessCtor = Box<
    dyn Fn(&dyn Configuration, &dyn OsServices, Emitter, &Diagnostics) -> Box<dyn ObservedProcess>
        + Send
        + Sync,
>;

pub type MonitorCtor =
    Box<dyn Fn(&str, &dyn Configuration, &Diagnostics) -> Box<dyn Monitor> + Send + Sync>;

pub type StrategyCtor = Box<
    dyn Fn(&dyn Configuration, &mut StrategyEnv<'_>) -> Box<dyn ControlStrategy> + Send + Sync,
>;

pub type LoggerCtor = Box<
    dyn Fn(&dyn Configuration, &[Box<dyn Monitor>], &Diagnostics) -> Box<dyn DataLogger>
        + Send
        + Sync,
>;

/// What to do with an entry that has already been reported as duplicate or
/// ambiguous (several `type` values, several control strategies).
///
/// Either way the run halts at the first gate; the policy only decides
/// whether the entry is constructed before that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPolicy {
    /// Construct the entry, using the first value.
    #[default]
    Proceed,
    /// Leave the entry out.
    Skip,
}

impl fmt::Display for EntryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryPolicy::Proceed => "proceed",
            EntryPolicy::Skip => "skip",
        })
    }
}

impl FromStr for EntryPolicy {
    type Err = AutopinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proceed" => Ok(EntryPolicy::Proceed),
            "skip" => Ok(EntryPolicy::Skip),
            other => Err(AutopinError::Settings(format!(
                "unknown entry policy \"{other}\" (expected proceed or skip)"
            ))),
        }
    }
}

/// Tag → constructor tables for every plugin family.
pub struct ComponentFactory {
    os: OsServicesCtor,
    process: ProcessCtor,
    monitors: HashMap<MonitorType, MonitorCtor>,
    strategies: HashMap<StrategyType, StrategyCtor>,
    loggers: HashMap<LoggerType, LoggerCtor>,
    entry_policy: EntryPolicy,
}

impl ComponentFactory {
    /// Create a factory with the two mandatory singleton constructors and no
    /// plugins.
    pub fn new<O, P>(os: O, process: P) -> Self
    where
        O: Fn(Emitter, &Diagnostics) -> Box<dyn OsServices> + Send + Sync + 'static,
        P: Fn(
                &dyn Configuration,
                &dyn OsServices,
                Emitter,
                &Diagnostics,
            ) -> Box<dyn ObservedProcess>
            + Send
            + Sync
            + 'static,
    {
        Self {
            os: Box::new(os),
            process: Box::new(process),
            monitors: HashMap::new(),
            strategies: HashMap::new(),
            loggers: HashMap::new(),
            entry_policy: EntryPolicy::default(),
        }
    }

    /// Register the plugins shipped with this crate: the `random` monitor and
    /// the `noop` strategy.  Replaces earlier registrations for those tags.
    pub fn with_builtins(mut self) -> Self {
        self.register_monitor(MonitorType::Random, random_monitor);
        self.register_strategy(StrategyType::Noop, noop_strategy);
        self
    }

    pub fn with_entry_policy(mut self, policy: EntryPolicy) -> Self {
        self.entry_policy = policy;
        self
    }

    pub fn entry_policy(&self) -> EntryPolicy {
        self.entry_policy
    }

    /// Register the constructor for monitor tag `tag`.  Any previous
    /// constructor for the same tag is replaced.
    pub fn register_monitor<F>(&mut self, tag: MonitorType, ctor: F)
    where
        F: Fn(&str, &dyn Configuration, &Diagnostics) -> Box<dyn Monitor> + Send + Sync + 'static,
    {
        self.monitors.insert(tag, Box::new(ctor));
    }

    pub fn register_strategy<F>(&mut self, tag: StrategyType, ctor: F)
    where
        F: Fn(&dyn Configuration, &mut StrategyEnv<'_>) -> Box<dyn ControlStrategy>
            + Send
            + Sync
            + 'static,
    {
        self.strategies.insert(tag, Box::new(ctor));
    }

    pub fn register_logger<F>(&mut self, tag: LoggerType, ctor: F)
    where
        F: Fn(&dyn Configuration, &[Box<dyn Monitor>], &Diagnostics) -> Box<dyn DataLogger>
            + Send
            + Sync
            + 'static,
    {
        self.loggers.insert(tag, Box::new(ctor));
    }

    /// Whether a constructor is registered for `tag`.
    pub fn supports_monitor(&self, tag: MonitorType) -> bool {
        self.monitors.contains_key(&tag)
    }

    pub fn supports_strategy(&self, tag: StrategyType) -> bool {
        self.strategies.contains_key(&tag)
    }

    pub fn supports_logger(&self, tag: LoggerType) -> bool {
        self.loggers.contains_key(&tag)
    }

    pub fn create_os_services(
        &self,
        emitter: Emitter,
        diagnostics: &Diagnostics,
    ) -> Box<dyn OsServices> {
        (self.os)(emitter, diagnostics)
    }

    pub fn create_observed_process(
        &self,
        config: &dyn Configuration,
        os: &dyn OsServices,
        emitter: Emitter,
        diagnostics: &Diagnostics,
    ) -> Box<dyn ObservedProcess> {
        (self.process)(config, os, emitter, diagnostics)
    }

    /// Build the monitor set named by `PerformanceMonitors`, in list order.
    pub fn create_monitors(
        &self,
        config: &dyn Configuration,
        diagnostics: &Diagnostics,
    ) -> Vec<Box<dyn Monitor>> {
        let names = config.get_list(keys::PERFORMANCE_MONITORS);
        if names.is_empty() {
            diagnostics.report(
                ErrorKind::BadConfig,
                Category::OptionMissing,
                "No performance monitor configured",
            );
        }

        let mut seen = HashSet::new();
        let mut monitors = Vec::with_capacity(names.len());

        for name in &names {
            if !seen.insert(name.as_str()) {
                diagnostics.report(
                    ErrorKind::BadConfig,
                    Category::Inconsistent,
                    format!("The identifier {name} is already assigned to another monitor"),
                );
                if self.entry_policy == EntryPolicy::Skip {
                    continue;
                }
            }

            let types = config.get_list(&keys::monitor_type(name));
            let tag = match types.as_slice() {
                [] => {
                    diagnostics.report(
                        ErrorKind::BadConfig,
                        Category::OptionMissing,
                        format!("Type for monitor \"{name}\" is not specified"),
                    );
                    continue;
                }
                [only] => only,
                [first, ..] => {
                    diagnostics.report(
                        ErrorKind::BadConfig,
                        Category::Inconsistent,
                        format!("Specified {} types for monitor {name}", types.len()),
                    );
                    if self.entry_policy == EntryPolicy::Skip {
                        continue;
                    }
                    first
                }
            };

            let Ok(monitor_type) = tag.parse::<MonitorType>() else {
                unsupported(
                    diagnostics,
                    format!("Performance monitor type \"{tag}\" is not supported"),
                );
                continue;
            };
            let Some(ctor) = self.monitors.get(&monitor_type) else {
                unsupported(
                    diagnostics,
                    format!("Performance monitor type \"{tag}\" is not available in this build"),
                );
                continue;
            };

            debug!(monitor = %name, r#type = %monitor_type, "creating performance monitor");
            monitors.push(ctor(name, config, diagnostics));
        }

        monitors
    }

    /// Build the control strategy named by `ControlStrategy`.
    ///
    /// Returns `None` when nothing could be constructed; the reason has been
    /// reported.
    pub fn create_strategy(
        &self,
        config: &dyn Configuration,
        env: &mut StrategyEnv<'_>,
    ) -> Option<Box<dyn ControlStrategy>> {
        let diagnostics = env.diagnostics;
        let values = config.get_list(keys::CONTROL_STRATEGY);
        let tag = match values.as_slice() {
            [] => {
                diagnostics.report(
                    ErrorKind::BadConfig,
                    Category::OptionMissing,
                    "No control strategy configured",
                );
                return None;
            }
            [only] => only,
            [first, ..] => {
                diagnostics.report(
                    ErrorKind::BadConfig,
                    Category::Inconsistent,
                    format!("Specified {} control strategies", values.len()),
                );
                if self.entry_policy == EntryPolicy::Skip {
                    return None;
                }
                first
            }
        };

        let Ok(strategy_type) = tag.parse::<StrategyType>() else {
            unsupported(diagnostics, format!("Control strategy \"{tag}\" is not supported"));
            return None;
        };
        let Some(ctor) = self.strategies.get(&strategy_type) else {
            unsupported(
                diagnostics,
                format!("Control strategy \"{tag}\" is not available in this build"),
            );
            return None;
        };

        debug!(strategy = %strategy_type, "creating control strategy");
        Some(ctor(config, env))
    }

    /// Build every logger listed in `DataLoggers`.  An empty list is valid.
    pub fn create_loggers(
        &self,
        config: &dyn Configuration,
        monitors: &[Box<dyn Monitor>],
        diagnostics: &Diagnostics,
    ) -> Vec<Box<dyn DataLogger>> {
        let mut loggers = Vec::new();

        for tag in config.get_list(keys::DATA_LOGGERS) {
            let Ok(logger_type) = tag.parse::<LoggerType>() else {
                unsupported(diagnostics, format!("Data logger \"{tag}\" is not supported"));
                continue;
            };
            let Some(ctor) = self.loggers.get(&logger_type) else {
                unsupported(
                    diagnostics,
                    format!("Data logger \"{tag}\" is not available in this build"),
                );
                continue;
            };

            debug!(logger = %logger_type, "creating data logger");
            loggers.push(ctor(config, monitors, diagnostics));
        }

        loggers
    }
}

fn unsupported(diagnostics: &Diagnostics, message: String) {
    diagnostics.report(ErrorKind::Unsupported, Category::Critical, message);
}

fn random_monitor(
    name: &str,
    config: &dyn Configuration,
    diagnostics: &Diagnostics,
) -> Box<dyn Monitor> {
    Box::new(RandomMonitor::new(name, config, diagnostics))
}

fn noop_strategy(
    config: &dyn Configuration,
    env: &mut StrategyEnv<'_>,
) -> Box<dyn ControlStrategy> {
    Box::new(NoopStrategy::new(config, env))
}
