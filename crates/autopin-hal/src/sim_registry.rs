//! [`SimRegistry`] – builds a [`ComponentFactory`] backed by the simulated
//! platform.
//!
//! The OS services and observed process are always simulated.  Plugin tags
//! are opted into one by one (or all at once); a tag that was not opted into
//! has no constructor, which the factory reports as "not available in this
//! build".
//!
//! # Example
//!
//! ```rust
//! use autopin_hal::sim_registry::SimRegistry;
//! use autopin_hal::tags::{MonitorType, StrategyType};
//!
//! let platform = SimRegistry::builder()
//!     .with_monitor(MonitorType::GPerf)
//!     .with_strategy(StrategyType::Compact)
//!     .with_pid(777)
//!     .build();
//!
//! let journal = platform.journal();
//! let factory = platform.into_factory();
//! assert!(factory.supports_monitor(MonitorType::GPerf));
//! assert!(!factory.supports_monitor(MonitorType::ClustSafe));
//! assert!(journal.entries().is_empty());
//! ```

use autopin_kernel::Diagnostics;
use autopin_middleware::Emitter;
use autopin_types::Pid;

use crate::config::Configuration;
use crate::factory::ComponentFactory;
use crate::logger::DataLogger;
use crate::monitor::Monitor;
use crate::os::OsServices;
use crate::process::ObservedProcess;
use crate::sim::{
    SimJournal, SimLogger, SimMonitor, SimOsServices, SimProcess, SimRemote, SimStrategy,
};
use crate::strategy::{ControlStrategy, StrategyEnv};
use crate::tags::{LoggerType, MonitorType, StrategyType};

/// Process id reported by the simulated process unless overridden.
pub const DEFAULT_SIM_PID: Pid = 4242;

/// CPUs reported by the simulated OS services unless overridden.
pub const DEFAULT_SIM_CPUS: usize = 4;

// ────────────────────────────────────────────────────────────────────────────
// SimRegistry builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder for a simulated [`ComponentFactory`].
pub struct SimRegistry {
    monitors: Vec<MonitorType>,
    strategies: Vec<StrategyType>,
    loggers: Vec<LoggerType>,
    builtins: bool,
    pid: Option<Pid>,
    cpus: usize,
}

impl Default for SimRegistry {
    fn default() -> Self {
        Self {
            monitors: Vec::new(),
            strategies: Vec::new(),
            loggers: Vec::new(),
            builtins: false,
            pid: Some(DEFAULT_SIM_PID),
            cpus: DEFAULT_SIM_CPUS,
        }
    }
}

impl SimRegistry {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Back monitor tag `tag` with a [`SimMonitor`].
    pub fn with_monitor(mut self, tag: MonitorType) -> Self {
        self.monitors.push(tag);
        self
    }

    /// Back strategy tag `tag` with a [`SimStrategy`].
    pub fn with_strategy(mut self, tag: StrategyType) -> Self {
        self.strategies.push(tag);
        self
    }

    /// Back logger tag `tag` with a [`SimLogger`].
    pub fn with_logger(mut self, tag: LoggerType) -> Self {
        self.loggers.push(tag);
        self
    }

    /// Back every tag of every family with a stub.
    pub fn with_all(mut self) -> Self {
        self.monitors = MonitorType::ALL.to_vec();
        self.strategies = StrategyType::ALL.to_vec();
        self.loggers = LoggerType::ALL.to_vec();
        self
    }

    /// Use the real built-in plugins (`random`, `noop`) for their tags,
    /// taking precedence over stubs.
    pub fn with_builtins(mut self) -> Self {
        self.builtins = true;
        self
    }

    pub fn with_pid(mut self, pid: Pid) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Make the simulated process start without yielding a process id.
    pub fn without_pid(mut self) -> Self {
        self.pid = None;
        self
    }

    pub fn with_cpus(mut self, cpus: usize) -> Self {
        self.cpus = cpus;
        self
    }

    /// Assemble the factory.
    pub fn build(self) -> SimPlatform {
        let journal = SimJournal::new();
        let remote = SimRemote::new();

        let os_journal = journal.clone();
        let os_remote = remote.clone();
        let cpus = self.cpus;
        let process_journal = journal.clone();
        let pid = self.pid;

        let mut factory = ComponentFactory::new(
            move |emitter: Emitter, _diagnostics: &Diagnostics| -> Box<dyn OsServices> {
                Box::new(SimOsServices::new(
                    emitter,
                    os_journal.clone(),
                    &os_remote,
                    cpus,
                ))
            },
            move |_config: &dyn Configuration,
                  _os: &dyn OsServices,
                  emitter: Emitter,
                  _diagnostics: &Diagnostics|
                  -> Box<dyn ObservedProcess> {
                Box::new(SimProcess::new(emitter, process_journal.clone(), pid))
            },
        );

        for tag in self.monitors {
            let journal = journal.clone();
            factory.register_monitor(
                tag,
                move |name: &str,
                      config: &dyn Configuration,
                      _diagnostics: &Diagnostics|
                      -> Box<dyn Monitor> {
                    Box::new(SimMonitor::new(name, tag, config, journal.clone()))
                },
            );
        }
        for tag in self.strategies {
            let journal = journal.clone();
            factory.register_strategy(
                tag,
                move |_config: &dyn Configuration,
                      _env: &mut StrategyEnv<'_>|
                      -> Box<dyn ControlStrategy> {
                    Box::new(SimStrategy::new(tag, journal.clone()))
                },
            );
        }
        for tag in self.loggers {
            let journal = journal.clone();
            factory.register_logger(
                tag,
                move |_config: &dyn Configuration,
                      _monitors: &[Box<dyn Monitor>],
                      _diagnostics: &Diagnostics|
                      -> Box<dyn DataLogger> {
                    Box::new(SimLogger::new(tag, journal.clone()))
                },
            );
        }

        if self.builtins {
            factory = factory.with_builtins();
        }

        SimPlatform {
            factory,
            journal,
            remote,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimPlatform
// ────────────────────────────────────────────────────────────────────────────

/// A simulated factory plus the handles to observe and drive it.
pub struct SimPlatform {
    factory: ComponentFactory,
    journal: SimJournal,
    remote: SimRemote,
}

impl SimPlatform {
    /// Journal shared by every component the factory creates.
    pub fn journal(&self) -> SimJournal {
        self.journal.clone()
    }

    /// Remote for injecting OS notifications.
    pub fn remote(&self) -> SimRemote {
        self.remote.clone()
    }

    pub fn into_factory(self) -> ComponentFactory {
        self.factory
    }
}
