//! [`NoopStrategy`] – the `noop` control strategy.
//!
//! Follows the observed process's tasks and logs every notification, but
//! never changes an affinity.  Handy as a baseline run and for checking a
//! monitor configuration.

use std::collections::BTreeSet;

use autopin_types::Tid;
use tracing::{debug, info};

use crate::config::Configuration;
use crate::strategy::{ControlStrategy, StrategyEnv};
use crate::tags::StrategyType;

#[derive(Debug, Default)]
pub struct NoopStrategy {
    tasks: BTreeSet<Tid>,
    ready: bool,
}

impl NoopStrategy {
    pub fn new(_config: &dyn Configuration, _env: &mut StrategyEnv<'_>) -> Self {
        Self::default()
    }

    /// Tasks announced and not yet terminated.
    pub fn tasks(&self) -> &BTreeSet<Tid> {
        &self.tasks
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

impl ControlStrategy for NoopStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Noop
    }

    fn init(&mut self, env: &mut StrategyEnv<'_>) {
        env.diagnostics.debug("noop strategy initialised");
    }

    fn on_task_created(&mut self, tid: Tid, _env: &mut StrategyEnv<'_>) {
        self.tasks.insert(tid);
        debug!(tid, "noop: task created");
    }

    fn on_task_terminated(&mut self, tid: Tid, _env: &mut StrategyEnv<'_>) {
        self.tasks.remove(&tid);
        debug!(tid, "noop: task terminated");
    }

    fn on_user_message(&mut self, arg: i32, value: f64, _env: &mut StrategyEnv<'_>) {
        debug!(arg, value, "noop: user message");
    }

    fn on_ready(&mut self, env: &mut StrategyEnv<'_>) {
        self.ready = true;
        info!(
            scope = env.diagnostics.name(),
            tasks = self.tasks.len(),
            monitors = env.monitors.len(),
            "noop strategy live; affinities left untouched"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfiguration;
    use crate::monitor::Monitor;
    use crate::sim::{SimJournal, SimMonitor, SimOsServices, SimProcess, SimRemote};
    use crate::tags::MonitorType;
    use autopin_kernel::Diagnostics;
    use autopin_middleware::EventQueue;
    use autopin_types::Endpoint;

    struct Rig {
        ctx: Diagnostics,
        journal: SimJournal,
        os: SimOsServices,
        process: SimProcess,
        monitors: Vec<Box<dyn Monitor>>,
        _queue: EventQueue,
    }

    fn rig() -> Rig {
        let queue = EventQueue::new();
        let journal = SimJournal::new();
        let cfg = MapConfiguration::new();
        let os = SimOsServices::new(
            queue.emitter(Endpoint::OsServices),
            journal.clone(),
            &SimRemote::new(),
            2,
        );
        let process = SimProcess::new(
            queue.emitter(Endpoint::ObservedProcess),
            journal.clone(),
            Some(10),
        );
        let monitors: Vec<Box<dyn Monitor>> = vec![
            Box::new(SimMonitor::new("m1", MonitorType::GPerf, &cfg, journal.clone())),
            Box::new(SimMonitor::new("m2", MonitorType::ClustSafe, &cfg, journal.clone())),
        ];
        Rig {
            ctx: Diagnostics::new("test"),
            journal,
            os,
            process,
            monitors,
            _queue: queue,
        }
    }

    impl Rig {
        fn env(&mut self) -> StrategyEnv<'_> {
            StrategyEnv {
                process: &self.process,
                os: &self.os,
                monitors: &mut self.monitors,
                diagnostics: &self.ctx,
            }
        }
    }

    #[test]
    fn follows_task_set() {
        let mut rig = rig();
        let mut env = rig.env();
        let mut strategy = NoopStrategy::new(&MapConfiguration::new(), &mut env);

        strategy.on_task_created(10, &mut env);
        strategy.on_task_created(11, &mut env);
        strategy.on_task_terminated(10, &mut env);

        assert_eq!(strategy.tasks().iter().copied().collect::<Vec<_>>(), [11]);
    }

    #[test]
    fn ready_never_pins() {
        let mut rig = rig();
        {
            let mut env = rig.env();
            let mut strategy = NoopStrategy::new(&MapConfiguration::new(), &mut env);
            strategy.init(&mut env);
            strategy.on_task_created(10, &mut env);
            assert!(!strategy.is_ready());

            strategy.on_ready(&mut env);
            strategy.on_task_created(12, &mut env);
            strategy.on_user_message(1, 0.5, &mut env);
            assert!(strategy.is_ready());
        }

        assert!(rig.journal.with_prefix("os.affinity").is_empty());
        assert!(!rig.ctx.is_error());
    }

    #[test]
    fn env_finds_monitor_by_name() {
        let mut rig = rig();
        let mut env = rig.env();

        let m2 = env.monitor("m2").expect("m2 is configured");
        assert_eq!(m2.monitor_type(), MonitorType::ClustSafe);
        assert_eq!(m2.value(7), 7.0);
        assert!(env.monitor("m3").is_none());
    }
}
