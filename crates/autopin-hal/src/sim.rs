//! In-process simulated platform for tests and dry runs.
//!
//! Every component here implements one of the collaborator traits without
//! touching the operating system.  Instead, each call is written as a line
//! of text to a shared [`SimJournal`], so a test can assert on exactly what
//! the watchdog did and in which order.
//!
//! # Journal entries
//!
//! | Component | Entries |
//! |---|---|
//! | [`SimOsServices`] | `os.init`, `os.affinity <tid> <cpus>` |
//! | [`SimProcess`] | `process.init`, `process.start <pid>`, `process.task_created <tid>`, `process.task_terminated <tid>`, `process.comm <event> <arg> <value>`, `process.exit <pid> <status>` |
//! | [`SimMonitor`] | `monitor.init <name>`, `monitor.pid <name> <pid>` |
//! | [`SimStrategy`] | `strategy.init <tag>`, `strategy.task_created <tid>`, `strategy.task_terminated <tid>`, `strategy.user_message <arg> <value>`, `strategy.ready` |
//! | [`SimLogger`] | `logger.init <tag> <monitors>` |
//!
//! OS-side notifications (new tasks, communication-channel messages) are
//! injected through the [`SimRemote`] of the platform.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use autopin_kernel::Diagnostics;
use autopin_middleware::Emitter;
use autopin_types::{AutopinError, Category, CommMessage, ErrorKind, Event, Pid, Tid};
use tracing::debug;

use crate::config::Configuration;
use crate::logger::DataLogger;
use crate::monitor::Monitor;
use crate::os::OsServices;
use crate::process::ObservedProcess;
use crate::strategy::{ControlStrategy, StrategyEnv};
use crate::tags::{LoggerType, MonitorType, StrategyType};

/// Communication-channel event id the simulated process treats as a user
/// message.
pub const SIM_USER_EVENT: u32 = 1;

// ────────────────────────────────────────────────────────────────────────────
// Journal
// ────────────────────────────────────────────────────────────────────────────

/// Shared, append-only record of simulated calls.
#[derive(Debug, Clone, Default)]
pub struct SimJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl SimJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!(entry = %entry, "sim");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.iter().position(|e| e == entry))
    }

    /// Number of entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.iter().filter(|e| *e == entry).count())
            .unwrap_or_default()
    }

    /// Entries starting with `prefix`, oldest first.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Remote control
// ────────────────────────────────────────────────────────────────────────────

/// Lets a test play the operating system: whatever is sent here comes out of
/// the simulated OS services' emitter.
#[derive(Debug, Clone, Default)]
pub struct SimRemote {
    os: Arc<Mutex<Option<Emitter>>>,
}

impl SimRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&self, emitter: Emitter) {
        if let Ok(mut slot) = self.os.lock() {
            *slot = Some(emitter);
        }
    }

    fn emit(&self, event: Event) -> Result<(), AutopinError> {
        let emitter = self
            .os
            .lock()
            .map_err(|e| AutopinError::Channel(format!("sim remote poisoned: {e}")))?
            .clone()
            .ok_or_else(|| AutopinError::Channel("sim OS services not created yet".to_string()))?;
        emitter.emit(event)
    }

    /// Announce a new task of the observed process.
    ///
    /// # Errors
    ///
    /// [`AutopinError::Channel`] before the OS services exist or after the
    /// watchdog is gone.
    pub fn spawn_task(&self, tid: Tid) -> Result<(), AutopinError> {
        self.emit(Event::TaskCreated { tid })
    }

    /// Announce the end of a task.
    ///
    /// # Errors
    ///
    /// See [`spawn_task`][Self::spawn_task].
    pub fn end_task(&self, tid: Tid) -> Result<(), AutopinError> {
        self.emit(Event::TaskTerminated { tid })
    }

    /// Deliver a raw communication-channel message.
    ///
    /// # Errors
    ///
    /// See [`spawn_task`][Self::spawn_task].
    pub fn send_comm(&self, message: CommMessage) -> Result<(), AutopinError> {
        self.emit(Event::CommChannel(message))
    }

    /// Shorthand for a [`SIM_USER_EVENT`] message.
    ///
    /// # Errors
    ///
    /// See [`spawn_task`][Self::spawn_task].
    pub fn send_user_message(&self, arg: i32, value: f64) -> Result<(), AutopinError> {
        self.send_comm(CommMessage {
            event_id: SIM_USER_EVENT,
            arg,
            value,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OS services
// ────────────────────────────────────────────────────────────────────────────

pub struct SimOsServices {
    journal: SimJournal,
    cpus: usize,
}

impl SimOsServices {
    pub fn new(emitter: Emitter, journal: SimJournal, remote: &SimRemote, cpus: usize) -> Self {
        remote.attach(emitter);
        Self { journal, cpus }
    }
}

impl OsServices for SimOsServices {
    fn init(&mut self, _diagnostics: &Diagnostics) {
        self.journal.record("os.init");
    }

    fn cpu_count(&self) -> usize {
        self.cpus
    }

    fn set_affinity(&self, tid: Tid, cpus: &[usize]) -> Result<(), AutopinError> {
        if let Some(cpu) = cpus.iter().find(|&&cpu| cpu >= self.cpus) {
            return Err(AutopinError::System(format!(
                "cpu {cpu} out of range (0..{})",
                self.cpus
            )));
        }
        self.journal.record(format!("os.affinity {tid} {cpus:?}"));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Observed process
// ────────────────────────────────────────────────────────────────────────────

pub struct SimProcess {
    emitter: Emitter,
    journal: SimJournal,
    assigned_pid: Option<Pid>,
    pid: Option<Pid>,
    tasks: BTreeSet<Tid>,
}

impl SimProcess {
    /// `assigned_pid` is what [`start`][ObservedProcess::start] will report;
    /// `None` simulates a launch that yields no process id.
    pub fn new(emitter: Emitter, journal: SimJournal, assigned_pid: Option<Pid>) -> Self {
        Self {
            emitter,
            journal,
            assigned_pid,
            pid: None,
            tasks: BTreeSet::new(),
        }
    }

    fn publish(&self, event: Event, diagnostics: &Diagnostics) {
        if let Err(e) = self.emitter.emit(event) {
            diagnostics.report(ErrorKind::Process, Category::Critical, e.to_string());
        }
    }
}

impl ObservedProcess for SimProcess {
    fn init(&mut self, _diagnostics: &Diagnostics) {
        self.journal.record("process.init");
    }

    fn start(&mut self, diagnostics: &Diagnostics) {
        self.pid = self.assigned_pid;
        let Some(pid) = self.pid else {
            self.journal.record("process.start none");
            return;
        };
        self.journal.record(format!("process.start {pid}"));
        // The main thread is the first task.
        self.tasks.insert(pid);
        self.publish(Event::TaskCreated { tid: pid }, diagnostics);
    }

    fn pid(&self) -> Option<Pid> {
        self.pid
    }

    fn tasks(&self) -> Vec<Tid> {
        self.tasks.iter().copied().collect()
    }

    fn on_task_created(&mut self, tid: Tid, diagnostics: &Diagnostics) {
        self.journal.record(format!("process.task_created {tid}"));
        if self.tasks.insert(tid) {
            self.publish(Event::TaskCreated { tid }, diagnostics);
        }
    }

    fn on_task_terminated(&mut self, tid: Tid, diagnostics: &Diagnostics) {
        self.journal.record(format!("process.task_terminated {tid}"));
        if self.tasks.remove(&tid) {
            self.publish(Event::TaskTerminated { tid }, diagnostics);
        }
    }

    fn on_comm_channel(&mut self, message: CommMessage, diagnostics: &Diagnostics) {
        self.journal.record(format!(
            "process.comm {} {} {}",
            message.event_id, message.arg, message.value
        ));
        if message.event_id == SIM_USER_EVENT {
            self.publish(
                Event::UserMessage {
                    arg: message.arg,
                    value: message.value,
                },
                diagnostics,
            );
        }
    }

    fn on_proc_terminated(&mut self, pid: Pid, status: i32, diagnostics: &Diagnostics) {
        self.journal.record(format!("process.exit {pid} {status}"));
        if self.pid == Some(pid) {
            self.tasks.clear();
            self.publish(Event::ProcessExited, diagnostics);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Monitor
// ────────────────────────────────────────────────────────────────────────────

/// Monitor stub whose sample for a task is the task id.
///
/// Setting the option `<name>.sim_fail = true` makes
/// [`init`][Monitor::init] report a `Monitor` error.
pub struct SimMonitor {
    name: String,
    tag: MonitorType,
    journal: SimJournal,
    fail: bool,
    pid: Option<Pid>,
}

impl SimMonitor {
    pub fn new(
        name: &str,
        tag: MonitorType,
        config: &dyn Configuration,
        journal: SimJournal,
    ) -> Self {
        let fail = config
            .get_bool(&format!("{name}.sim_fail"))
            .ok()
            .flatten()
            .unwrap_or(false);
        Self {
            name: name.to_string(),
            tag,
            journal,
            fail,
            pid: None,
        }
    }
}

impl Monitor for SimMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn monitor_type(&self) -> MonitorType {
        self.tag
    }

    fn init(&mut self, diagnostics: &Diagnostics) {
        self.journal.record(format!("monitor.init {}", self.name));
        if self.fail {
            diagnostics.report(
                ErrorKind::Monitor,
                Category::Critical,
                format!("Simulated failure of monitor {}", self.name),
            );
        }
    }

    fn set_observed_process_pid(&mut self, pid: Pid) {
        self.pid = Some(pid);
        self.journal.record(format!("monitor.pid {} {pid}", self.name));
    }

    fn value(&mut self, tid: Tid) -> f64 {
        f64::from(tid)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy
// ────────────────────────────────────────────────────────────────────────────

/// Strategy stub.  Once ready it pins every known task round-robin over the
/// available CPUs, and pins new tasks as they arrive.
pub struct SimStrategy {
    tag: StrategyType,
    journal: SimJournal,
    live: bool,
    next_cpu: usize,
}

impl SimStrategy {
    pub fn new(tag: StrategyType, journal: SimJournal) -> Self {
        Self {
            tag,
            journal,
            live: false,
            next_cpu: 0,
        }
    }

    fn pin(&mut self, tid: Tid, env: &mut StrategyEnv<'_>) {
        let cpus = env.os.cpu_count().max(1);
        let cpu = self.next_cpu % cpus;
        self.next_cpu += 1;
        if let Err(e) = env.os.set_affinity(tid, &[cpu]) {
            env.diagnostics.report(
                ErrorKind::Strategy,
                Category::Other("pinning".into()),
                e.to_string(),
            );
        }
    }
}

impl ControlStrategy for SimStrategy {
    fn strategy_type(&self) -> StrategyType {
        self.tag
    }

    fn init(&mut self, _env: &mut StrategyEnv<'_>) {
        self.journal.record(format!("strategy.init {}", self.tag));
    }

    fn on_task_created(&mut self, tid: Tid, env: &mut StrategyEnv<'_>) {
        self.journal.record(format!("strategy.task_created {tid}"));
        if self.live {
            self.pin(tid, env);
        }
    }

    fn on_task_terminated(&mut self, tid: Tid, _env: &mut StrategyEnv<'_>) {
        self.journal.record(format!("strategy.task_terminated {tid}"));
    }

    fn on_user_message(&mut self, arg: i32, value: f64, _env: &mut StrategyEnv<'_>) {
        self.journal.record(format!("strategy.user_message {arg} {value}"));
    }

    fn on_ready(&mut self, env: &mut StrategyEnv<'_>) {
        self.journal.record("strategy.ready");
        self.live = true;
        for tid in env.process.tasks() {
            self.pin(tid, env);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Logger
// ────────────────────────────────────────────────────────────────────────────

pub struct SimLogger {
    tag: LoggerType,
    journal: SimJournal,
}

impl SimLogger {
    pub fn new(tag: LoggerType, journal: SimJournal) -> Self {
        Self { tag, journal }
    }
}

impl DataLogger for SimLogger {
    fn logger_type(&self) -> LoggerType {
        self.tag
    }

    fn init(&mut self, monitors: &[Box<dyn Monitor>], _diagnostics: &Diagnostics) {
        self.journal
            .record(format!("logger.init {} {}", self.tag, monitors.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfiguration;
    use autopin_middleware::EventQueue;
    use autopin_types::Endpoint;

    #[test]
    fn journal_is_shared_between_clones() {
        let journal = SimJournal::new();
        let other = journal.clone();
        journal.record("a");
        other.record("b");
        other.record("a");

        assert_eq!(journal.entries(), ["a", "b", "a"]);
        assert_eq!(journal.position("b"), Some(1));
        assert_eq!(journal.count("a"), 2);
        assert!(!journal.contains("c"));
    }

    #[test]
    fn remote_needs_os_services() {
        let remote = SimRemote::new();
        assert!(remote.spawn_task(1).is_err());

        let mut queue = EventQueue::new();
        let _os = SimOsServices::new(
            queue.emitter(Endpoint::OsServices),
            SimJournal::new(),
            &remote,
            2,
        );
        remote.spawn_task(7).unwrap();
        remote.send_user_message(3, 0.5).unwrap();

        let first = queue.try_next().unwrap();
        assert_eq!(first.source, Endpoint::OsServices);
        assert_eq!(first.event, Event::TaskCreated { tid: 7 });
        assert_eq!(
            queue.try_next().unwrap().event,
            Event::CommChannel(CommMessage {
                event_id: SIM_USER_EVENT,
                arg: 3,
                value: 0.5
            })
        );
    }

    #[test]
    fn affinity_outside_cpu_range_fails() {
        let queue = EventQueue::new();
        let journal = SimJournal::new();
        let os = SimOsServices::new(
            queue.emitter(Endpoint::OsServices),
            journal.clone(),
            &SimRemote::new(),
            2,
        );

        assert!(os.set_affinity(10, &[1]).is_ok());
        assert!(matches!(os.set_affinity(10, &[2]), Err(AutopinError::System(_))));
        assert_eq!(journal.entries(), ["os.affinity 10 [1]"]);
    }

    #[test]
    fn process_forwards_and_filters() {
        let ctx = Diagnostics::new("test");
        let mut queue = EventQueue::new();
        let mut process = SimProcess::new(
            queue.emitter(Endpoint::ObservedProcess),
            SimJournal::new(),
            Some(100),
        );

        process.start(&ctx);
        process.on_task_created(101, &ctx);
        process.on_comm_channel(
            CommMessage {
                event_id: 9,
                arg: 0,
                value: 0.0,
            },
            &ctx,
        );
        process.on_comm_channel(
            CommMessage {
                event_id: SIM_USER_EVENT,
                arg: 2,
                value: 1.5,
            },
            &ctx,
        );
        process.on_proc_terminated(55, 0, &ctx);
        process.on_proc_terminated(100, 0, &ctx);

        let events: Vec<Event> = std::iter::from_fn(|| queue.try_next())
            .map(|e| e.event)
            .collect();
        assert_eq!(
            events,
            [
                Event::TaskCreated { tid: 100 },
                Event::TaskCreated { tid: 101 },
                Event::UserMessage { arg: 2, value: 1.5 },
                Event::ProcessExited,
            ]
        );
        assert!(process.tasks().is_empty());
        assert!(!ctx.is_error());
    }

    #[test]
    fn process_without_pid() {
        let ctx = Diagnostics::new("test");
        let queue = EventQueue::new();
        let journal = SimJournal::new();
        let mut process =
            SimProcess::new(queue.emitter(Endpoint::ObservedProcess), journal.clone(), None);

        process.start(&ctx);

        assert_eq!(process.pid(), None);
        assert!(queue.is_empty());
        assert!(journal.contains("process.start none"));
    }

    #[test]
    fn monitor_failure_is_configurable() {
        let ctx = Diagnostics::new("test");
        let cfg = MapConfiguration::new().with("m1.sim_fail", ["yes"]);
        let journal = SimJournal::new();

        let mut ok = SimMonitor::new("m2", MonitorType::GPerf, &cfg, journal.clone());
        ok.init(&ctx);
        assert!(!ctx.is_error());

        let mut failing = SimMonitor::new("m1", MonitorType::GPerf, &cfg, journal.clone());
        failing.init(&ctx);
        assert!(ctx.is_error());
        assert_eq!(ctx.reports()[0].kind, ErrorKind::Monitor);
        assert_eq!(journal.entries(), ["monitor.init m2", "monitor.init m1"]);
    }
}
