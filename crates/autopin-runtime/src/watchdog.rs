//! [`Watchdog`] – bootstraps one pinning run and serves its events.
//!
//! [`Watchdog::run`] is a fixed, synchronous sequence:
//!
//! | Step | Phase reached | Action |
//! |---|---|---|
//! | 1 | `ContextReady` | install the context routes (error → stop, owner stop → stop) |
//! | 2 | `ServicesReady` | create the OS services |
//! | 3 | `MonitorsBuilt` | create the monitor set |
//! | 4 | `ProcessBuilt` | create the observed process |
//! | 5 | `StrategyBuilt` | create the control strategy |
//! | 6 | `LoggersBuilt` | create the data loggers |
//! | 7 | `ConfigGate1` | **gate**: halt if anything was reported |
//! | 8 | | `init` OS services, monitors, process, strategy, loggers |
//! | 9 | `Initialized` | **gate**: halt if anything was reported |
//! | 10 | `WiringDone` | install the component routes |
//! | 11 | `ProcessStarted` | start the process and read its pid |
//! | 12 | | second monitor `init`, bind the pid |
//! | 13 | `Live` | emit `Ready` |
//!
//! A halt leaves the watchdog in [`Phase::Failed`] and publishes `Stop` on
//! the owner bus.  Nothing is started or initialised past a failed gate.
//!
//! After `run`, events flow through a single FIFO queue.  [`Watchdog::serve`]
//! drains it until `Stop`; [`Watchdog::dispatch_pending`] drains whatever is
//! queued right now.  Each envelope is handed to the subscribers the
//! [`Topology`] lists for its publisher and kind; envelopes without a route
//! are dropped.
//!
//! # Example
//!
//! ```rust
//! use autopin_hal::{MapConfiguration, SimRegistry};
//! use autopin_runtime::{Phase, Watchdog, WatchdogSettings};
//!
//! let config = MapConfiguration::new()
//!     .with("PerformanceMonitors", ["m1"])
//!     .with("m1.type", ["random"])
//!     .with("ControlStrategy", ["noop"]);
//! let factory = SimRegistry::builder().with_builtins().build().into_factory();
//!
//! let mut watchdog = Watchdog::new(Box::new(config), factory, &WatchdogSettings::default());
//! assert_eq!(watchdog.run(), Phase::Live);
//! assert_eq!(watchdog.pid(), Some(4242));
//! ```

use autopin_hal::config::keys;
use autopin_hal::{
    ComponentFactory, Configuration, ControlStrategy, DataLogger, Monitor, ObservedProcess,
    OsServices, StrategyEnv,
};
use autopin_kernel::{Diagnostics, NameSequence};
use autopin_middleware::{
    COMPONENT_ROUTES, CONTEXT_ROUTES, Emitter, EventBus, EventQueue, Topic, TopicReceiver,
    Topology,
};
use autopin_types::{Category, Endpoint, Envelope, ErrorKind, Event, Pid};
use tracing::{debug, info, info_span, warn};

use crate::phase::Phase;
use crate::settings::WatchdogSettings;

// ─────────────────────────────────────────────────────────────────────────────
// Watchdog
// ─────────────────────────────────────────────────────────────────────────────

/// Owner of every component of one run.
///
/// Components never hold references to each other; the watchdog lends them
/// what they need for the duration of each call.
pub struct Watchdog {
    config: Box<dyn Configuration>,
    factory: ComponentFactory,
    diagnostics: Diagnostics,
    queue: EventQueue,
    bus: EventBus,
    topology: Topology,
    phase: Phase,
    os: Option<Box<dyn OsServices>>,
    monitors: Vec<Box<dyn Monitor>>,
    process: Option<Box<dyn ObservedProcess>>,
    strategy: Option<Box<dyn ControlStrategy>>,
    loggers: Vec<Box<dyn DataLogger>>,
    pid: Option<Pid>,
    stopped: bool,
}

impl Watchdog {
    /// Create a watchdog named from the process-wide [`NameSequence`].
    pub fn new(
        config: Box<dyn Configuration>,
        factory: ComponentFactory,
        settings: &WatchdogSettings,
    ) -> Self {
        Self::with_sequence(config, factory, settings, &NameSequence::global())
    }

    /// Create a watchdog drawing its default name from `sequence`.
    ///
    /// One number is drawn even when the configuration sets `Name`.
    pub fn with_sequence(
        config: Box<dyn Configuration>,
        factory: ComponentFactory,
        settings: &WatchdogSettings,
        sequence: &NameSequence,
    ) -> Self {
        let number = sequence.next();
        let name = config
            .get(keys::NAME)
            .unwrap_or_else(|| NameSequence::default_name(number));

        let queue = EventQueue::new();
        let errors = queue.emitter(Endpoint::Diagnostics);
        let diagnostics = Diagnostics::with_notifier(name, move |scope, diagnostic| {
            let _ = errors.emit(Event::ErrorRaised {
                scope: scope.to_string(),
                kind: diagnostic.kind,
                category: diagnostic.category.clone(),
                message: diagnostic.message.clone(),
            });
        });

        Self {
            config,
            factory: factory.with_entry_policy(settings.entry_policy),
            diagnostics,
            queue,
            bus: EventBus::new(settings.bus_capacity),
            topology: Topology::new(),
            phase: Phase::Created,
            os: None,
            monitors: Vec::new(),
            process: None,
            strategy: None,
            loggers: Vec::new(),
            pid: None,
            stopped: false,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn name(&self) -> &str {
        self.diagnostics.name()
    }

    /// Process id of the observed process once started.
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    /// Identifiers of the monitor set, in creation order.
    pub fn monitor_names(&self) -> Vec<&str> {
        self.monitors.iter().map(|m| m.name()).collect()
    }

    /// `true` once `Stop` has been published.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Watch the owner bus.  Subscribe before [`run`][Self::run] to see the
    /// lifecycle signals it publishes.
    pub fn subscribe(&self, topic: Topic) -> TopicReceiver {
        self.bus.subscribe_to(topic)
    }

    /// Emitter for OS-level process-termination signals
    /// (`Event::ProcTerminated`).
    pub fn signal_dispatcher(&self) -> Emitter {
        self.queue.emitter(Endpoint::SignalDispatcher)
    }

    /// Emitter through which the owner requests a stop (`Event::Stop`).
    pub fn stop_handle(&self) -> Emitter {
        self.queue.emitter(Endpoint::Owner)
    }

    // ── Bootstrap ────────────────────────────────────────────────────────────

    /// Bootstrap the run and return the phase reached: [`Phase::Live`] or
    /// [`Phase::Failed`].
    ///
    /// Calling it again does nothing and returns the current phase.
    pub fn run(&mut self) -> Phase {
        if self.phase != Phase::Created {
            debug!(scope = %self.name(), phase = %self.phase, "bootstrap already attempted");
            return self.phase;
        }
        let span = info_span!("watchdog_run", scope = %self.diagnostics.name());
        let _enter = span.enter();

        // 1. context
        self.topology.connect_all(CONTEXT_ROUTES);
        self.advance(Phase::ContextReady);

        // 2–6. construction
        let os = self
            .factory
            .create_os_services(self.queue.emitter(Endpoint::OsServices), &self.diagnostics);
        self.advance(Phase::ServicesReady);

        let mut monitors = self
            .factory
            .create_monitors(self.config.as_ref(), &self.diagnostics);
        self.advance(Phase::MonitorsBuilt);

        let process = self.factory.create_observed_process(
            self.config.as_ref(),
            os.as_ref(),
            self.queue.emitter(Endpoint::ObservedProcess),
            &self.diagnostics,
        );
        self.advance(Phase::ProcessBuilt);

        let strategy = {
            let mut env = StrategyEnv {
                process: process.as_ref(),
                os: os.as_ref(),
                monitors: &mut monitors,
                diagnostics: &self.diagnostics,
            };
            self.factory.create_strategy(self.config.as_ref(), &mut env)
        };
        self.advance(Phase::StrategyBuilt);

        let loggers = self
            .factory
            .create_loggers(self.config.as_ref(), &monitors, &self.diagnostics);
        self.os = Some(os);
        self.monitors = monitors;
        self.process = Some(process);
        self.strategy = strategy;
        self.loggers = loggers;
        self.advance(Phase::LoggersBuilt);

        // 7. gate 1
        if self.diagnostics.is_error() {
            return self.fail("construction");
        }
        self.advance(Phase::ConfigGate1);

        // 8. initialisation, in fixed order
        self.diagnostics.info("Initializing environment ...");
        if let Some(os) = self.os.as_mut() {
            os.init(&self.diagnostics);
        }
        self.diagnostics.info("Initializing performance monitors");
        for monitor in &mut self.monitors {
            monitor.init(&self.diagnostics);
        }
        if let Some(process) = self.process.as_mut() {
            process.init(&self.diagnostics);
        }
        self.diagnostics.info("Initializing control strategy");
        self.with_strategy(|strategy, env| strategy.init(env));
        self.diagnostics.info("Initializing data loggers");
        for logger in &mut self.loggers {
            logger.init(&self.monitors, &self.diagnostics);
        }

        // 9. gate 2
        if self.diagnostics.is_error() {
            return self.fail("initialisation");
        }
        self.advance(Phase::Initialized);

        // 10. wiring
        self.topology.connect_all(COMPONENT_ROUTES);
        self.advance(Phase::WiringDone);

        // 11. start
        self.diagnostics.info("Connecting to the observed process ...");
        let pid = self.process.as_mut().and_then(|process| {
            process.start(&self.diagnostics);
            process.pid()
        });
        let Some(pid) = pid else {
            self.diagnostics.report(
                ErrorKind::Process,
                Category::Critical,
                "The observed process reported no process id after start",
            );
            return self.fail("process start");
        };
        self.pid = Some(pid);
        self.advance(Phase::ProcessStarted);

        // 12. bind monitors
        self.diagnostics.info("Starting control strategy ...");
        for monitor in &mut self.monitors {
            monitor.init(&self.diagnostics);
            monitor.set_observed_process_pid(pid);
        }

        // 13. ready
        if let Err(e) = self.queue.emitter(Endpoint::Watchdog).emit(Event::Ready) {
            warn!(error = %e, "could not queue ready notification");
        }
        let _ = self.bus.publish_to(
            Topic::Lifecycle,
            Envelope::new(Endpoint::Watchdog, Event::Ready),
        );
        self.advance(Phase::Live);
        info!(scope = %self.name(), pid, monitors = self.monitors.len(), "watchdog live");

        self.dispatch_pending();
        self.phase
    }

    fn advance(&mut self, phase: Phase) {
        debug!(scope = %self.diagnostics.name(), %phase, "phase");
        self.phase = phase;
    }

    fn fail(&mut self, checkpoint: &str) -> Phase {
        warn!(
            scope = %self.diagnostics.name(),
            checkpoint,
            reports = self.diagnostics.reports().len(),
            "bootstrap halted"
        );
        self.phase = Phase::Failed;
        // Only the context edges survive a failed bootstrap.
        self.topology = Topology::new();
        self.topology.connect_all(CONTEXT_ROUTES);
        self.dispatch_pending();
        self.stop("bootstrap halted");
        self.phase
    }

    // ── Event loop ───────────────────────────────────────────────────────────

    /// Deliver every queued envelope, stopping early once `Stop` has been
    /// published.  Returns the number of envelopes taken off the queue.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while !self.stopped
            && let Some(envelope) = self.queue.try_next()
        {
            self.dispatch(envelope);
            handled += 1;
        }
        handled
    }

    /// Serve events until `Stop` has been published.
    ///
    /// Returns immediately for a watchdog that has already stopped, e.g.
    /// after a failed bootstrap.
    pub async fn serve(&mut self) {
        self.dispatch_pending();
        while !self.stopped {
            match self.queue.next().await {
                Some(envelope) => self.dispatch(envelope),
                None => break,
            }
        }
        debug!(scope = %self.name(), "event loop finished");
    }

    fn dispatch(&mut self, envelope: Envelope) {
        let kind = envelope.event.kind();
        if envelope.source == Endpoint::ObservedProcess {
            let _ = self.bus.publish_to(Topic::Process, envelope.clone());
        }

        let subscribers: Vec<Endpoint> = self.topology.subscribers(envelope.source, kind).collect();
        if subscribers.is_empty() {
            debug!(source = ?envelope.source, ?kind, "no route; event dropped");
            return;
        }
        for subscriber in subscribers {
            self.deliver(subscriber, &envelope);
        }
    }

    fn deliver(&mut self, subscriber: Endpoint, envelope: &Envelope) {
        match (subscriber, &envelope.event) {
            // observed process
            (Endpoint::ObservedProcess, Event::TaskCreated { tid }) => {
                if let Some(process) = self.process.as_mut() {
                    process.on_task_created(*tid, &self.diagnostics);
                }
            }
            (Endpoint::ObservedProcess, Event::TaskTerminated { tid }) => {
                if let Some(process) = self.process.as_mut() {
                    process.on_task_terminated(*tid, &self.diagnostics);
                }
            }
            (Endpoint::ObservedProcess, Event::CommChannel(message)) => {
                if let Some(process) = self.process.as_mut() {
                    process.on_comm_channel(*message, &self.diagnostics);
                }
            }
            (Endpoint::ObservedProcess, Event::ProcTerminated { pid, status }) => {
                if let Some(process) = self.process.as_mut() {
                    process.on_proc_terminated(*pid, *status, &self.diagnostics);
                }
            }

            // control strategy
            (Endpoint::ControlStrategy, Event::TaskCreated { tid }) => {
                let tid = *tid;
                self.with_strategy(|strategy, env| strategy.on_task_created(tid, env));
            }
            (Endpoint::ControlStrategy, Event::TaskTerminated { tid }) => {
                let tid = *tid;
                self.with_strategy(|strategy, env| strategy.on_task_terminated(tid, env));
            }
            (Endpoint::ControlStrategy, Event::UserMessage { arg, value }) => {
                let (arg, value) = (*arg, *value);
                self.with_strategy(|strategy, env| strategy.on_user_message(arg, value, env));
            }
            (Endpoint::ControlStrategy, Event::Ready) => {
                self.with_strategy(|strategy, env| strategy.on_ready(env));
            }

            // watchdog
            (Endpoint::Watchdog, Event::ErrorRaised { .. }) => {
                let _ = self.bus.publish_to(Topic::Diagnostics, envelope.clone());
                self.stop("error reported");
            }
            (Endpoint::Watchdog, Event::ProcessExited) => self.stop("observed process terminated"),
            (Endpoint::Watchdog, Event::Stop) => self.stop("stop requested"),

            (subscriber, event) => {
                debug!(?subscriber, kind = ?event.kind(), "subscriber has no handler");
            }
        }
    }

    /// Lend the strategy its environment for one call.
    fn with_strategy(
        &mut self,
        f: impl FnOnce(&mut Box<dyn ControlStrategy>, &mut StrategyEnv<'_>),
    ) {
        let (Some(strategy), Some(process), Some(os)) = (
            self.strategy.as_mut(),
            self.process.as_deref(),
            self.os.as_deref(),
        ) else {
            return;
        };
        let mut env = StrategyEnv {
            process,
            os,
            monitors: &mut self.monitors,
            diagnostics: &self.diagnostics,
        };
        f(strategy, &mut env);
    }

    /// Publish `Stop` on the owner bus, at most once.
    fn stop(&mut self, reason: &str) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!(scope = %self.diagnostics.name(), reason, "watchdog stopping");
        let _ = self.bus.publish_to(
            Topic::Lifecycle,
            Envelope::new(Endpoint::Watchdog, Event::Stop),
        );
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.diagnostics.info("Watchdog destroyed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
