//! Static publish/subscribe graph of a watchdog run.
//!
//! The topology is a plain table of [`Route`]s.  Each route says: when
//! `publisher` emits an event of kind `event`, hand it to `subscriber`'s
//! handler for that kind.  Nothing is registered at runtime beyond the two
//! fixed batches below, so the whole graph can be read (and asserted on) as
//! data.
//!
//! | Batch | Installed | Routes |
//! |---|---|---|
//! | [`CONTEXT_ROUTES`] | when the diagnostics context is created | error transition → stop, owner stop request → stop |
//! | [`COMPONENT_ROUTES`] | after every component initialised, before the process starts | OS services → process, signals → process, process → strategy, process exit → stop, ready → strategy |

use autopin_types::{Endpoint, EventKind};

/// One edge of the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub publisher: Endpoint,
    pub event: EventKind,
    pub subscriber: Endpoint,
}

impl Route {
    pub const fn new(publisher: Endpoint, event: EventKind, subscriber: Endpoint) -> Self {
        Self {
            publisher,
            event,
            subscriber,
        }
    }
}

/// Edges that must exist from the moment the diagnostics context exists.
pub const CONTEXT_ROUTES: &[Route] = &[
    Route::new(Endpoint::Diagnostics, EventKind::ErrorRaised, Endpoint::Watchdog),
    Route::new(Endpoint::Owner, EventKind::Stop, Endpoint::Watchdog),
];

/// Edges between the constructed components.
pub const COMPONENT_ROUTES: &[Route] = &[
    // OS services → observed process
    Route::new(Endpoint::OsServices, EventKind::TaskCreated, Endpoint::ObservedProcess),
    Route::new(Endpoint::OsServices, EventKind::TaskTerminated, Endpoint::ObservedProcess),
    Route::new(Endpoint::OsServices, EventKind::CommChannel, Endpoint::ObservedProcess),
    // Signal dispatcher → observed process
    Route::new(Endpoint::SignalDispatcher, EventKind::ProcTerminated, Endpoint::ObservedProcess),
    // Observed process → control strategy
    Route::new(Endpoint::ObservedProcess, EventKind::TaskCreated, Endpoint::ControlStrategy),
    Route::new(Endpoint::ObservedProcess, EventKind::TaskTerminated, Endpoint::ControlStrategy),
    Route::new(Endpoint::ObservedProcess, EventKind::UserMessage, Endpoint::ControlStrategy),
    // Observed process → watchdog
    Route::new(Endpoint::ObservedProcess, EventKind::ProcessExited, Endpoint::Watchdog),
    // Watchdog → control strategy
    Route::new(Endpoint::Watchdog, EventKind::Ready, Endpoint::ControlStrategy),
];

/// The installed routing table.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    routes: Vec<Route>,
}

impl Topology {
    /// Create an empty topology with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `route`.  Installing an existing route again is a no-op, so a
    /// subscriber never receives the same envelope twice.
    pub fn connect(&mut self, route: Route) {
        if !self.routes.contains(&route) {
            self.routes.push(route);
        }
    }

    /// Install every route of `batch` in order.
    pub fn connect_all(&mut self, batch: &[Route]) {
        for route in batch {
            self.connect(*route);
        }
    }

    /// Subscribers wired to `event` from `publisher`, in installation order.
    pub fn subscribers(
        &self,
        publisher: Endpoint,
        event: EventKind,
    ) -> impl Iterator<Item = Endpoint> + '_ {
        self.routes
            .iter()
            .filter(move |r| r.publisher == publisher && r.event == event)
            .map(|r| r.subscriber)
    }

    /// `true` if `route` has been installed.
    pub fn contains(&self, route: &Route) -> bool {
        self.routes.contains(route)
    }

    /// All installed routes, in installation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
