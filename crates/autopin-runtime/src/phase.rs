//! [`Phase`] – where a watchdog run currently stands.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bootstrap state of a [`Watchdog`][crate::watchdog::Watchdog].
///
/// Phases advance strictly in declaration order until [`Phase::Live`].
/// [`Phase::Failed`] is absorbing and can be entered from any phase once a
/// checkpoint finds the diagnostics context in its error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Created,
    ContextReady,
    ServicesReady,
    MonitorsBuilt,
    ProcessBuilt,
    StrategyBuilt,
    LoggersBuilt,
    /// Passed the first gate (construction).
    ConfigGate1,
    /// Every component initialised and the second gate passed.
    Initialized,
    WiringDone,
    ProcessStarted,
    /// Strategy notified; pinning is under way.
    Live,
    Failed,
}

impl Phase {
    /// `true` for [`Phase::Live`] and [`Phase::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Live | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
