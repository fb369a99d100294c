//! [`WatchdogSettings`] – knobs of the orchestrator itself.
//!
//! These are distinct from the watchdog *configuration* (monitors, strategy,
//! …): they tune how the sequencer treats that configuration and how the
//! owner bus is sized.  The CLI persists them as TOML.
//!
//! # Environment variables
//!
//! | Variable | Field |
//! |---|---|
//! | `AUTOPIN_ENTRY_POLICY` | `entry_policy` (`proceed` or `skip`) |
//! | `AUTOPIN_BUS_CAPACITY` | `bus_capacity` (positive integer) |

use autopin_hal::EntryPolicy;
use autopin_middleware::bus::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENTRY_POLICY_VAR: &str = "AUTOPIN_ENTRY_POLICY";
pub const BUS_CAPACITY_VAR: &str = "AUTOPIN_BUS_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogSettings {
    /// Treatment of duplicate or ambiguous plugin entries.
    #[serde(default)]
    pub entry_policy: EntryPolicy,

    /// Per-topic capacity of the owner bus.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

fn default_bus_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            entry_policy: EntryPolicy::default(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl WatchdogSettings {
    /// Apply `AUTOPIN_*` overrides from the process environment.  Invalid
    /// values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|var| std::env::var(var).ok());
    }

    /// Apply overrides looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENTRY_POLICY_VAR) {
            match raw.parse::<EntryPolicy>() {
                Ok(policy) => self.entry_policy = policy,
                Err(e) => warn!(var = ENTRY_POLICY_VAR, error = %e, "ignoring override"),
            }
        }
        if let Some(raw) = lookup(BUS_CAPACITY_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => self.bus_capacity = capacity,
                _ => warn!(var = BUS_CAPACITY_VAR, value = %raw, "ignoring override"),
            }
        }
    }
}
