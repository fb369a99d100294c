//! The read-only key/value [`Configuration`] a watchdog is built from.
//!
//! Every option maps to an ordered list of values.  The existence check
//! ([`Configuration::count`]) returns the number of values, so "specified
//! twice" and "specified once" are distinguishable; the scalar getter returns
//! the first value.
//!
//! How the store is filled (files, command line, …) is up to the caller.
//! [`MapConfiguration`] is the in-memory implementation used by the CLI and
//! the tests.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use autopin_types::AutopinError;

/// Well-known option names read by the watchdog itself.
pub mod keys {
    /// Scope name of the watchdog run.
    pub const NAME: &str = "Name";
    /// List of monitor identifiers.
    pub const PERFORMANCE_MONITORS: &str = "PerformanceMonitors";
    /// Tag of the control strategy.
    pub const CONTROL_STRATEGY: &str = "ControlStrategy";
    /// List of data logger tags.
    pub const DATA_LOGGERS: &str = "DataLoggers";

    /// `<monitor>.type`
    pub fn monitor_type(monitor: &str) -> String {
        format!("{monitor}.type")
    }
}

/// Read-only option store.
pub trait Configuration: Send + Sync {
    /// Number of values stored under `key` (0 when absent).
    fn count(&self, key: &str) -> usize;

    /// First value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// All values stored under `key`, in order.  Empty when absent.
    fn get_list(&self, key: &str) -> Vec<String>;

    fn exists(&self, key: &str) -> bool {
        self.count(key) > 0
    }

    /// First value of `key` parsed as an integer.
    ///
    /// # Errors
    ///
    /// [`AutopinError::InvalidOption`] when the value does not parse.
    fn get_int(&self, key: &str) -> Result<Option<i64>, AutopinError> {
        parse_value(key, self.get(key))
    }

    /// First value of `key` parsed as a float.
    ///
    /// # Errors
    ///
    /// [`AutopinError::InvalidOption`] when the value does not parse.
    fn get_double(&self, key: &str) -> Result<Option<f64>, AutopinError> {
        parse_value(key, self.get(key))
    }

    /// First value of `key` read as a boolean (`true/false`, `yes/no`,
    /// `on/off`, `1/0`).
    ///
    /// # Errors
    ///
    /// [`AutopinError::InvalidOption`] for any other spelling.
    fn get_bool(&self, key: &str) -> Result<Option<bool>, AutopinError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(AutopinError::InvalidOption {
                    key: key.to_string(),
                    details: format!("\"{raw}\" is not a boolean"),
                }),
            },
        }
    }
}

fn parse_value<T>(key: &str, raw: Option<String>) -> Result<Option<T>, AutopinError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|raw| {
        raw.trim().parse::<T>().map_err(|e| AutopinError::InvalidOption {
            key: key.to_string(),
            details: format!("\"{raw}\": {e}"),
        })
    })
    .transpose()
}

/// In-memory [`Configuration`].
///
/// # Example
///
/// ```
/// use autopin_hal::config::{Configuration, MapConfiguration};
///
/// let mut cfg = MapConfiguration::new()
///     .with("PerformanceMonitors", ["m1", "m2"])
///     .with("m1.type", ["random"]);
/// cfg.apply("m2.type=gperf").unwrap();
/// cfg.apply("PerformanceMonitors+=m3").unwrap();
///
/// assert_eq!(cfg.count("PerformanceMonitors"), 3);
/// assert_eq!(cfg.get("m2.type").as_deref(), Some("gperf"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapConfiguration {
    options: BTreeMap<String, Vec<String>>,
}

impl MapConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`][Self::set].
    pub fn with<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.set(key, values);
        self
    }

    /// Replace the values stored under `key`.  An empty list keeps the key
    /// but makes it count as absent.
    pub fn set<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.options
            .insert(key.to_string(), values.into_iter().map(Into::into).collect());
    }

    /// Append one value to `key`.
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.options
            .entry(key.to_string())
            .or_default()
            .push(value.into());
    }

    /// Apply a `KEY=VALUES` or `KEY+=VALUES` assignment.  Values are separated
    /// by whitespace; `=` replaces, `+=` appends.
    ///
    /// # Errors
    ///
    /// [`AutopinError::InvalidOption`] when there is no `=` or the key is
    /// empty.
    pub fn apply(&mut self, assignment: &str) -> Result<(), AutopinError> {
        let Some((lhs, rhs)) = assignment.split_once('=') else {
            return Err(AutopinError::InvalidOption {
                key: assignment.to_string(),
                details: "expected KEY=VALUE".to_string(),
            });
        };
        let (key, append) = match lhs.strip_suffix('+') {
            Some(key) => (key.trim(), true),
            None => (lhs.trim(), false),
        };
        if key.is_empty() {
            return Err(AutopinError::InvalidOption {
                key: assignment.to_string(),
                details: "empty option name".to_string(),
            });
        }

        let values = rhs.split_whitespace();
        if append {
            for value in values {
                self.push(key, value);
            }
        } else {
            self.set(key, values);
        }
        Ok(())
    }

    /// Option names, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }
}

impl Configuration for MapConfiguration {
    fn count(&self, key: &str) -> usize {
        self.options.get(key).map_or(0, Vec::len)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.options.get(key).and_then(|v| v.first()).cloned()
    }

    fn get_list(&self, key: &str) -> Vec<String> {
        self.options.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_counts_zero() {
        let cfg = MapConfiguration::new();
        assert_eq!(cfg.count("ControlStrategy"), 0);
        assert!(!cfg.exists("ControlStrategy"));
        assert_eq!(cfg.get("ControlStrategy"), None);
        assert!(cfg.get_list("ControlStrategy").is_empty());
    }

    #[test]
    fn empty_list_counts_zero() {
        let cfg = MapConfiguration::new().with("PerformanceMonitors", Vec::<String>::new());
        assert_eq!(cfg.count("PerformanceMonitors"), 0);
        assert_eq!(cfg.keys().collect::<Vec<_>>(), vec!["PerformanceMonitors"]);
    }

    #[test]
    fn scalar_getter_returns_first_value() {
        let cfg = MapConfiguration::new().with("ControlStrategy", ["noop", "compact"]);
        assert_eq!(cfg.count("ControlStrategy"), 2);
        assert_eq!(cfg.get("ControlStrategy").as_deref(), Some("noop"));
    }

    #[test]
    fn apply_replaces_and_appends() {
        let mut cfg = MapConfiguration::new();
        cfg.apply("PerformanceMonitors = m1 m2").unwrap();
        cfg.apply("PerformanceMonitors+=m3").unwrap();
        assert_eq!(cfg.get_list("PerformanceMonitors"), vec!["m1", "m2", "m3"]);

        cfg.apply("PerformanceMonitors=m9").unwrap();
        assert_eq!(cfg.get_list("PerformanceMonitors"), vec!["m9"]);
    }

    #[test]
    fn apply_with_empty_value_clears() {
        let mut cfg = MapConfiguration::new().with("DataLoggers", ["external"]);
        cfg.apply("DataLoggers=").unwrap();
        assert_eq!(cfg.count("DataLoggers"), 0);
    }

    #[test]
    fn apply_rejects_malformed_assignments() {
        let mut cfg = MapConfiguration::new();
        assert!(matches!(
            cfg.apply("ControlStrategy"),
            Err(AutopinError::InvalidOption { .. })
        ));
        assert!(matches!(
            cfg.apply("=noop"),
            Err(AutopinError::InvalidOption { .. })
        ));
    }

    #[test]
    fn typed_getters_parse_first_value() {
        let cfg = MapConfiguration::new()
            .with("m1.rand_min", ["0.25"])
            .with("sim.pid", ["4242"])
            .with("verbose", ["yes"]);
        assert_eq!(cfg.get_double("m1.rand_min").unwrap(), Some(0.25));
        assert_eq!(cfg.get_int("sim.pid").unwrap(), Some(4242));
        assert_eq!(cfg.get_bool("verbose").unwrap(), Some(true));
        assert_eq!(cfg.get_int("missing").unwrap(), None);
    }

    #[test]
    fn typed_getters_reject_garbage() {
        let cfg = MapConfiguration::new()
            .with("m1.rand_max", ["lots"])
            .with("verbose", ["maybe"]);
        assert!(cfg.get_double("m1.rand_max").is_err());
        assert!(cfg.get_bool("verbose").is_err());
    }

    #[test]
    fn monitor_type_key() {
        assert_eq!(keys::monitor_type("m1"), "m1.type");
    }
}
