//! Closed sets of implementation tags, one per plugin family.
//!
//! A tag is the symbolic name an operator writes in the configuration
//! (`m1.type = gperf`, `ControlStrategy = noop`, `DataLoggers = external`).
//! Parsing is exact and case-sensitive; anything outside the set is an
//! [`AutopinError::UnknownTag`].

use std::fmt;
use std::str::FromStr;

use autopin_types::AutopinError;

macro_rules! tag_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $family:literal {
            $($(#[$vmeta:meta])* $variant:ident => $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every tag of the family, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The configuration spelling of this tag.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AutopinError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($name::$variant),)+
                    _ => Err(AutopinError::UnknownTag {
                        family: $family,
                        tag: s.to_string(),
                    }),
                }
            }
        }
    };
}

tag_enum! {
    /// Performance monitor implementations.
    MonitorType, "monitor" {
        /// External power meter.
        ClustSafe => "clustsafe",
        /// Hardware performance counters.
        GPerf => "gperf",
        /// Uniform random samples; for testing strategies.
        Random => "random",
        /// Page migration statistics.
        PageMigrate => "pagemigrate",
    }
}

tag_enum! {
    /// Control strategy implementations.
    StrategyType, "strategy" {
        Autopin1 => "autopin1",
        Noop => "noop",
        Compact => "compact",
        Scatter => "scatter",
    }
}

tag_enum! {
    /// Data logger implementations.
    LoggerType, "logger" {
        External => "external",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_round_trips_through_its_spelling() {
        for tag in MonitorType::ALL {
            assert_eq!(tag.as_str().parse::<MonitorType>().unwrap(), *tag);
        }
        for tag in StrategyType::ALL {
            assert_eq!(tag.to_string().parse::<StrategyType>().unwrap(), *tag);
        }
        for tag in LoggerType::ALL {
            assert_eq!(tag.as_str().parse::<LoggerType>().unwrap(), *tag);
        }
    }

    #[test]
    fn families_are_closed() {
        assert_eq!(MonitorType::ALL.len(), 4);
        assert_eq!(StrategyType::ALL.len(), 4);
        assert_eq!(LoggerType::ALL.len(), 1);
    }

    #[test]
    fn unknown_tags_are_rejected_with_family() {
        let err = "perfctr".parse::<MonitorType>().unwrap_err();
        assert!(matches!(
            err,
            AutopinError::UnknownTag { family: "monitor", ref tag } if tag == "perfctr"
        ));
        assert!("unknown".parse::<StrategyType>().is_err());
        assert!("csv".parse::<LoggerType>().is_err());
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("Noop".parse::<StrategyType>().is_err());
        assert!("GPerf".parse::<MonitorType>().is_err());
    }
}
