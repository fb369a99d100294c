use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Process identifier of the observed process.
pub type Pid = i32;

/// Identifier of a single task (thread) of the observed process.
pub type Tid = i32;

/// Message received from the observed process over its communication channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommMessage {
    /// Application-defined event identifier.
    pub event_id: u32,
    /// Integer argument (phase number, user tag, …).
    pub arg: i32,
    /// Numeric payload.
    pub value: f64,
}

/// Error taxonomy used by every diagnostic report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, duplicate or inconsistent configuration option.
    BadConfig,
    /// Unrecognised or unavailable implementation tag.
    Unsupported,
    /// Failure of an OS-level facility.
    System,
    /// Failure reported by the observed process handle.
    Process,
    /// Failure reported by a performance monitor.
    Monitor,
    /// Failure reported by the control strategy.
    Strategy,
    /// Failure reported by a data logger.
    Logger,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::BadConfig => "bad_config",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::System => "system",
            ErrorKind::Process => "process",
            ErrorKind::Monitor => "monitor",
            ErrorKind::Strategy => "strategy",
            ErrorKind::Logger => "logger",
        };
        f.write_str(s)
    }
}

/// Classification label attached to a diagnostic report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    OptionMissing,
    Inconsistent,
    Critical,
    /// Collaborator-specific label.
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::OptionMissing => "option_missing",
            Category::Inconsistent => "inconsistent",
            Category::Critical => "critical",
            Category::Other(label) => label,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishers and subscribers of the watchdog's event topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// Whoever owns and drives the watchdog (CLI, daemon, test).
    Owner,
    /// The orchestrator itself.
    Watchdog,
    /// The diagnostics context of a watchdog run.
    Diagnostics,
    /// OS-level services (task tracking, affinity, comm channel).
    OsServices,
    /// Delivery point for asynchronous OS signals such as `SIGCHLD`.
    SignalDispatcher,
    /// Handle to the process being pinned.
    ObservedProcess,
    /// The selected control strategy.
    ControlStrategy,
}

/// Discriminant of an [`Event`], used as the routing key in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    TaskCreated,
    TaskTerminated,
    CommChannel,
    ProcTerminated,
    ProcessExited,
    UserMessage,
    ErrorRaised,
    Ready,
    Stop,
}

/// Payloads that travel through the watchdog's event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A new task appeared in the observed process.
    TaskCreated { tid: Tid },
    /// A task of the observed process terminated.
    TaskTerminated { tid: Tid },
    /// Raw message from the observed process's communication channel.
    CommChannel(CommMessage),
    /// An OS signal reported that process `pid` exited with `status`.
    ProcTerminated { pid: Pid, status: i32 },
    /// The observed process has terminated.
    ProcessExited,
    /// Tagged numeric message forwarded from the observed process.
    UserMessage { arg: i32, value: f64 },
    /// The diagnostics context entered its error state.
    ErrorRaised {
        scope: String,
        kind: ErrorKind,
        category: Category,
        message: String,
    },
    /// Bootstrap finished; the control strategy may start pinning.
    Ready,
    /// Shut down.
    Stop,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TaskCreated { .. } => EventKind::TaskCreated,
            Event::TaskTerminated { .. } => EventKind::TaskTerminated,
            Event::CommChannel(_) => EventKind::CommChannel,
            Event::ProcTerminated { .. } => EventKind::ProcTerminated,
            Event::ProcessExited => EventKind::ProcessExited,
            Event::UserMessage { .. } => EventKind::UserMessage,
            Event::ErrorRaised { .. } => EventKind::ErrorRaised,
            Event::Ready => EventKind::Ready,
            Event::Stop => EventKind::Stop,
        }
    }
}

/// Unified event wrapper for the watchdog's queue and owner bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Endpoint that published the event.
    pub source: Endpoint,
    pub event: Event,
}

impl Envelope {
    /// Stamp `event` with a fresh id and the current time.
    pub fn new(source: Endpoint, event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source,
            event,
        }
    }
}

/// Global error type for the fallible library APIs.
///
/// Configuration and runtime problems of a watchdog run are *not* returned
/// through this type; they are reported to the diagnostics context.
#[derive(Error, Debug)]
pub enum AutopinError {
    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Unknown {family} tag \"{tag}\"")]
    UnknownTag { family: &'static str, tag: String },

    #[error("Invalid option {key}: {details}")]
    InvalidOption { key: String, details: String },

    #[error("Settings Error: {0}")]
    Settings(String),

    #[error("System Error: {0}")]
    System(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_matches_variant() {
        assert_eq!(Event::TaskCreated { tid: 1 }.kind(), EventKind::TaskCreated);
        assert_eq!(
            Event::ProcTerminated { pid: 7, status: 0 }.kind(),
            EventKind::ProcTerminated
        );
        assert_eq!(Event::Stop.kind(), EventKind::Stop);
        assert_eq!(
            Event::UserMessage { arg: 3, value: 0.5 }.kind(),
            EventKind::UserMessage
        );
    }

    #[test]
    fn category_labels() {
        assert_eq!(Category::OptionMissing.to_string(), "option_missing");
        assert_eq!(Category::Inconsistent.to_string(), "inconsistent");
        assert_eq!(Category::Critical.to_string(), "critical");
        assert_eq!(Category::Other("timeout".into()).to_string(), "timeout");
    }

    #[test]
    fn envelope_serializes_source_and_payload() {
        let envelope = Envelope::new(
            Endpoint::ObservedProcess,
            Event::UserMessage { arg: 2, value: 1.5 },
        );
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("ObservedProcess"));
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, envelope.id);
        assert_eq!(back.event, envelope.event);
    }

    #[test]
    fn autopin_error_display() {
        let err = AutopinError::UnknownTag {
            family: "monitor",
            tag: "perfctr".into(),
        };
        assert!(err.to_string().contains("perfctr"));
        assert!(err.to_string().contains("monitor"));
    }
}
