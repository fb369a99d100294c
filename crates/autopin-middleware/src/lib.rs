//! `autopin-middleware` – Event plumbing
//!
//! Routes notifications between the watchdog's components without caring
//! about what they mean.
//!
//! # Modules
//!
//! - [`bus`] – owner-facing, typed, topic-based broadcast bus built on Tokio
//!   broadcast channels.  Carries the `Ready`/`Stop` lifecycle signals.
//! - [`queue`] – the single-consumer FIFO every component publishes into
//!   through a source-tagged [`Emitter`].
//! - [`topology`] – the static routing table deciding which subscriber
//!   handles which event from which publisher.

pub mod bus;
pub mod queue;
pub mod topology;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use queue::{Emitter, EventQueue};
pub use topology::{Route, Topology, COMPONENT_ROUTES, CONTEXT_ROUTES};
