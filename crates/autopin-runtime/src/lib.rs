//! `autopin-runtime` – The watchdog
//!
//! Drives one pinning run from configuration to a live control strategy,
//! then serves the run's events until it stops.
//!
//! # Modules
//!
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]:
//!   the lifecycle sequencer.  Builds every component through the
//!   [`ComponentFactory`][autopin_hal::ComponentFactory], checks the
//!   diagnostics context at its two gates, wires the static topology, starts
//!   the observed process and announces `Ready`.  Afterwards it is the
//!   single-threaded event loop delivering notifications between components.
//! - [`phase`] – [`Phase`][phase::Phase]: the bootstrap state machine.
//! - [`settings`] – [`WatchdogSettings`][settings::WatchdogSettings]:
//!   entry policy and owner-bus capacity, with `AUTOPIN_*` overrides.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export
//!   to Jaeger, Grafana Tempo, or any OTLP-compatible collector.

pub mod phase;
pub mod settings;
pub mod telemetry;
pub mod watchdog;

pub use phase::Phase;
pub use settings::WatchdogSettings;
pub use telemetry::{init_tracing, TracerProviderGuard};
pub use watchdog::Watchdog;
