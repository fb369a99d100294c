//! `autopin-hal` – Collaborator interfaces & plugins
//!
//! Everything the watchdog talks to sits behind a trait in this crate, so
//! the sequencer never names a concrete monitor, strategy or platform.
//!
//! # Modules
//!
//! - [`config`] – the read-only [`Configuration`] store and its in-memory
//!   implementation [`MapConfiguration`].
//! - [`tags`] – the closed tag sets of the three plugin families.
//! - [`monitor`], [`strategy`], [`logger`] – the plugin traits.
//! - [`os`], [`process`] – the two platform singletons.
//! - [`factory`] – [`ComponentFactory`]: tag → constructor resolution with
//!   accumulated diagnostics.
//! - [`random`], [`noop`] – the built-in `random` monitor and `noop`
//!   strategy.
//! - [`sim`], [`sim_registry`] – a journaling simulated platform for tests
//!   and dry runs.

pub mod config;
pub mod factory;
pub mod logger;
pub mod monitor;
pub mod noop;
pub mod os;
pub mod process;
pub mod random;
pub mod sim;
pub mod sim_registry;
pub mod strategy;
pub mod tags;

pub use config::{Configuration, MapConfiguration};
pub use factory::{ComponentFactory, EntryPolicy};
pub use logger::DataLogger;
pub use monitor::Monitor;
pub use os::OsServices;
pub use process::ObservedProcess;
pub use sim_registry::{SimPlatform, SimRegistry};
pub use strategy::{ControlStrategy, StrategyEnv};
pub use tags::{LoggerType, MonitorType, StrategyType};
