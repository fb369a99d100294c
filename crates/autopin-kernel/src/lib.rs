//! `autopin-kernel` – Diagnostics & naming
//!
//! The part of the watchdog that does not think about pinning at all; it
//! keeps score of what went wrong and decides what a run is called.
//!
//! # Modules
//!
//! - [`diagnostics`] – [`Diagnostics`][diagnostics::Diagnostics]:
//!   the accumulating, monotonic error scope of one watchdog run.  Every
//!   component reports through it; the sequencer consults it at its gates.
//! - [`sequence`] – [`NameSequence`][sequence::NameSequence]:
//!   the injectable counter behind the default `"Watchdog <n>"` scope names.

pub mod diagnostics;
pub mod sequence;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use sequence::NameSequence;
