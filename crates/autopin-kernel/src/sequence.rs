//! [`NameSequence`] – source of default watchdog scope names.
//!
//! Each watchdog draws exactly one number when it is constructed, whether or
//! not a `Name` option overrides the default.  Numbers start at 0, are never
//! reused, and are safe to draw from concurrently constructed watchdogs.
//!
//! Tests inject a fresh sequence so names are deterministic; production code
//! uses the process-wide [`NameSequence::global`] instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<NameSequence> = LazyLock::new(NameSequence::new);

/// Shared, monotonically increasing counter.  Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct NameSequence {
    counter: Arc<AtomicU64>,
}

impl NameSequence {
    /// A sequence whose first number is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide sequence.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Draw the next number.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Default scope name for sequence number `n`.
    pub fn default_name(n: u64) -> String {
        format!("Watchdog {n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn starts_at_zero_and_increments() {
        let seq = NameSequence::new();
        assert_eq!(seq.next(), 0);
        assert_eq!(seq.next(), 1);
        assert_eq!(NameSequence::default_name(seq.next()), "Watchdog 2");
    }

    #[test]
    fn clones_share_the_counter() {
        let a = NameSequence::new();
        let b = a.clone();
        assert_eq!(a.next(), 0);
        assert_eq!(b.next(), 1);
    }

    #[test]
    fn concurrent_draws_are_unique() {
        let seq = NameSequence::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = seq.clone();
                thread::spawn(move || (0..100).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for n in handle.join().unwrap() {
                assert!(seen.insert(n), "number {n} drawn twice");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(seq.next(), 800);
    }

    #[test]
    fn global_instances_share_state() {
        let first = NameSequence::global().next();
        let second = NameSequence::global().next();
        assert!(second > first);
    }
}
