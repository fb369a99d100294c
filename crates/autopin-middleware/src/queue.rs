//! Single-consumer event queue feeding the watchdog's cooperative loop.
//!
//! Every component that publishes notifications holds an [`Emitter`] bound
//! to its [`Endpoint`].  All emitters feed one unbounded FIFO, so delivery
//! order equals emission order, and the orchestrator drains it one envelope
//! at a time: a handler always runs to completion before the next envelope
//! is looked at.

use autopin_types::{AutopinError, Endpoint, Envelope, Event};
use tokio::sync::mpsc;
use tracing::trace;

/// Source-tagged handle for publishing into an [`EventQueue`].
#[derive(Clone, Debug)]
pub struct Emitter {
    source: Endpoint,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Emitter {
    /// The endpoint stamped on every envelope sent through this emitter.
    pub fn source(&self) -> Endpoint {
        self.source
    }

    /// Enqueue `event`.
    ///
    /// # Errors
    ///
    /// Returns [`AutopinError::Channel`] once the owning queue has been
    /// dropped.
    pub fn emit(&self, event: Event) -> Result<(), AutopinError> {
        trace!(source = ?self.source, kind = ?event.kind(), "emit");
        self.tx
            .send(Envelope::new(self.source, event))
            .map_err(|e| AutopinError::Channel(format!("event queue closed: {e}")))
    }
}

/// Unbounded FIFO of [`Envelope`]s with exactly one consumer.
#[derive(Debug)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Hand out an emitter that stamps `source` on everything it sends.
    pub fn emitter(&self, source: Endpoint) -> Emitter {
        Emitter {
            source,
            tx: self.tx.clone(),
        }
    }

    /// Pop the next envelope without waiting.
    pub fn try_next(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next envelope.
    ///
    /// The queue keeps a sender of its own, so this only returns `None` if the
    /// channel was explicitly closed.
    pub async fn next(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Number of envelopes waiting to be consumed.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelopes_keep_emission_order_across_emitters() {
        let mut queue = EventQueue::new();
        let process = queue.emitter(Endpoint::ObservedProcess);
        let os = queue.emitter(Endpoint::OsServices);

        process.emit(Event::TaskTerminated { tid: 5 }).unwrap();
        os.emit(Event::TaskCreated { tid: 6 }).unwrap();
        process.emit(Event::UserMessage { arg: 1, value: 2.0 }).unwrap();

        let order: Vec<_> = std::iter::from_fn(|| queue.try_next())
            .map(|e| (e.source, e.event))
            .collect();
        assert_eq!(
            order,
            vec![
                (Endpoint::ObservedProcess, Event::TaskTerminated { tid: 5 }),
                (Endpoint::OsServices, Event::TaskCreated { tid: 6 }),
                (Endpoint::ObservedProcess, Event::UserMessage { arg: 1, value: 2.0 }),
            ]
        );
    }

    #[test]
    fn emitter_reports_its_source() {
        let queue = EventQueue::new();
        assert_eq!(
            queue.emitter(Endpoint::SignalDispatcher).source(),
            Endpoint::SignalDispatcher
        );
    }

    #[test]
    fn emit_after_queue_dropped_fails() {
        let queue = EventQueue::new();
        let emitter = queue.emitter(Endpoint::Owner);
        drop(queue);
        assert!(matches!(
            emitter.emit(Event::Stop),
            Err(AutopinError::Channel(_))
        ));
    }

    #[tokio::test]
    async fn next_waits_for_emission() {
        let mut queue = EventQueue::new();
        let emitter = queue.emitter(Endpoint::Owner);
        assert!(queue.is_empty());

        tokio::spawn(async move {
            emitter.emit(Event::Stop).unwrap();
        });

        let envelope = queue.next().await.expect("queue must stay open");
        assert_eq!(envelope.event, Event::Stop);
        assert_eq!(queue.len(), 0);
    }
}
