//! Owner-facing, topic-based publish/subscribe bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! observer receives every message without any single observer blocking
//! the others.  The bus carries what the *outside world* may watch; the
//! watchdog's internal routing goes through the
//! [`EventQueue`][crate::queue::EventQueue] instead.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Lifecycle`] | `Ready` and `Stop`, the only externally observable lifecycle signals |
//! | [`Topic::Process`] | Mirror of the observed process's task and user-message notifications |
//! | [`Topic::Diagnostics`] | The first error raised by a watchdog run |

use autopin_types::{AutopinError, Envelope};
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered envelopes before old ones are
/// dropped for slow subscribers).
pub const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all routing topics on the owner bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Watchdog lifecycle: ready and stop.
    Lifecycle,
    /// Task and user-message notifications published by the observed process.
    Process,
    /// Error-state transitions of the diagnostics context.
    Diagnostics,
}

/// Shared owner bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    lifecycle: broadcast::Sender<Envelope>,
    process: broadcast::Sender<Envelope>,
    diagnostics: broadcast::Sender<Envelope>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (lifecycle, _) = broadcast::channel(capacity);
        let (process, _) = broadcast::channel(capacity);
        let (diagnostics, _) = broadcast::channel(capacity);
        Self {
            lifecycle,
            process,
            diagnostics,
        }
    }

    /// Publish `envelope` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the envelope,
    /// or [`AutopinError::Channel`] when nobody is listening on the topic.
    /// Publishers on this bus treat that as a normal condition.
    pub fn publish_to(&self, topic: Topic, envelope: Envelope) -> Result<usize, AutopinError> {
        self.topic_sender(topic)
            .send(envelope)
            .map_err(|_| AutopinError::Channel(format!("No subscribers for topic {topic:?}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Envelope> {
        match topic {
            Topic::Lifecycle => &self.lifecycle,
            Topic::Process => &self.process,
            Topic::Diagnostics => &self.diagnostics,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Envelope>,
}

impl TopicReceiver {
    /// Wait for the next envelope on this topic.
    ///
    /// Returns:
    /// * `Ok(envelope)` – a successfully received envelope.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Envelope, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`][Self::recv].
    pub fn try_recv(&mut self) -> Result<Envelope, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopin_types::{Endpoint, Event};

    fn make_envelope(event: Event) -> Envelope {
        Envelope::new(Endpoint::Watchdog, event)
    }

    #[tokio::test]
    async fn lifecycle_subscribers_receive_same_envelope() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut owner1 = bus.subscribe_to(Topic::Lifecycle);
        let mut owner2 = bus.subscribe_to(Topic::Lifecycle);

        let envelope = make_envelope(Event::Ready);
        bus.publish_to(Topic::Lifecycle, envelope.clone())?;

        assert_eq!(owner1.recv().await?.id, envelope.id);
        assert_eq!(owner2.recv().await?.id, envelope.id);
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_returns_error() {
        let bus = EventBus::default();
        let result = bus.publish_to(Topic::Lifecycle, make_envelope(Event::Stop));
        assert!(matches!(result, Err(AutopinError::Channel(_))));
    }

    #[tokio::test]
    async fn topics_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut lifecycle = bus.subscribe_to(Topic::Lifecycle);
        let _process = bus.subscribe_to(Topic::Process);

        bus.publish_to(Topic::Process, make_envelope(Event::TaskCreated { tid: 10 }))?;

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), lifecycle.recv()).await;
        assert!(result.is_err(), "lifecycle observer must not see process traffic");
        Ok(())
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(16);
        let mut slow = bus.subscribe_to(Topic::Process);

        for tid in 0..1_000 {
            let _ = bus.publish_to(Topic::Process, make_envelope(Event::TaskCreated { tid }));
        }

        let result = slow.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged error, got: {result:?}"
        );
    }

    #[test]
    fn try_recv_on_empty_topic() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Diagnostics);
        assert_eq!(rx.topic(), Topic::Diagnostics);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
