//! Hot broadcast channel for pipeline events.

use super::PipelineEvent;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A hot, non-replaying broadcast bus.
///
/// Subscribers that attach after an event was emitted do not receive it,
/// and events emitted while no subscriber is attached are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Attaches a new subscriber. Only events emitted after this call are
    /// delivered.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Emits an event. Never fails; with no subscribers the event is
    /// dropped.
    pub fn emit(&self, event: PipelineEvent) {
        tracing::trace!(
            pipeline_id = %event.pipeline_id(),
            kind = event.kind(),
            "Emitting pipeline event"
        );
        let _ = self.sender.send(event);
    }

    /// Number of currently attached subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
