//! Change notifications for presentation layers.

use askbar_shared::{ChatId, MessageId};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Persisted state has been read back.
    Hydrated,
    /// The chat list changed (fetched, created, deleted, renamed).
    ChatsChanged,
    /// The messages of one chat changed.
    MessagesChanged { chat_id: ChatId },
    /// A streamed fragment of the assistant reply.
    StreamDelta { chat_id: ChatId, text: String },
    /// The final assistant message arrived.
    StreamFinished { chat_id: ChatId, message_id: MessageId },
    /// An operation failed; `message` is the recorded error.
    Failed { message: String },
}

/// Broadcast-backed event bus.  Events are dropped when nobody listens.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: StoreEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("no event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        bus.emit(StoreEvent::Hydrated);
        bus.emit(StoreEvent::ChatsChanged);

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Hydrated);
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::ChatsChanged);
    }

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::new(1).emit(StoreEvent::ChatsChanged);
    }
}
