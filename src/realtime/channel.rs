use futures::stream::Stream;
use serde_json::Value;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use crate::error::NotificationError;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Value, NotificationError>> + Send>>;

/// Source of raw insert events, already scoped to one recipient.
pub trait PushChannel: Send + Sync {
    fn subscribe(&self, recipient_id: &str) -> EventStream;
}

/// In-process push channel: every published event fans out to the
/// subscriptions whose recipient matches `recipient_uid`.
#[derive(Clone)]
pub struct BroadcastPushChannel {
    tx: broadcast::Sender<Value>,
}

impl BroadcastPushChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many subscriptions saw the event.
    pub fn publish(&self, event: Value) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl PushChannel for BroadcastPushChannel {
    fn subscribe(&self, recipient_id: &str) -> EventStream {
        let recipient = recipient_id.to_string();
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(move |item| match item {
            Ok(event) if event.get("recipient_uid").and_then(Value::as_str) == Some(recipient.as_str()) => {
                Some(Ok(event))
            }
            Ok(_) => None,
            Err(e) => Some(Err(NotificationError::Subscription(format!(
                "push channel error: {}",
                e
            )))),
        });

        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_events_are_scoped_to_recipient() {
        let channel = BroadcastPushChannel::new(16);
        let mut alice = channel.subscribe("alice");

        channel.publish(json!({"recipient_uid": "bob", "id": "b"}));
        channel.publish(json!({"recipient_uid": "alice", "id": "a"}));

        let event = alice.next().await.unwrap().unwrap();
        assert_eq!(event["id"], "a");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let channel = BroadcastPushChannel::new(16);
        assert_eq!(channel.publish(json!({"recipient_uid": "alice"})), 0);
    }

    #[tokio::test]
    async fn test_lag_is_reported_as_error() {
        let channel = BroadcastPushChannel::new(2);
        let mut alice = channel.subscribe("alice");
        for i in 0..5 {
            channel.publish(json!({"recipient_uid": "alice", "id": i}));
        }

        let first = alice.next().await.unwrap();
        assert!(matches!(first, Err(NotificationError::Subscription(_))));
        assert!(alice.next().await.unwrap().is_ok());
    }
}
