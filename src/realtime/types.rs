use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    error::NotificationError,
    notification::{Notification, NotificationType},
};

/// Insert event as delivered by the push channel. Alternate field spellings
/// are accepted here and nowhere else.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteInsertEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub recipient_uid: String,
    pub title: String,
    pub body: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Value,
    pub read: Option<bool>,
    #[serde(alias = "isRead")]
    pub is_read: Option<bool>,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "readAt")]
    pub read_at: Option<DateTime<Utc>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

impl TryFrom<RemoteInsertEvent> for Notification {
    type Error = NotificationError;

    fn try_from(event: RemoteInsertEvent) -> Result<Self, Self::Error> {
        if event.id.trim().is_empty() {
            return Err(NotificationError::Subscription("push event without id".to_string()));
        }
        if event.recipient_uid.trim().is_empty() {
            return Err(NotificationError::Subscription(format!(
                "push event {} without recipient",
                event.id
            )));
        }

        let read = event.read.or(event.is_read).unwrap_or(false);

        Ok(Notification {
            id: event.id,
            recipient_id: event.recipient_uid,
            title: event.title,
            body: event.body.or(event.message).unwrap_or_default(),
            kind: event
                .kind
                .as_deref()
                .map(NotificationType::from_remote)
                .unwrap_or(NotificationType::General),
            payload: event.data,
            read,
            created_at: event.created_at,
            read_at: if read { event.read_at } else { None },
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload {
    pub notification: Notification,
    pub unread_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountPayload {
    pub unread_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// What a subscription hands to its sink.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListenerEvent {
    Delivered(DeliveryPayload),
    UnreadCount(UnreadCountPayload),
    Error(ErrorPayload),
}

impl ListenerEvent {
    pub fn error(err: &NotificationError) -> Self {
        ListenerEvent::Error(ErrorPayload {
            message: err.to_string(),
        })
    }
}
