use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Device-level push sent alongside every locally created notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPush {
    pub title: String,
    pub body: String,
    pub data: Value,
    pub trigger_immediately: bool,
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn dispatch(&self, push: &PlatformPush) -> Result<(), PushError>;
}

/// Posts pushes as JSON to a gateway endpoint.
#[derive(Clone)]
pub struct HttpPushDispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushDispatcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PushDispatcher for HttpPushDispatcher {
    async fn dispatch(&self, push: &PlatformPush) -> Result<(), PushError> {
        self.client
            .post(&self.endpoint)
            .json(push)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

/// Used when no gateway is configured.
#[derive(Clone, Default)]
pub struct LogPushDispatcher;

#[async_trait]
impl PushDispatcher for LogPushDispatcher {
    async fn dispatch(&self, push: &PlatformPush) -> Result<(), PushError> {
        tracing::debug!("Platform push (no gateway configured): {}", push.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_push_wire_shape() {
        let push = PlatformPush {
            title: "Leave Approved".into(),
            body: "Your leave was approved".into(),
            data: json!({"leaveId": "l-7"}),
            trigger_immediately: true,
        };

        assert_eq!(
            serde_json::to_value(&push).unwrap(),
            json!({
                "title": "Leave Approved",
                "body": "Your leave was approved",
                "data": {"leaveId": "l-7"},
                "triggerImmediately": true,
            })
        );
    }

    #[tokio::test]
    async fn test_log_dispatcher_never_fails() {
        let push = PlatformPush {
            title: "t".into(),
            body: "b".into(),
            data: Value::Null,
            trigger_immediately: true,
        };
        assert!(LogPushDispatcher.dispatch(&push).await.is_ok());
    }
}
