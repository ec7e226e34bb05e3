use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;
use validator::Validate;

use super::{
    notification_dto::{BatchCreateRequest, BatchFailure, BatchOutcome, CreateNotificationRequest},
    notification_models::Notification,
    notification_repository::{InsertOutcome, NotificationRepository},
};
use crate::{
    error::NotificationError,
    push::{PlatformPush, PushDispatcher},
};

/// A platform push that could not be delivered. The notification itself is
/// already persisted when this is reported.
#[derive(Debug, Clone)]
pub struct PushFailure {
    pub notification_id: String,
    pub recipient_id: String,
    pub error: String,
}

/// Creation and fan-out of notifications for producer collaborators.
#[derive(Clone)]
pub struct NotificationService {
    store: NotificationRepository,
    push: Arc<dyn PushDispatcher>,
    push_failures: broadcast::Sender<PushFailure>,
}

impl NotificationService {
    pub fn new(store: NotificationRepository, push: Arc<dyn PushDispatcher>) -> Self {
        let (push_failures, _) = broadcast::channel(64);
        Self {
            store,
            push,
            push_failures,
        }
    }

    pub fn subscribe_push_failures(&self) -> broadcast::Receiver<PushFailure> {
        self.push_failures.subscribe()
    }

    pub async fn create_notification(
        &self,
        request: CreateNotificationRequest,
    ) -> Result<Notification, NotificationError> {
        request.validate()?;

        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            recipient_id: request.recipient_id,
            title: request.title,
            body: request.body,
            kind: request.kind,
            payload: request.data,
            read: false,
            created_at: Utc::now(),
            read_at: None,
        };

        if self.store.insert(notification.clone()).await? == InsertOutcome::EvictedOnInsert {
            return Err(NotificationError::Verification(format!(
                "notification {} was evicted on insert",
                notification.id
            )));
        }
        tracing::info!(
            "Created {} notification {} for {}",
            notification.kind,
            notification.id,
            notification.recipient_id
        );

        self.dispatch_push(&notification);

        Ok(notification)
    }

    /// Creates the same content for every recipient concurrently. One recipient
    /// failing never stops the others.
    pub async fn batch_create(&self, request: BatchCreateRequest) -> BatchOutcome {
        let results = join_all(
            request
                .recipients
                .iter()
                .map(|recipient| self.create_notification(request.for_recipient(recipient))),
        )
        .await;

        let mut notification_ids = Vec::new();
        let mut errors = Vec::new();
        for (recipient, result) in request.recipients.iter().zip(results) {
            match result {
                Ok(notification) => notification_ids.push(notification.id),
                Err(e) => {
                    tracing::warn!("Batch notification for {:?} failed: {}", recipient, e);
                    errors.push(BatchFailure {
                        recipient_id: recipient.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        BatchOutcome {
            success: !notification_ids.is_empty(),
            created_count: notification_ids.len(),
            failed_count: errors.len(),
            notification_ids,
            errors,
        }
    }

    fn dispatch_push(&self, notification: &Notification) {
        let push = PlatformPush {
            title: notification.title.clone(),
            body: notification.body.clone(),
            data: notification.payload.clone(),
            trigger_immediately: true,
        };
        let dispatcher = self.push.clone();
        let failures = self.push_failures.clone();
        let notification_id = notification.id.clone();
        let recipient_id = notification.recipient_id.clone();

        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(&push).await {
                tracing::warn!("Platform push for notification {} failed: {}", notification_id, e);
                let _ = failures.send(PushFailure {
                    notification_id,
                    recipient_id,
                    error: e.to_string(),
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::notification_models::NotificationType;
    use crate::notification::notification_repository::{tests::notification_at, EvictionPolicy};
    use crate::push::PushError;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingPush {
        sent: Mutex<Vec<PlatformPush>>,
    }

    #[async_trait]
    impl PushDispatcher for RecordingPush {
        async fn dispatch(&self, push: &PlatformPush) -> Result<(), PushError> {
            self.sent.lock().unwrap().push(push.clone());
            Ok(())
        }
    }

    struct RejectingPush;

    #[async_trait]
    impl PushDispatcher for RejectingPush {
        async fn dispatch(&self, _push: &PlatformPush) -> Result<(), PushError> {
            Err(PushError::Rejected("device token expired".into()))
        }
    }

    fn service_with(push: Arc<dyn PushDispatcher>) -> (NotificationService, NotificationRepository) {
        let store = NotificationRepository::new(Arc::new(MemoryStorage::new()));
        (NotificationService::new(store.clone(), push), store)
    }

    fn leave_approved(recipient: &str) -> CreateNotificationRequest {
        CreateNotificationRequest::new(
            recipient,
            "Leave Approved",
            "Your leave was approved",
            NotificationType::LeaveApproved,
            json!({}),
        )
    }

    #[tokio::test]
    async fn test_create_notification_is_queryable_unread() {
        let (service, store) = service_with(Arc::new(RecordingPush::default()));

        let created = service.create_notification(leave_approved("alice")).await.unwrap();
        assert!(!created.id.is_empty());

        let listed = store.query("alice", false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert!(!listed[0].read);
        assert_eq!(listed[0].kind, NotificationType::LeaveApproved);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_fields_before_writing() {
        let (service, store) = service_with(Arc::new(RecordingPush::default()));

        let err = service.create_notification(leave_approved("")).await.unwrap_err();
        assert!(matches!(err, NotificationError::Validation(_)));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_created_ids_are_unique() {
        let (service, _) = service_with(Arc::new(RecordingPush::default()));
        let a = service.create_notification(leave_approved("alice")).await.unwrap();
        let b = service.create_notification(leave_approved("alice")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_push_is_dispatched() {
        let push = Arc::new(RecordingPush::default());
        let (service, _) = service_with(push.clone());

        service.create_notification(leave_approved("alice")).await.unwrap();

        for _ in 0..50 {
            if !push.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let sent = push.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Leave Approved");
        assert!(sent[0].trigger_immediately);
    }

    #[tokio::test]
    async fn test_push_failure_does_not_affect_creation() {
        let (service, store) = service_with(Arc::new(RejectingPush));
        let mut failures = service.subscribe_push_failures();

        let created = service.create_notification(leave_approved("alice")).await.unwrap();
        assert!(store.find_by_id(&created.id).await.unwrap().is_some());

        let failure = tokio::time::timeout(Duration::from_secs(1), failures.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failure.notification_id, created.id);
        assert!(failure.error.contains("device token expired"));
    }

    #[tokio::test]
    async fn test_batch_partial_failure() {
        let (service, store) = service_with(Arc::new(RecordingPush::default()));

        let outcome = service
            .batch_create(BatchCreateRequest {
                recipients: vec!["alice".into(), "".into()],
                title: "Holiday".into(),
                body: "Office closed Friday".into(),
                kind: NotificationType::General,
                data: json!({}),
            })
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.created_count, 1);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].recipient_id, "");
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.query("alice", false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_all_failed_is_not_success() {
        let (service, _) = service_with(Arc::new(RecordingPush::default()));

        let outcome = service
            .batch_create(BatchCreateRequest {
                recipients: vec!["alice".into(), "bob".into()],
                title: "".into(),
                body: "body".into(),
                kind: NotificationType::General,
                data: json!({}),
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.created_count, 0);
        assert_eq!(outcome.failed_count, 2);
    }

    #[tokio::test]
    async fn test_batch_fans_out_to_every_recipient() {
        let (service, store) = service_with(Arc::new(RecordingPush::default()));
        let recipients: Vec<String> = (0..10).map(|i| format!("user-{}", i)).collect();

        let outcome = service
            .batch_create(BatchCreateRequest {
                recipients: recipients.clone(),
                title: "Leave request".into(),
                body: "Pending approval".into(),
                kind: NotificationType::LeaveRequest,
                data: json!({"leaveId": "l-1"}),
            })
            .await;

        assert_eq!(outcome.created_count, 10);
        for recipient in &recipients {
            assert_eq!(store.unread_count(recipient).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_create_older_than_full_store_is_not_reported_created() {
        let push = Arc::new(RecordingPush::default());
        let store = NotificationRepository::with_limits(
            Arc::new(MemoryStorage::new()),
            1,
            EvictionPolicy::OldestFirst,
        );
        let future = Utc::now() + chrono::Duration::days(1);
        store.insert(notification_at("scheduled", "alice", future)).await.unwrap();
        let service = NotificationService::new(store.clone(), push.clone());

        let err = service.create_notification(leave_approved("alice")).await.unwrap_err();
        assert!(matches!(err, NotificationError::Verification(_)));

        let ids: Vec<String> = store.query("alice", false).await.unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["scheduled".to_string()]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(push.sent.lock().unwrap().is_empty());
    }
}
