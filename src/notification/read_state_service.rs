use chrono::Utc;

use super::{notification_models::Notification, notification_repository::NotificationRepository};
use crate::error::NotificationError;

/// Read/unread transitions and deletions requested by UI collaborators.
#[derive(Clone)]
pub struct ReadStateService {
    store: NotificationRepository,
}

impl ReadStateService {
    pub fn new(store: NotificationRepository) -> Self {
        Self { store }
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<Notification, NotificationError> {
        self.store.mark_read(id, Utc::now()).await
    }

    pub async fn mark_all_as_read(&self, recipient_id: &str) -> Result<usize, NotificationError> {
        let count = self.store.mark_all_read(recipient_id, Utc::now()).await?;
        tracing::debug!("Marked {} notifications read for {}", count, recipient_id);
        Ok(count)
    }

    /// Removes read notifications only.
    pub async fn clear_read(&self, recipient_id: &str) -> Result<usize, NotificationError> {
        let removed = self.store.delete_read_for_recipient(recipient_id).await?;
        tracing::debug!("Cleared {} read notifications for {}", removed, recipient_id);
        Ok(removed)
    }

    pub async fn delete_all(&self, recipient_id: &str) -> Result<usize, NotificationError> {
        let removed = self.store.delete_all_for_recipient(recipient_id).await?;
        tracing::debug!("Deleted {} notifications for {}", removed, recipient_id);
        Ok(removed)
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), NotificationError> {
        self.store.delete_by_id(id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::notification_repository::tests::notification_at;
    use crate::storage::MemoryStorage;
    use chrono::Duration;
    use std::sync::Arc;

    async fn seeded() -> (ReadStateService, NotificationRepository) {
        let store = NotificationRepository::new(Arc::new(MemoryStorage::new()));
        let t = Utc::now();
        for (i, (id, recipient)) in [("a1", "alice"), ("a2", "alice"), ("a3", "alice"), ("b1", "bob")]
            .into_iter()
            .enumerate()
        {
            store
                .insert(notification_at(id, recipient, t + Duration::seconds(i as i64)))
                .await
                .unwrap();
        }
        (ReadStateService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_mark_as_read_sets_read_at() {
        let (manager, store) = seeded().await;

        let updated = manager.mark_as_read("a1").await.unwrap();
        assert!(updated.read);
        assert!(updated.read_at.is_some());
        assert!(store.find_by_id("a1").await.unwrap().unwrap().read);
    }

    #[tokio::test]
    async fn test_mark_as_read_already_read_is_noop_success() {
        let (manager, _) = seeded().await;
        let first = manager.mark_as_read("a1").await.unwrap();
        let again = manager.mark_as_read("a1").await.unwrap();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn test_mark_as_read_unknown() {
        let (manager, _) = seeded().await;
        assert!(matches!(
            manager.mark_as_read("zzz").await,
            Err(NotificationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_all_as_read_postcondition() {
        let (manager, store) = seeded().await;
        manager.mark_as_read("a2").await.unwrap();

        assert_eq!(manager.mark_all_as_read("alice").await.unwrap(), 2);
        assert!(store.query("alice", false).await.unwrap().iter().all(|n| n.read));
        assert_eq!(store.unread_count("bob").await.unwrap(), 1);

        assert_eq!(manager.mark_all_as_read("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_read_postcondition() {
        let (manager, store) = seeded().await;
        manager.mark_as_read("a1").await.unwrap();
        manager.mark_as_read("a3").await.unwrap();
        let untouched = store.find_by_id("a2").await.unwrap().unwrap();

        assert_eq!(manager.clear_read("alice").await.unwrap(), 2);

        let remaining = store.query("alice", false).await.unwrap();
        assert!(remaining.iter().all(|n| !n.read));
        assert_eq!(remaining, vec![untouched]);
    }

    #[tokio::test]
    async fn test_delete_all_only_touches_recipient() {
        let (manager, store) = seeded().await;
        manager.mark_as_read("a1").await.unwrap();

        assert_eq!(manager.delete_all("alice").await.unwrap(), 3);
        assert!(store.query("alice", false).await.unwrap().is_empty());
        assert_eq!(store.query("bob", false).await.unwrap().len(), 1);
        assert_eq!(manager.delete_all("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let (manager, store) = seeded().await;
        manager.delete_by_id("b1").await.unwrap();
        assert!(store.find_by_id("b1").await.unwrap().is_none());
    }
}
