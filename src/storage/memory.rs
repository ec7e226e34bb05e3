use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::StorageBackend;
use crate::error::NotificationError;

/// Process-local storage. Used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, NotificationError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), NotificationError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let storage = MemoryStorage::new();
        storage.set("k", "one").await.unwrap();
        storage.set("k", "two").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set("k", "v").await.unwrap();
        assert_eq!(other.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
