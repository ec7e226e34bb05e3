pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use async_trait::async_trait;

use crate::error::NotificationError;

/// Keyed string storage backing the notification store.
///
/// Implementations only need atomic single-key reads and writes; the store
/// serializes its own read-modify-write cycles on top.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, NotificationError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), NotificationError>;
}
