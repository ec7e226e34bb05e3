use async_trait::async_trait;

use super::StorageBackend;
use crate::{db::DbPool, error::NotificationError};

#[derive(Clone)]
pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StorageBackend for PgStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, NotificationError> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM notification_store WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), NotificationError> {
        sqlx::query(
            "INSERT INTO notification_store (key, value, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (key) DO UPDATE
             SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
