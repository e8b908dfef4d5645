use async_trait::async_trait;
use chrono::Utc;
use quote_core::{DraftStore, StorageError};
use sqlx::sqlite::SqlitePool;

/// Key-value draft storage kept in the `draft_storage` table.
#[derive(Clone)]
pub struct SqliteDraftStore {
    pool: SqlitePool,
}

impl SqliteDraftStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DraftStore for SqliteDraftStore {
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>, StorageError> {
        sqlx::query_scalar("SELECT value FROM draft_storage WHERE storage_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO draft_storage (storage_key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(storage_key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write(e.to_string()))?;
        Ok(())
    }

    async fn remove(
        &self,
        key: &str,
    ) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM draft_storage WHERE storage_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;
        Ok(())
    }
}
