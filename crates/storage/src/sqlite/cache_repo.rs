use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use progress_core::model::UserId;

use super::SqliteProgressCache;
use crate::repository::{ProgressCache, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressCache for SqliteProgressCache {
    async fn load(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Value>, StorageError> {
        let row = sqlx::query("SELECT document FROM user_progress WHERE user_id = ?1")
            .bind(user_id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(conn)?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("document").map_err(ser)?;
                let document = serde_json::from_str(&raw).map_err(ser)?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        user_id: &UserId,
        document: &Value,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(document).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO user_progress (user_id, document, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id) DO UPDATE SET
                    document = excluded.document,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.as_str())
        .bind(raw)
        .bind(Utc::now())
        .execute(self.pool())
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM user_progress WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(self.pool())
            .await
            .map_err(conn)?;
        Ok(())
    }
}
