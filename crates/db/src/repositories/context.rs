use async_trait::async_trait;
use sqlx::Row;

use vendo_core::context::{
    ContextStore, ContextStoreError, ConversationContext, ConversationId,
};

use crate::DbPool;

/// SQLite-backed context store. Contexts persist as JSON blobs, so an
/// in-progress checkout survives a process restart.
pub struct SqlContextStore {
    pool: DbPool,
}

impl SqlContextStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn persistence(error: impl std::fmt::Display) -> ContextStoreError {
    ContextStoreError::Persistence(error.to_string())
}

#[async_trait]
impl ContextStore for SqlContextStore {
    async fn get(&self, id: &ConversationId) -> Result<ConversationContext, ContextStoreError> {
        let row = sqlx::query(
            "SELECT payload FROM conversation_contexts WHERE conversation_id = ?1",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        match row {
            Some(row) => {
                serde_json::from_str(&row.get::<String, _>("payload")).map_err(persistence)
            }
            None => Ok(ConversationContext::default()),
        }
    }

    async fn put(
        &self,
        id: &ConversationId,
        context: ConversationContext,
    ) -> Result<(), ContextStoreError> {
        let payload = serde_json::to_string(&context).map_err(persistence)?;
        sqlx::query(
            "INSERT INTO conversation_contexts (conversation_id, payload, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT (conversation_id) DO UPDATE SET
                 payload = excluded.payload,
                 updated_at = datetime('now')",
        )
        .bind(&id.0)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn clear_transaction_state(
        &self,
        id: &ConversationId,
    ) -> Result<(), ContextStoreError> {
        let mut context = self.get(id).await?;
        context.clear_transaction_state();
        self.put(id, context).await
    }
}
