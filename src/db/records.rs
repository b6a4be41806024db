//! Archive record CRUD operations.

use crate::error::DatabaseError;
use crate::types::{BookId, FileVariant, MessageId};
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Record the channel message holding a (book, variant) pair
    ///
    /// Idempotent upsert: a later delivery for the same key overwrites the
    /// previous message id.
    pub async fn set_message_id(
        &self,
        book_id: BookId,
        variant: &FileVariant,
        message_id: MessageId,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (book_id, file_type, message_id)
            VALUES (?, ?, ?)
            ON CONFLICT (book_id, file_type) DO UPDATE SET message_id = excluded.message_id
            "#,
        )
        .bind(book_id)
        .bind(variant.as_str())
        .bind(message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to set message id: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Look up the channel message for a (book, variant) pair
    pub async fn get_message_id(
        &self,
        book_id: BookId,
        variant: &FileVariant,
    ) -> Result<Option<MessageId>> {
        let row: Option<MessageId> = sqlx::query_scalar(
            "SELECT message_id FROM messages WHERE book_id = ? AND file_type = ?",
        )
        .bind(book_id)
        .bind(variant.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get message id: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Remove every record pointing at a channel message
    ///
    /// Used by the read surface when a message disappears from the channel;
    /// the delivery pipeline never deletes.
    pub async fn delete_by_message_id(&self, message_id: MessageId) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE message_id = ?")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete message record: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Reverse lookup: which book does a channel message hold
    pub async fn get_book_by_message_id(&self, message_id: MessageId) -> Result<Option<BookId>> {
        let row: Option<BookId> =
            sqlx::query_scalar("SELECT book_id FROM messages WHERE message_id = ?")
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to look up book by message id: {}",
                        e
                    )))
                })?;

        Ok(row)
    }
}
