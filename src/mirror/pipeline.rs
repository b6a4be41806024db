//! Per-task delivery execution: fetch, format, send, persist.

use crate::channel::OutgoingDocument;
use crate::error::{FetchError, SendError};
use crate::format;
use crate::types::{DeliveryPath, Event, MessageId, Task};

use super::ChannelMirror;

/// What a worker should do with a task after one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    /// Delivered and recorded; the task is finished
    Delivered {
        /// Resulting channel message id
        message_id: MessageId,
        /// Transport that carried the document
        path: DeliveryPath,
    },
    /// Retryable failure; re-enqueue against the remaining budget
    Retry,
    /// Terminal failure; the task is dropped for the rest of the run
    Dropped(&'static str),
}

impl ChannelMirror {
    /// Run the delivery pipeline for one dequeued task
    ///
    /// Every failure is classified here and returned as an outcome; nothing
    /// propagates past the worker loop.
    pub(crate) async fn deliver(&self, task: &Task) -> TaskOutcome {
        let book_id = task.book_id;
        let variant = &task.variant;

        tracing::info!(book_id = book_id.0, variant = %variant, "Downloading");
        self.emit_event(Event::FetchStarted {
            book_id,
            variant: variant.clone(),
        });

        let content = match self.source.fetch_content(book_id, variant).await {
            Ok(bytes) => bytes,
            Err(FetchError::NotFound { status }) => {
                tracing::warn!(
                    book_id = book_id.0,
                    variant = %variant,
                    status,
                    "Download failed — source has no content"
                );
                return TaskOutcome::Dropped("source has no content");
            }
            Err(FetchError::Timeout) => {
                tracing::warn!(book_id = book_id.0, variant = %variant, "Download timed out");
                return TaskOutcome::Retry;
            }
            Err(FetchError::Other(reason)) => {
                tracing::error!(
                    book_id = book_id.0,
                    variant = %variant,
                    reason,
                    "Download failed"
                );
                return TaskOutcome::Dropped("content fetch failed");
            }
        };

        let book = match self.source.fetch_book(book_id).await {
            Ok(Some(book)) => book,
            Ok(None) => {
                tracing::warn!(
                    book_id = book_id.0,
                    variant = %variant,
                    "Source has no metadata for this book"
                );
                return TaskOutcome::Dropped("no metadata");
            }
            Err(e) => {
                tracing::error!(
                    book_id = book_id.0,
                    variant = %variant,
                    error = %e,
                    "Metadata fetch failed"
                );
                return TaskOutcome::Dropped("metadata fetch failed");
            }
        };

        let doc = OutgoingDocument {
            filename: format::filename(&book, variant),
            caption: format::caption(&book),
            data: content,
        };

        tracing::info!(
            book_id = book_id.0,
            variant = %variant,
            size_bytes = doc.data.len(),
            "Uploading"
        );
        self.emit_event(Event::UploadStarted {
            book_id,
            variant: variant.clone(),
            size_bytes: doc.data.len() as u64,
        });

        let chat_id = self.config.channel.channel_id;

        // Below the size threshold the lightweight path goes first; any
        // failure there falls through to the fallback rather than surfacing.
        if (doc.data.len() as u64) < self.config.channel.size_threshold {
            match self.channel.send_lightweight(chat_id, &doc).await {
                Ok(message_id) => {
                    return self
                        .record_delivery(task, message_id, DeliveryPath::Lightweight)
                        .await;
                }
                Err(e) => {
                    tracing::debug!(
                        book_id = book_id.0,
                        variant = %variant,
                        error = %e,
                        "Lightweight send failed, trying fallback"
                    );
                }
            }
        }

        match self.channel.send_fallback(chat_id, &doc).await {
            Ok(message_id) => {
                self.record_delivery(task, message_id, DeliveryPath::Fallback)
                    .await
            }
            Err(SendError::Rejected(reason)) => {
                tracing::warn!(
                    book_id = book_id.0,
                    variant = %variant,
                    reason,
                    "Fallback rejected the document"
                );
                TaskOutcome::Retry
            }
            Err(SendError::Transport(reason)) => {
                tracing::error!(
                    book_id = book_id.0,
                    variant = %variant,
                    reason,
                    "Fallback transport failed"
                );
                TaskOutcome::Dropped("fallback transport failed")
            }
        }
    }

    /// Persist the archive record for a delivered document
    ///
    /// The write happens before the task counts as complete. When it fails
    /// the record is lost and the variant gets redelivered on a future run;
    /// the task is still finished — an immediate redelivery within this run
    /// would duplicate the message for nothing.
    async fn record_delivery(
        &self,
        task: &Task,
        message_id: MessageId,
        path: DeliveryPath,
    ) -> TaskOutcome {
        if let Err(e) = self
            .db
            .set_message_id(task.book_id, &task.variant, message_id)
            .await
        {
            tracing::error!(
                book_id = task.book_id.0,
                variant = %task.variant,
                message_id = message_id.0,
                error = %e,
                "Delivered but failed to record message id"
            );
        }

        self.emit_event(Event::Delivered {
            book_id: task.book_id,
            variant: task.variant.clone(),
            message_id,
            path,
        });

        TaskOutcome::Delivered { message_id, path }
    }
}
