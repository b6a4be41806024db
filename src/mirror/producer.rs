//! Catalog enumeration — fills the task queue with pending deliveries.

use crate::error::Result;
use crate::types::{Event, Task};

use super::ChannelMirror;

impl ChannelMirror {
    /// Enumerate the catalog and enqueue every unarchived (book, variant) pair
    ///
    /// Walks the catalog newest-first, expands each book into its variant
    /// set, and skips pairs the archive already holds. Always flips the
    /// queue's producing flag on the way out — even when the catalog is empty
    /// or enumeration fails — so the worker pool can drain and terminate.
    pub(crate) async fn run_producer(&self) -> Result<()> {
        let result = self.enumerate_pending().await;

        self.queue.mark_producing_done();

        match &result {
            Ok(queued) => {
                tracing::info!(queued, "Producer finished");
                self.emit_event(Event::ProducerFinished { queued: *queued });
            }
            Err(e) => {
                tracing::error!(error = %e, "Catalog enumeration failed");
            }
        }

        result.map(|_| ())
    }

    async fn enumerate_pending(&self) -> Result<usize> {
        let books = self.catalog.list_books().await?;
        tracing::info!(books = books.len(), "Enumerating catalog");

        let mut queued = 0;
        for entry in books {
            for variant in entry.file_type.expansion() {
                if self.db.get_message_id(entry.id, &variant).await?.is_some() {
                    continue;
                }

                let task = Task::new(entry.id, variant, self.config.mirror.retry_budget);
                self.emit_event(Event::TaskQueued {
                    book_id: task.book_id,
                    variant: task.variant.clone(),
                    priority: task.priority,
                });
                self.queue.enqueue(task).await;
                queued += 1;
            }
        }

        Ok(queued)
    }
}
