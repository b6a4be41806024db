//! Worker consume loop — drains the task queue through the delivery pipeline.

use crate::types::Event;

use super::{ChannelMirror, TaskOutcome};

impl ChannelMirror {
    /// Run one worker's consume loop until the queue is permanently drained
    ///
    /// The retry policy lives here: a retryable outcome re-enters the queue
    /// at the tail of its priority band with one unit of budget spent, and a
    /// task whose budget is gone is dropped. The requeue happens before
    /// `task_done` so the drain check never observes a false empty.
    pub(crate) async fn run_worker(&self, worker_id: usize) {
        tracing::debug!(worker_id, "Worker started");

        while let Some(task) = self.queue.dequeue().await {
            match self.deliver(&task).await {
                TaskOutcome::Delivered { message_id, path } => {
                    tracing::info!(
                        book_id = task.book_id.0,
                        variant = %task.variant,
                        message_id = message_id.0,
                        path = ?path,
                        "Delivered"
                    );
                }
                TaskOutcome::Retry => {
                    if task.retries_remaining == 0 {
                        tracing::warn!(
                            book_id = task.book_id.0,
                            variant = %task.variant,
                            "Retry budget exhausted, dropping task"
                        );
                        self.emit_event(Event::TaskDropped {
                            book_id: task.book_id,
                            variant: task.variant.clone(),
                            reason: "retries exhausted".to_string(),
                        });
                    } else {
                        let retry = task.retried();
                        tracing::info!(
                            book_id = retry.book_id.0,
                            variant = %retry.variant,
                            retries_remaining = retry.retries_remaining,
                            "Requeueing task"
                        );
                        self.emit_event(Event::TaskRetried {
                            book_id: retry.book_id,
                            variant: retry.variant.clone(),
                            retries_remaining: retry.retries_remaining,
                        });
                        self.queue.requeue(retry).await;
                    }
                }
                TaskOutcome::Dropped(reason) => {
                    self.emit_event(Event::TaskDropped {
                        book_id: task.book_id,
                        variant: task.variant.clone(),
                        reason: reason.to_string(),
                    });
                }
            }

            self.queue.task_done();
        }

        tracing::debug!(worker_id, "Worker finished");
    }
}
