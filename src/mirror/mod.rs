//! Core mirror implementation split into focused submodules.
//!
//! The [`ChannelMirror`] struct and its methods are organized by domain:
//! - [`producer`] - Catalog enumeration and task production
//! - [`worker`] - Worker consume loop
//! - [`pipeline`] - Per-task delivery execution

mod pipeline;
mod producer;
mod worker;

pub(crate) use pipeline::TaskOutcome;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use crate::channel::{DeliveryChannel, TelegramChannel};
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::scheduler::TaskQueue;
use crate::source::{Catalog, HttpSourceClient, PgCatalog, SourceClient};
use crate::types::Event;

/// Main mirror instance (cloneable - all fields are Arc-wrapped)
///
/// One instance drives a full mirror run: the producer enumerates pending
/// (book, variant) pairs into the task queue while the worker pool drains it
/// through the delivery pipeline. The run terminates on its own once
/// enumeration is done, the queue is empty, and no worker holds a task.
#[derive(Clone)]
pub struct ChannelMirror {
    /// Archive database (wrapped in Arc for sharing across tasks).
    /// Public for integration tests and the API layer to query records.
    pub db: Arc<Database>,
    /// Source content service client
    pub(crate) source: Arc<dyn SourceClient>,
    /// Catalog index enumerated by the producer
    pub(crate) catalog: Arc<dyn Catalog>,
    /// Delivery transports
    pub(crate) channel: Arc<dyn DeliveryChannel>,
    /// Shared task queue (the sole coordination point between producer and workers)
    pub(crate) queue: Arc<TaskQueue>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl ChannelMirror {
    /// Create a new ChannelMirror instance
    ///
    /// This initializes all core components:
    /// - Opens/creates the SQLite archive database and runs migrations
    /// - Connects to the catalog database
    /// - Builds the HTTP source client and both delivery transports
    /// - Sets up the event broadcast channel
    ///
    /// Any failure here is fatal; nothing in the later run aborts the
    /// process.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(&config.persistence.database_path).await?;

        let source = HttpSourceClient::new(config.source.base_url.clone(), config.source.fetch_timeout)?;
        let catalog = PgCatalog::connect(&config.source.catalog_database_url).await?;
        let channel = TelegramChannel::new(
            config.channel.bot_token.clone(),
            config.channel.api_base.clone(),
            config.channel.gateway_url.clone(),
        )?;

        let queue = Arc::new(TaskQueue::new(config.mirror.queue_capacity));

        // Create broadcast channel with buffer size of 1000 events
        // This allows multiple subscribers to receive all events independently
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Ok(Self {
            db: Arc::new(db),
            source: Arc::new(source),
            catalog: Arc::new(catalog),
            channel: Arc::new(channel),
            queue,
            config: Arc::new(config),
            event_tx,
        })
    }

    /// Subscribe to mirror lifecycle events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the shared configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers (ignores the no-subscriber case)
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Execute one full mirror run
    ///
    /// Spawns the producer alongside the configured number of workers and
    /// waits for all of them. Workers exit once the queue is permanently
    /// drained, so the call returns when every pending variant has been
    /// delivered, dropped, or exhausted its retry budget.
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            workers = self.config.mirror.workers,
            retry_budget = self.config.mirror.retry_budget,
            "Starting mirror run"
        );

        let mut tasks = tokio::task::JoinSet::new();

        {
            let mirror = self.clone();
            tasks.spawn(async move { mirror.run_producer().await });
        }

        for worker_id in 0..self.config.mirror.workers {
            let mirror = self.clone();
            tasks.spawn(async move {
                mirror.run_worker(worker_id).await;
                Ok(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Producer failed"),
                Err(e) => tracing::error!(error = %e, "Mirror task panicked"),
            }
        }

        tracing::info!("Mirror run complete");
        Ok(())
    }
}
