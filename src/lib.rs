//! # book-mirror
//!
//! Mirrors a remote book catalog into a Telegram channel archive.
//!
//! For each catalog book and file variant not yet archived, the mirror
//! fetches the file from the source service, formats a caption and a
//! transport-safe filename, delivers the file through one of two transports
//! (lightweight Bot API first, upload gateway second, governed by payload
//! size), and durably records the resulting channel-message id so the pair is
//! never re-uploaded.
//!
//! ## Design Philosophy
//!
//! - **Idempotent** - The archive table is the source of truth; a rerun only
//!   touches what is missing
//! - **Self-terminating** - A mirror run ends on its own once the catalog is
//!   enumerated and the queue drains
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use book_mirror::{ChannelMirror, Config, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let mirror = ChannelMirror::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = mirror.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Serve the archive API and run the mirror until done or signalled
//!     run_with_shutdown(mirror).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Delivery channel transports
pub mod channel;
/// Configuration types
pub mod config;
/// Archive persistence layer
pub mod db;
/// Error types
pub mod error;
/// Caption and filename formatting
pub mod format;
/// Core mirror implementation (producer, workers, pipeline)
pub mod mirror;
/// Priority task queue
pub mod scheduler;
/// Source service and catalog boundaries
pub mod source;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use channel::{DeliveryChannel, OutgoingDocument, TelegramChannel};
pub use config::Config;
pub use db::Database;
pub use error::{DatabaseError, Error, FetchError, Result, SendError};
pub use mirror::ChannelMirror;
pub use scheduler::TaskQueue;
pub use source::{Catalog, CatalogEntry, HttpSourceClient, PgCatalog, SourceClient};
pub use types::{
    AuthorInfo, BookId, BookInfo, DeliveryPath, Event, FileVariant, MessageId, Priority, Task,
};

/// Run the archive API and a full mirror pass with graceful signal handling.
///
/// The API server keeps serving while the mirror run proceeds; the call
/// returns when a termination signal arrives or the API server stops. The
/// mirror run itself finishes earlier on its own once its queue drains.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use book_mirror::{ChannelMirror, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///     let mirror = ChannelMirror::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(mirror).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(mirror: ChannelMirror) -> Result<()> {
    let state = api::AppState::from_mirror(&mirror);

    let mirror_run = {
        let mirror = mirror.clone();
        tokio::spawn(async move { mirror.run().await })
    };

    let result = tokio::select! {
        served = api::start_api_server(state) => served,
        _ = wait_for_signal() => {
            tracing::info!("Shutting down");
            Ok(())
        }
    };

    mirror_run.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
