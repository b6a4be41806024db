//! Error types for book-mirror
//!
//! This module provides error handling for the library, including:
//! - A top-level [`Error`] for startup and infrastructure failures
//! - [`DatabaseError`] for the archive persistence layer
//! - [`FetchError`] classifying source-fetch failures for the retry policy
//! - [`SendError`] classifying delivery-transport failures

use thiserror::Error;

/// Result type alias for book-mirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for book-mirror
///
/// Failures inside the delivery pipeline are handled locally in the worker
/// loop and never surface through this type; `Error` covers startup,
/// persistence, and collaborator-boundary failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "BOT_TOKEN")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Source service returned an unusable response
    #[error("source error: {0}")]
    Source(String),

    /// Delivery channel returned an unusable response
    #[error("channel error: {0}")]
    Channel(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Failure classification for a content fetch from the source service
///
/// The variants map one-to-one onto the pipeline's handling policy:
/// [`NotFound`](FetchError::NotFound) drops the task permanently,
/// [`Timeout`](FetchError::Timeout) re-enqueues it against the retry budget,
/// and [`Other`](FetchError::Other) drops it at the worker loop.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source has no file for this (book, variant) pair
    #[error("source returned status {status}")]
    NotFound {
        /// HTTP status the source answered with
        status: u16,
    },

    /// The fetch exceeded its deadline
    #[error("content fetch timed out")]
    Timeout,

    /// Any other fetch failure (connection loss, body read error, ...)
    #[error("content fetch failed: {0}")]
    Other(String),
}

/// Failure classification for a delivery-transport send
#[derive(Debug, Error)]
pub enum SendError {
    /// The transport rejected the document itself (size, parts, arguments).
    /// Retryable when raised by the fallback path.
    #[error("transport rejected the document: {0}")]
    Rejected(String),

    /// Any other transport failure. From the lightweight path this falls
    /// through to the fallback; from the fallback path the task is dropped.
    #[error("transport failure: {0}")]
    Transport(String),
}
