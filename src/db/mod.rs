//! Archive persistence layer for book-mirror
//!
//! Handles SQLite persistence of the archive mapping: which channel message
//! holds which (book, variant) pair. This table is the idempotency source of
//! truth — the producer skips any pair present here, and the read surface
//! resolves lookups against it.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`records`] — Archive record CRUD

use sqlx::sqlite::SqlitePool;

mod migrations;
mod records;

/// Database handle for book-mirror
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
