//! Source service boundary: content/metadata fetching and catalog enumeration.
//!
//! Two collaborators live here. [`SourceClient`] talks HTTP to the source
//! content service (book metadata and file downloads); [`Catalog`] enumerates
//! the catalog index the producer walks, implemented against the source's
//! Postgres database.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgPool;

use crate::error::{DatabaseError, Error, FetchError, Result};
use crate::types::{BookId, BookInfo, FileVariant};

/// One catalog row: a book and its native file format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Book id
    pub id: BookId,
    /// Native format the book was published in
    pub file_type: FileVariant,
}

/// Fetches book metadata and file content from the source service
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetch metadata for a book
    ///
    /// Returns `Ok(None)` when the source answers with its explicit
    /// empty-result marker (HTTP 204) — a terminal condition for any task
    /// referencing the book.
    async fn fetch_book(&self, id: BookId) -> Result<Option<BookInfo>>;

    /// Fetch the file bytes for a (book, variant) pair
    ///
    /// The error variants drive the pipeline's retry policy; see
    /// [`FetchError`].
    async fn fetch_content(
        &self,
        id: BookId,
        variant: &FileVariant,
    ) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Enumerates the catalog for the producer
#[async_trait]
pub trait Catalog: Send + Sync {
    /// List every book, newest first, so fresh content is archived
    /// preferentially
    async fn list_books(&self) -> Result<Vec<CatalogEntry>>;
}

/// HTTP implementation of [`SourceClient`]
pub struct HttpSourceClient {
    client: reqwest::Client,
    base_url: String,
    fetch_timeout: Duration,
}

impl HttpSourceClient {
    /// Create a client against the given source base URL
    ///
    /// `fetch_timeout` bounds a single content fetch end to end; metadata
    /// requests are quick and share the same deadline.
    pub fn new(base_url: impl Into<String>, fetch_timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).map_err(|e| Error::Config {
            message: format!("invalid source URL '{}': {}", base_url, e),
            key: Some("SOURCE_URL".to_string()),
        })?;

        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url,
            fetch_timeout,
        })
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_book(&self, id: BookId) -> Result<Option<BookInfo>> {
        let url = format!("{}/book/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .timeout(self.fetch_timeout)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Source(format!(
                "metadata request for book {} returned status {}",
                id,
                response.status()
            )));
        }

        let book = response.json::<BookInfo>().await?;
        Ok(Some(book))
    }

    async fn fetch_content(
        &self,
        id: BookId,
        variant: &FileVariant,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let url = format!(
            "{}/book/download/{}/{}",
            self.base_url,
            id,
            urlencoding::encode(variant.as_str())
        );

        let response = self
            .client
            .get(&url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(classify_fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::NotFound {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(classify_fetch_error)?;
        Ok(bytes.to_vec())
    }
}

fn classify_fetch_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Other(err.to_string())
    }
}

/// Postgres implementation of [`Catalog`] over the source's `book` table
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Connect to the catalog database
    ///
    /// A connection failure here is fatal at startup.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to catalog database: {}",
                e
            )))
        })?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn list_books(&self) -> Result<Vec<CatalogEntry>> {
        let rows = sqlx::query("SELECT id::BIGINT AS id, file_type FROM book ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to enumerate catalog: {}",
                    e
                )))
            })?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let file_type: String = row.try_get("file_type")?;
            entries.push(CatalogEntry {
                id: BookId(id),
                file_type: FileVariant::from(file_type),
            });
        }
        Ok(entries)
    }
}
