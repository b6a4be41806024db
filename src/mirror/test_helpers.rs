//! Shared test helpers: scripted collaborator mocks and mirror construction.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::channel::{DeliveryChannel, OutgoingDocument};
use crate::config::{
    ApiConfig, ChannelConfig, Config, MirrorConfig, PersistenceConfig, SourceConfig,
};
use crate::db::Database;
use crate::error::{FetchError, Result, SendError};
use crate::scheduler::TaskQueue;
use crate::source::{Catalog, CatalogEntry, SourceClient};
use crate::types::{BookId, BookInfo, DeliveryPath, FileVariant, MessageId};

use super::ChannelMirror;

/// Config for tests: small pool, tiny size threshold, no retries by default.
pub(crate) fn test_config(database_path: std::path::PathBuf) -> Config {
    Config {
        api: ApiConfig::default(),
        channel: ChannelConfig {
            channel_id: -100,
            bot_token: "123:abc".to_string(),
            api_base: "http://api.invalid".to_string(),
            gateway_url: "http://gateway.invalid".to_string(),
            size_threshold: 30,
        },
        source: SourceConfig {
            base_url: "http://source.invalid".to_string(),
            catalog_database_url: "postgres://invalid".to_string(),
            fetch_timeout: Duration::from_secs(1),
        },
        persistence: PersistenceConfig { database_path },
        mirror: MirrorConfig {
            workers: 4,
            retry_budget: 0,
            queue_capacity: 1000,
        },
    }
}

/// Fixed in-memory catalog
pub(crate) struct StaticCatalog {
    pub(crate) entries: Vec<CatalogEntry>,
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn list_books(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.entries.clone())
    }
}

/// Scripted source: metadata and content maps plus per-pair failure scripts.
///
/// Scripted failures are consumed in order before the content map is
/// consulted, so "two timeouts then success" is expressible.
#[derive(Default)]
pub(crate) struct MockSource {
    pub(crate) books: HashMap<i64, BookInfo>,
    pub(crate) content: HashMap<(i64, String), Vec<u8>>,
    pub(crate) failures: Mutex<HashMap<(i64, String), VecDeque<FetchError>>>,
    pub(crate) content_requests: Mutex<Vec<(i64, String)>>,
}

impl MockSource {
    pub(crate) fn with_book(mut self, book: BookInfo) -> Self {
        self.books.insert(book.id.0, book);
        self
    }

    pub(crate) fn with_content(mut self, id: i64, variant: &FileVariant, bytes: Vec<u8>) -> Self {
        self.content.insert((id, variant.as_str().to_string()), bytes);
        self
    }

    pub(crate) async fn script_failure(&self, id: i64, variant: &FileVariant, err: FetchError) {
        self.failures
            .lock()
            .await
            .entry((id, variant.as_str().to_string()))
            .or_default()
            .push_back(err);
    }

    pub(crate) async fn content_request_count(&self, id: i64, variant: &FileVariant) -> usize {
        let key = (id, variant.as_str().to_string());
        self.content_requests
            .lock()
            .await
            .iter()
            .filter(|r| **r == key)
            .count()
    }
}

#[async_trait]
impl SourceClient for MockSource {
    async fn fetch_book(&self, id: BookId) -> Result<Option<BookInfo>> {
        Ok(self.books.get(&id.0).cloned())
    }

    async fn fetch_content(
        &self,
        id: BookId,
        variant: &FileVariant,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let key = (id.0, variant.as_str().to_string());
        self.content_requests.lock().await.push(key.clone());

        if let Some(scripted) = self.failures.lock().await.get_mut(&key)
            && let Some(err) = scripted.pop_front()
        {
            return Err(err);
        }

        self.content
            .get(&key)
            .cloned()
            .ok_or(FetchError::NotFound { status: 404 })
    }
}

/// One recorded send attempt
#[derive(Debug, Clone)]
pub(crate) struct SendAttempt {
    pub(crate) path: DeliveryPath,
    pub(crate) chat_id: i64,
    pub(crate) filename: String,
    pub(crate) caption: String,
    pub(crate) size_bytes: usize,
}

/// Scripted delivery channel recording every attempt.
#[derive(Default)]
pub(crate) struct MockChannel {
    pub(crate) attempts: Mutex<Vec<SendAttempt>>,
    /// When set, every lightweight send fails with a transport error
    pub(crate) lightweight_fails: AtomicBool,
    /// Number of upcoming fallback sends to reject (size/part errors)
    pub(crate) fallback_rejections: AtomicU32,
    /// When set, every fallback send fails with a transport error
    pub(crate) fallback_fails: AtomicBool,
    next_message_id: AtomicI64,
    /// Documents "stored in the channel", keyed by message id
    pub(crate) stored: Mutex<HashMap<i64, Vec<u8>>>,
}

impl MockChannel {
    pub(crate) fn new() -> Self {
        Self {
            next_message_id: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    async fn record(&self, path: DeliveryPath, chat_id: i64, doc: &OutgoingDocument) {
        self.attempts.lock().await.push(SendAttempt {
            path,
            chat_id,
            filename: doc.filename.clone(),
            caption: doc.caption.clone(),
            size_bytes: doc.data.len(),
        });
    }

    async fn accept(&self, doc: &OutgoingDocument) -> MessageId {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.stored.lock().await.insert(id, doc.data.clone());
        MessageId(id)
    }

    pub(crate) async fn attempts_on(&self, path: DeliveryPath) -> usize {
        self.attempts
            .lock()
            .await
            .iter()
            .filter(|a| a.path == path)
            .count()
    }
}

#[async_trait]
impl DeliveryChannel for MockChannel {
    async fn send_lightweight(
        &self,
        chat_id: i64,
        doc: &OutgoingDocument,
    ) -> std::result::Result<MessageId, SendError> {
        self.record(DeliveryPath::Lightweight, chat_id, doc).await;
        if self.lightweight_fails.load(Ordering::SeqCst) {
            return Err(SendError::Transport("scripted lightweight failure".to_string()));
        }
        Ok(self.accept(doc).await)
    }

    async fn send_fallback(
        &self,
        chat_id: i64,
        doc: &OutgoingDocument,
    ) -> std::result::Result<MessageId, SendError> {
        self.record(DeliveryPath::Fallback, chat_id, doc).await;
        if self.fallback_fails.load(Ordering::SeqCst) {
            return Err(SendError::Transport("scripted fallback failure".to_string()));
        }
        let remaining = self.fallback_rejections.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fallback_rejections.store(remaining - 1, Ordering::SeqCst);
            return Err(SendError::Rejected("scripted rejection".to_string()));
        }
        Ok(self.accept(doc).await)
    }

    async fn fetch_document(&self, _chat_id: i64, message_id: MessageId) -> Result<Option<Vec<u8>>> {
        Ok(self.stored.lock().await.get(&message_id.0).cloned())
    }
}

/// Build a mirror over the given mocks and a fresh temp-file database.
/// Returns the mirror and the temp file (which must be kept alive).
pub(crate) async fn create_test_mirror(
    catalog: Vec<CatalogEntry>,
    source: Arc<MockSource>,
    channel: Arc<MockChannel>,
) -> (ChannelMirror, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let config = test_config(temp_file.path().to_path_buf());

    let db = Database::new(temp_file.path()).await.unwrap();
    let queue = Arc::new(TaskQueue::new(config.mirror.queue_capacity));
    let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

    let mirror = ChannelMirror {
        db: Arc::new(db),
        source,
        catalog: Arc::new(StaticCatalog { entries: catalog }),
        channel,
        queue,
        config: Arc::new(config),
        event_tx,
    };

    (mirror, temp_file)
}

/// A book with one author, matching the content the mocks serve.
pub(crate) fn sample_book(id: i64, native: &str) -> BookInfo {
    BookInfo {
        id: BookId(id),
        title: format!("Книга {id}"),
        lang: Some("ru".to_string()),
        file_type: Some(native.to_string()),
        authors: vec![crate::types::AuthorInfo {
            first_name: "Антон".to_string(),
            last_name: "Чехов".to_string(),
            middle_name: "Павлович".to_string(),
        }],
    }
}

/// Catalog entry shorthand
pub(crate) fn entry(id: i64, native: &str) -> CatalogEntry {
    CatalogEntry {
        id: BookId(id),
        file_type: FileVariant::from(native),
    }
}
