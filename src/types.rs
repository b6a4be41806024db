//! Core types for book-mirror

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a catalog book
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct BookId(pub i64);

impl BookId {
    /// Create a new BookId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for BookId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<BookId> for i64 {
    fn from(id: BookId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for BookId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BookId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for BookId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for BookId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for BookId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Identifier of a delivered channel message
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Create a new MessageId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<MessageId> for i64 {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl sqlx::Type<sqlx::Sqlite> for MessageId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for MessageId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for MessageId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// A named file-format representation of a book
///
/// The catalog's native `fb2` format is the primary variant; the archive
/// mirrors it together with its derived conversions. Books whose native
/// format is anything else are mirrored in that single format only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileVariant {
    /// Native FictionBook source
    Fb2,
    /// Zip-compressed FictionBook
    Fb2Zip,
    /// EPUB conversion
    Epub,
    /// Mobipocket conversion
    Mobi,
    /// Any other native format (pdf, djvu, ...)
    Other(String),
}

impl FileVariant {
    /// The wire tag as stored in the archive table and used in source URLs
    pub fn as_str(&self) -> &str {
        match self {
            FileVariant::Fb2 => "fb2",
            FileVariant::Fb2Zip => "fb2+zip",
            FileVariant::Epub => "epub",
            FileVariant::Mobi => "mobi",
            FileVariant::Other(tag) => tag,
        }
    }

    /// Whether this is the primary (highest-priority) variant
    pub fn is_primary(&self) -> bool {
        matches!(self, FileVariant::Fb2)
    }

    /// The full variant set mirrored for a book with this native format
    ///
    /// A primary-native book expands to the fixed derived set; any other
    /// native format stands alone.
    pub fn expansion(&self) -> Vec<FileVariant> {
        if self.is_primary() {
            vec![
                FileVariant::Fb2,
                FileVariant::Fb2Zip,
                FileVariant::Epub,
                FileVariant::Mobi,
            ]
        } else {
            vec![self.clone()]
        }
    }

    /// The variant tag as used in a filename suffix (`+` is not filename-safe)
    pub fn file_suffix(&self) -> String {
        self.as_str().replace('+', ".")
    }
}

impl From<String> for FileVariant {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "fb2" => FileVariant::Fb2,
            "fb2+zip" => FileVariant::Fb2Zip,
            "epub" => FileVariant::Epub,
            "mobi" => FileVariant::Mobi,
            _ => FileVariant::Other(tag),
        }
    }
}

impl From<&str> for FileVariant {
    fn from(tag: &str) -> Self {
        FileVariant::from(tag.to_string())
    }
}

impl From<FileVariant> for String {
    fn from(variant: FileVariant) -> Self {
        variant.as_str().to_string()
    }
}

impl std::fmt::Display for FileVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch priority of a delivery task
///
/// `High` (the primary variant) always dispatches before `Normal` while both
/// bands are pending; within a band tasks dispatch in enqueue order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Primary-variant band (dispatched first)
    High,
    /// Everything else
    #[default]
    Normal,
}

impl Priority {
    /// Convert integer priority code to Priority enum
    pub fn from_i32(priority: i32) -> Self {
        match priority {
            0 => Priority::High,
            _ => Priority::Normal,
        }
    }

    /// Convert Priority enum to integer priority code
    pub fn to_i32(&self) -> i32 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
        }
    }
}

/// A unit of work: deliver one file variant of one book to the channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    /// Book to deliver
    pub book_id: BookId,
    /// File variant to deliver
    pub variant: FileVariant,
    /// Dispatch band
    pub priority: Priority,
    /// Remaining retry budget; the task is attempted at most
    /// `retries_remaining + 1` times in total
    pub retries_remaining: u32,
}

impl Task {
    /// Create a task for a (book, variant) pair with the given retry budget
    ///
    /// The priority follows from the variant: primary gets the high band.
    pub fn new(book_id: BookId, variant: FileVariant, retries: u32) -> Self {
        let priority = if variant.is_primary() {
            Priority::High
        } else {
            Priority::Normal
        };
        Self {
            book_id,
            variant,
            priority,
            retries_remaining: retries,
        }
    }

    /// The follow-up task enqueued after a retryable failure
    ///
    /// Keeps the original priority and spends one unit of budget. Callers
    /// must check `retries_remaining > 0` first.
    pub fn retried(&self) -> Self {
        Self {
            retries_remaining: self.retries_remaining.saturating_sub(1),
            ..self.clone()
        }
    }
}

/// Which transport delivered a document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryPath {
    /// Size-restricted Bot API path
    Lightweight,
    /// Unrestricted gateway path
    Fallback,
}

/// Book metadata fetched from the source service
///
/// Populated once at fetch time; caption and filename formatting are pure
/// functions over this struct.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookInfo {
    /// Catalog book id
    pub id: BookId,
    /// Book title
    pub title: String,
    /// Language code, when the catalog knows it
    #[serde(default)]
    pub lang: Option<String>,
    /// Native file format tag
    #[serde(default)]
    pub file_type: Option<String>,
    /// Contributing authors, possibly empty
    #[serde(default)]
    pub authors: Vec<AuthorInfo>,
}

/// A single contributor as the source service reports it
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthorInfo {
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Patronymic / middle name
    #[serde(default)]
    pub middle_name: String,
}

impl AuthorInfo {
    /// Full display name: last, first, and middle names joined by spaces,
    /// skipping empty parts
    pub fn normal_name(&self) -> String {
        let mut name = String::new();
        for part in [&self.last_name, &self.first_name, &self.middle_name] {
            if part.is_empty() {
                continue;
            }
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(part);
        }
        name
    }

    /// Short form for filenames: family name plus initials
    pub fn short_name(&self) -> String {
        let mut name = String::new();
        if !self.last_name.is_empty() {
            name.push_str(&self.last_name);
        }
        for part in [&self.first_name, &self.middle_name] {
            if let Some(initial) = part.chars().next() {
                if !name.is_empty() {
                    name.push(' ');
                }
                name.push(initial);
            }
        }
        name
    }
}

/// Event emitted during the mirror run lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Producer enqueued a pending delivery task
    TaskQueued {
        /// Book to deliver
        book_id: BookId,
        /// File variant to deliver
        variant: FileVariant,
        /// Dispatch band
        priority: Priority,
    },

    /// Producer finished enumerating the catalog
    ProducerFinished {
        /// Number of tasks enqueued during enumeration
        queued: usize,
    },

    /// A worker started fetching content from the source
    FetchStarted {
        /// Book being fetched
        book_id: BookId,
        /// Variant being fetched
        variant: FileVariant,
    },

    /// A worker started uploading to the channel
    UploadStarted {
        /// Book being uploaded
        book_id: BookId,
        /// Variant being uploaded
        variant: FileVariant,
        /// Payload size in bytes
        size_bytes: u64,
    },

    /// A document was delivered and its message id recorded
    Delivered {
        /// Delivered book
        book_id: BookId,
        /// Delivered variant
        variant: FileVariant,
        /// Resulting channel message id
        message_id: MessageId,
        /// Transport that carried the document
        path: DeliveryPath,
    },

    /// A task hit a retryable failure and re-entered the queue
    TaskRetried {
        /// Book of the retried task
        book_id: BookId,
        /// Variant of the retried task
        variant: FileVariant,
        /// Budget left after this retry was scheduled
        retries_remaining: u32,
    },

    /// A task was dropped permanently
    TaskDropped {
        /// Book of the dropped task
        book_id: BookId,
        /// Variant of the dropped task
        variant: FileVariant,
        /// Why the task was dropped
        reason: String,
    },
}
