//! Configuration types for book-mirror

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind host (default: "localhost")
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port (default: 7080)
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Delivery channel configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Target channel identifier (chat id)
    pub channel_id: i64,

    /// Bot token for the lightweight Bot API path
    pub bot_token: String,

    /// Hosted Bot API base URL (default: "https://api.telegram.org")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL of the upload gateway used as the fallback path
    ///
    /// The gateway mirrors the Bot API `sendDocument` contract without the
    /// hosted size restriction, and additionally serves archived documents
    /// back for the `/download` route.
    pub gateway_url: String,

    /// Payload size below which the lightweight path is attempted first
    /// (default: 30 MB)
    #[serde(default = "default_size_threshold")]
    pub size_threshold: u64,
}

/// Source service configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the source content service (default: "http://localhost:7770")
    #[serde(default = "default_source_url")]
    pub base_url: String,

    /// Connection URL of the catalog database enumerated by the producer
    pub catalog_database_url: String,

    /// Deadline for a single content fetch (default: 30 minutes — source
    /// files may be large)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,
}

/// Archive persistence configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite archive database (default: "./book-mirror.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Mirror run configuration (worker pool and retry policy)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Number of concurrent delivery workers (default: 10)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Retry budget given to every produced task (default: 2)
    ///
    /// A task with budget `k` is attempted at most `k + 1` times before it is
    /// dropped for the rest of the run.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Maximum number of pending tasks; enqueue blocks when full
    /// (default: 10 000)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry_budget: default_retry_budget(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Main configuration for the mirror service
///
/// Fields are organized into logical sub-configs:
/// - [`api`](ApiConfig) — HTTP surface bind address
/// - [`channel`](ChannelConfig) — delivery target and transports
/// - [`source`](SourceConfig) — content service and catalog index
/// - [`persistence`](PersistenceConfig) — archive database
/// - [`mirror`](MirrorConfig) — worker pool and retry policy
///
/// Load from the environment with [`Config::from_env`]; a missing required
/// value is a fatal startup error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// HTTP surface bind address
    #[serde(default)]
    pub api: ApiConfig,

    /// Delivery target and transports
    pub channel: ChannelConfig,

    /// Content service and catalog index
    pub source: SourceConfig,

    /// Archive database
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Worker pool and retry policy
    #[serde(default)]
    pub mirror: MirrorConfig,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Required: `BOT_TOKEN`, `CHANNEL_ID`, `GATEWAY_URL`,
    /// `CATALOG_DATABASE_URL`. Everything else has a default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending variable when a
    /// required value is absent or a value fails to parse.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api: ApiConfig {
                host: optional("HOST", default_host()),
                port: parsed("PORT", default_port())?,
            },
            channel: ChannelConfig {
                channel_id: required("CHANNEL_ID")?
                    .parse()
                    .map_err(|e| parse_error("CHANNEL_ID", e))?,
                bot_token: required("BOT_TOKEN")?,
                api_base: optional("TELEGRAM_API_URL", default_api_base()),
                gateway_url: required("GATEWAY_URL")?,
                size_threshold: parsed("SIZE_THRESHOLD_BYTES", default_size_threshold())?,
            },
            source: SourceConfig {
                base_url: optional("SOURCE_URL", default_source_url()),
                catalog_database_url: required("CATALOG_DATABASE_URL")?,
                fetch_timeout: Duration::from_secs(parsed(
                    "FETCH_TIMEOUT_SECS",
                    default_fetch_timeout().as_secs(),
                )?),
            },
            persistence: PersistenceConfig {
                database_path: PathBuf::from(optional(
                    "DATABASE_PATH",
                    default_database_path().display().to_string(),
                )),
            },
            mirror: MirrorConfig {
                workers: parsed("WORKERS", default_workers())?,
                retry_budget: parsed("RETRY_BUDGET", default_retry_budget())?,
                queue_capacity: parsed("QUEUE_CAPACITY", default_queue_capacity())?,
            },
        })
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| Error::Config {
        message: format!("missing required environment variable {key}"),
        key: Some(key.to_string()),
    })
}

fn optional(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map_err(|e| parse_error(key, e)),
        Err(_) => Ok(default),
    }
}

fn parse_error(key: &str, err: impl std::fmt::Display) -> Error {
    Error::Config {
        message: format!("invalid value for {key}: {err}"),
        key: Some(key.to_string()),
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    7080
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_size_threshold() -> u64 {
    30_000_000
}

fn default_source_url() -> String {
    "http://localhost:7770".to_string()
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./book-mirror.db")
}

fn default_workers() -> usize {
    10
}

fn default_retry_budget() -> u32 {
    2
}

fn default_queue_capacity() -> usize {
    10_000
}

/// Serde module for serializing/deserializing Duration as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
