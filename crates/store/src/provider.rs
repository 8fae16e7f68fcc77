//! The `SessionStore` trait defines the interface for all durable session
//! backends (file, REST, in-memory, test doubles).

use async_trait::async_trait;

use crate::record::SessionRecord;

/// Errors raised by session store backends.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("{op} returned {status}: {body}")]
    Status {
        op: &'static str,
        status: u16,
        body: String,
    },

    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("unsupported store URI: {0}")]
    InvalidUri(String),

    #[error("invalid session identifier: {0:?}")]
    InvalidSession(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key-value persistence of one opaque session blob per identifier.
///
/// Implementations must be safe to share across tasks; the lifecycle
/// manager and the backup loop call them concurrently.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Short backend name for logs (`"file"`, `"rest"`, `"memory"`).
    fn backend(&self) -> &'static str;

    /// Whether a record is currently stored for `session`.
    async fn exists(&self, session: &str) -> StoreResult<bool>;

    /// Create or overwrite the record for `session`.
    async fn save(&self, session: &str, data: &[u8]) -> StoreResult<()>;

    /// Fetch the record for `session`, `None` when absent.
    async fn load(&self, session: &str) -> StoreResult<Option<SessionRecord>>;
}
