//! `mb-store`: durable session storage for msgbridge.
//!
//! Provides the [`SessionStore`] trait (one opaque session blob per
//! session identifier) and three implementations selected by the
//! `store.uri` scheme:
//!
//! | Scheme                 | Implementation         | Notes                         |
//! |------------------------|------------------------|-------------------------------|
//! | `file://` / bare path  | [`FileSessionStore`]   | one JSON document per session |
//! | `http://`, `https://`  | [`RestSessionStore`]   | REST document service         |
//! | `memory://`            | [`MemorySessionStore`] | lost on restart               |
//!
//! Use [`connect`] at startup.  A connect failure is meant to be fatal:
//! running without a reachable store would silently lose the session.

pub mod file;
pub mod memory;
pub mod provider;
pub mod record;
pub mod rest;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;
pub use provider::{SessionStore, StoreError, StoreResult};
pub use record::SessionRecord;
pub use rest::RestSessionStore;

use std::sync::Arc;

use mb_domain::config::{StoreBackend, StoreConfig};

/// Open the backend named by `cfg.uri` and verify it is usable.
pub async fn connect(cfg: &StoreConfig) -> StoreResult<Arc<dyn SessionStore>> {
    match StoreBackend::from_uri(&cfg.uri) {
        Some(StoreBackend::File) => {
            let dir = cfg.uri.trim().trim_start_matches("file://");
            let store = FileSessionStore::open(dir).await?;
            tracing::info!(dir = %store.dir().display(), "file session store ready");
            Ok(Arc::new(store))
        }
        Some(StoreBackend::Rest) => {
            let store = RestSessionStore::new(cfg)?;
            store.ping().await?;
            tracing::info!(url = %store.base_url(), "REST session store ready");
            Ok(Arc::new(store))
        }
        Some(StoreBackend::Memory) => {
            tracing::warn!("using in-memory session store; sessions will not survive a restart");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        None => Err(StoreError::InvalidUri(cfg.uri.clone())),
    }
}

/// Reject identifiers that cannot be used as a document key.
pub(crate) fn check_session_id(session: &str) -> StoreResult<()> {
    if session.trim().is_empty()
        || session.contains(['/', '\\'])
        || session == "."
        || session == ".."
    {
        return Err(StoreError::InvalidSession(session.to_owned()));
    }
    Ok(())
}
