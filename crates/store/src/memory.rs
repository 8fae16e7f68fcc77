use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::provider::{SessionStore, StoreResult};
use crate::record::SessionRecord;

/// In-process store.  Nothing survives a restart; meant for local
/// development and tests.
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, SessionRecord>>,
    saves: AtomicUsize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, as if a previous process had saved it.
    pub fn with_record(session: &str, data: &[u8]) -> Self {
        let store = Self::new();
        store
            .records
            .write()
            .insert(session.to_owned(), SessionRecord::new(session, data.to_vec()));
        store
    }

    /// Number of successful `save` calls since creation.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, session: &str) -> StoreResult<bool> {
        crate::check_session_id(session)?;
        Ok(self.records.read().contains_key(session))
    }

    async fn save(&self, session: &str, data: &[u8]) -> StoreResult<()> {
        crate::check_session_id(session)?;
        self.records
            .write()
            .insert(session.to_owned(), SessionRecord::new(session, data.to_vec()));
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn load(&self, session: &str) -> StoreResult<Option<SessionRecord>> {
        crate::check_session_id(session)?;
        Ok(self.records.read().get(session).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_saves() {
        let store = MemorySessionStore::new();
        store.save("default", b"a").await.unwrap();
        store.save("default", b"b").await.unwrap();
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load("default").await.unwrap().unwrap().data, b"b");
    }

    #[tokio::test]
    async fn seeded_record_exists() {
        let store = MemorySessionStore::with_record("default", b"seed");
        assert!(store.exists("default").await.unwrap());
        assert_eq!(store.save_count(), 0);
    }
}
