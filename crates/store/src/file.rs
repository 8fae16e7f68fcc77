//! Filesystem-backed session store.
//!
//! Layout: `<dir>/<session>.json`, one [`SessionRecord`] per file.  Writes
//! go to `<session>.json.tmp` first and are renamed into place, so a crash
//! mid-write never leaves a truncated record behind.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use mb_domain::trace::TraceEvent;

use crate::provider::{SessionStore, StoreResult};
use crate::record::SessionRecord;

pub struct FileSessionStore {
    dir: PathBuf,
    /// Serializes writers so two saves of the same session cannot race on
    /// the temp file.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSessionStore {
    /// Open (creating if needed) the store directory.
    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, session: &str) -> PathBuf {
        self.dir.join(format!("{session}.json"))
    }

    fn trace(op: &str, status: u16, started: Instant) {
        TraceEvent::StoreCall {
            backend: "file".into(),
            op: op.into(),
            status,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn exists(&self, session: &str) -> StoreResult<bool> {
        crate::check_session_id(session)?;
        let started = Instant::now();
        let found = tokio::fs::try_exists(self.record_path(session)).await?;
        Self::trace("exists", if found { 200 } else { 404 }, started);
        Ok(found)
    }

    async fn save(&self, session: &str, data: &[u8]) -> StoreResult<()> {
        crate::check_session_id(session)?;
        let started = Instant::now();
        let record = SessionRecord::new(session, data.to_vec());
        let json = serde_json::to_vec_pretty(&record)?;

        let path = self.record_path(session);
        let tmp = path.with_extension("json.tmp");

        let _guard = self.write_lock.lock().await;
        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Self::trace("save", 200, started);
        Ok(())
    }

    async fn load(&self, session: &str) -> StoreResult<Option<SessionRecord>> {
        crate::check_session_id(session)?;
        let started = Instant::now();
        let bytes = match tokio::fs::read(self.record_path(session)).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::trace("load", 404, started);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let record: SessionRecord = serde_json::from_slice(&bytes)?;
        Self::trace("load", 200, started);
        Ok(Some(record))
    }
}
