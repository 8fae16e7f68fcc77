//! REST implementation of [`SessionStore`].
//!
//! Talks to a small document service:
//!
//! | Call                          | Meaning                         |
//! |-------------------------------|---------------------------------|
//! | `GET  {base}/health`          | liveness probe used by connect  |
//! | `HEAD {base}/sessions/{id}`   | 200 present, 404 absent         |
//! | `GET  {base}/sessions/{id}`   | 200 + [`SessionRecord`], 404    |
//! | `PUT  {base}/sessions/{id}`   | create or overwrite             |
//!
//! Calls are not retried; the backup loop saves again on its next tick.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use mb_domain::config::StoreConfig;
use mb_domain::trace::TraceEvent;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use uuid::Uuid;

use crate::provider::{SessionStore, StoreError, StoreResult};
use crate::record::SessionRecord;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct RestSessionStore {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl RestSessionStore {
    pub fn new(cfg: &StoreConfig) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let base_url = Url::parse(cfg.uri.trim().trim_end_matches('/'))
            .map_err(|_| StoreError::InvalidUri(cfg.uri.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUri(cfg.uri.clone()));
        }

        Ok(Self {
            http,
            base_url,
            api_key: cfg.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Probe `{base}/health`.  Any non-2xx answer or transport error means
    /// the store is unusable.
    pub async fn ping(&self) -> StoreResult<()> {
        let url = self.url(&["health"])?;
        let started = Instant::now();
        let resp = self
            .decorate(self.http.get(url))
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        let status = resp.status();
        self.trace("health", status, started);
        if !status.is_success() {
            return Err(StoreError::Unreachable(format!(
                "health check returned {status}"
            )));
        }
        Ok(())
    }

    // ── request helpers ──────────────────────────────────────────────

    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUri(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn session_url(&self, session: &str) -> StoreResult<Url> {
        crate::check_session_id(session)?;
        self.url(&["sessions", session])
    }

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let mut rb = rb
            .header("X-Client-Type", "msgbridge")
            .header("X-Trace-Id", Uuid::new_v4().to_string());
        if let Some(ref key) = self.api_key {
            rb = rb.header("X-Api-Key", key);
        }
        rb
    }

    async fn send(&self, op: &'static str, rb: RequestBuilder) -> StoreResult<Response> {
        let started = Instant::now();
        let resp = self
            .decorate(rb)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        self.trace(op, resp.status(), started);
        Ok(resp)
    }

    fn trace(&self, op: &str, status: StatusCode, started: Instant) {
        TraceEvent::StoreCall {
            backend: "rest".into(),
            op: op.into(),
            status: status.as_u16(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
    }
}

async fn status_error(op: &'static str, resp: Response) -> StoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StoreError::Status { op, status, body }
}

#[async_trait]
impl SessionStore for RestSessionStore {
    fn backend(&self) -> &'static str {
        "rest"
    }

    async fn exists(&self, session: &str) -> StoreResult<bool> {
        let url = self.session_url(session)?;
        let resp = self.send("exists", self.http.head(url)).await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error("exists", resp).await),
        }
    }

    async fn save(&self, session: &str, data: &[u8]) -> StoreResult<()> {
        let url = self.session_url(session)?;
        let record = SessionRecord::new(session, data.to_vec());
        let resp = self.send("save", self.http.put(url).json(&record)).await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(status_error("save", resp).await)
        }
    }

    async fn load(&self, session: &str) -> StoreResult<Option<SessionRecord>> {
        let url = self.session_url(session)?;
        let resp = self.send("load", self.http.get(url)).await?;
        match resp.status() {
            s if s.is_success() => {
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| StoreError::Http(e.to_string()))?;
                Ok(Some(serde_json::from_slice(&body)?))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(status_error("load", resp).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(uri: &str) -> RestSessionStore {
        RestSessionStore::new(&StoreConfig {
            uri: uri.into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn session_url_appends_segments() {
        let s = store("https://docs.example.com/api/");
        assert_eq!(
            s.session_url("default").unwrap().as_str(),
            "https://docs.example.com/api/sessions/default"
        );
    }

    #[test]
    fn session_url_escapes_identifier() {
        let s = store("http://localhost:9000");
        assert_eq!(
            s.session_url("a b").unwrap().as_str(),
            "http://localhost:9000/sessions/a%20b"
        );
    }

    #[test]
    fn non_http_uri_is_rejected() {
        let err = RestSessionStore::new(&StoreConfig {
            uri: "mailto:someone".into(),
            ..Default::default()
        });
        assert!(matches!(err, Err(StoreError::InvalidUri(_))));
    }
}
