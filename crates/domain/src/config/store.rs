use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Durable session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend URI.  The scheme selects the backend:
    ///
    /// | URI                     | Backend                              |
    /// |-------------------------|--------------------------------------|
    /// | `file:///var/lib/mb`    | one JSON document per session        |
    /// | `https://docs/api`      | REST document service                |
    /// | `memory://`             | in-process map (lost on restart)     |
    ///
    /// A bare filesystem path is treated as `file://`.
    #[serde(default = "d_uri")]
    pub uri: String,

    /// API key sent as `X-Api-Key` to REST backends.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout for REST backends.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: d_uri(),
            api_key: None,
            timeout_ms: d_timeout_ms(),
        }
    }
}

/// Backend family selected by a store URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Rest,
    Memory,
}

impl StoreBackend {
    pub fn from_uri(uri: &str) -> Option<Self> {
        let uri = uri.trim();
        if uri.starts_with("file://") {
            Some(Self::File)
        } else if uri.starts_with("http://") || uri.starts_with("https://") {
            Some(Self::Rest)
        } else if uri.starts_with("memory://") {
            Some(Self::Memory)
        } else if uri.contains("://") || uri.is_empty() {
            None
        } else {
            Some(Self::File)
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_uri() -> String {
    "file://./data/sessions".into()
}
fn d_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_from_uri() {
        assert_eq!(StoreBackend::from_uri("file:///tmp/x"), Some(StoreBackend::File));
        assert_eq!(StoreBackend::from_uri("./data"), Some(StoreBackend::File));
        assert_eq!(StoreBackend::from_uri("https://a/b"), Some(StoreBackend::Rest));
        assert_eq!(StoreBackend::from_uri("memory://"), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::from_uri("mongodb://x"), None);
        assert_eq!(StoreBackend::from_uri(""), None);
    }
}
