use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Messaging bridge (WebSocket sidecar)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the messaging-protocol sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// WebSocket URL of the sidecar.
    #[serde(default = "d_url")]
    pub url: String,

    /// Optional shared secret appended as `token=<..>` to the URL.
    #[serde(default)]
    pub token: Option<String>,

    /// Deadline for the TCP/WebSocket connect plus `welcome`.
    #[serde(default = "d_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Interval between heartbeat pings.
    #[serde(default = "d_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Maximum in-flight invocations (0 = unlimited).
    #[serde(default = "d_max_pending")]
    pub max_pending_requests: usize,
}

impl BridgeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: d_url(),
            token: None,
            connect_timeout_secs: d_connect_timeout_secs(),
            heartbeat_secs: d_heartbeat_secs(),
            max_pending_requests: d_max_pending(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_url() -> String {
    "ws://127.0.0.1:7010/bridge".into()
}
fn d_connect_timeout_secs() -> u64 {
    15
}
fn d_heartbeat_secs() -> u64 {
    30
}
fn d_max_pending() -> usize {
    256
}
