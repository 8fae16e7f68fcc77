use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which authenticated messaging session this process owns and how often
/// its state is backed up to the durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session identifier; the durable record is keyed by this value.
    #[serde(default = "d_session_id")]
    pub id: String,

    /// Interval between periodic backups of the live session state.
    #[serde(default = "d_backup_interval_secs")]
    pub backup_interval_secs: u64,

    /// Render pairing challenges as a terminal QR code.  When `false`
    /// the raw payload is logged instead.
    #[serde(default = "d_true")]
    pub render_qr: bool,
}

impl SessionConfig {
    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id: d_session_id(),
            backup_interval_secs: d_backup_interval_secs(),
            render_qr: true,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_session_id() -> String {
    "default".into()
}
fn d_backup_interval_secs() -> u64 {
    300
}
fn d_true() -> bool {
    true
}
