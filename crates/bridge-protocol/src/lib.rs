//! Bridge protocol: WebSocket message types exchanged between the gateway
//! and the messaging-protocol sidecar.
//!
//! The sidecar owns the actual messaging network connection.  The gateway
//! opens one WebSocket per process, says `hello` (optionally carrying a
//! stored session to resume), then receives authentication events and
//! forwards capability invocations.
//!
//! ```text
//! gateway                                 sidecar
//!   │ ── hello {session, restore?} ──────▶ │
//!   │ ◀───────────── welcome ──────────────│
//!   │ ◀──────── qr {code} (0..n) ──────────│   pairing needed
//!   │ ◀── authenticated {session_data} ────│
//!   │ ◀──── ready {capabilities} ──────────│
//!   │ ── invoke {request_id, ..} ────────▶ │
//!   │ ◀── invoke_result {request_id, ..} ──│
//!   │ ── snapshot_request ───────────────▶ │   periodic backup
//!   │ ◀── snapshot {session_data?} ────────│
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mb_domain::capability::CapabilityDescriptor;
use serde::{Deserialize, Serialize};

/// Bumped on incompatible envelope changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Inbound frames larger than this are dropped before parsing.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// WebSocket message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    /// Gateway → Sidecar: open the named session, resuming from
    /// `restore` (base64 session blob) when present.
    Hello {
        protocol_version: u32,
        session: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        restore: Option<String>,
    },

    /// Sidecar → Gateway: handshake accepted.
    Welcome { sidecar_version: String },

    /// Sidecar → Gateway: a pairing challenge payload (QR contents).
    Qr { code: String },

    /// Sidecar → Gateway: the session is authenticated.  `session_data`
    /// is the base64 blob needed to resume it later.
    Authenticated { session_data: String },

    /// Sidecar → Gateway: fully initialized; advertises its public surface.
    Ready {
        capabilities: Vec<CapabilityDescriptor>,
    },

    /// Sidecar → Gateway: the sidecar persisted its own copy of the session.
    RemoteSessionSaved,

    /// Sidecar → Gateway: authentication was rejected.
    AuthFailure { message: String },

    /// Sidecar → Gateway: the messaging network connection dropped.
    Disconnected { reason: String },

    /// Gateway → Sidecar: call a capability with positional arguments.
    Invoke {
        request_id: String,
        capability: String,
        args: Vec<serde_json::Value>,
    },

    /// Sidecar → Gateway: outcome of an `invoke`.
    InvokeResult {
        request_id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<RemoteError>,
    },

    /// Gateway → Sidecar: request the current session blob.
    SnapshotRequest { request_id: String },

    /// Sidecar → Gateway: reply to `snapshot_request`.  `None` when the
    /// session is not authenticated.
    Snapshot {
        request_id: String,
        #[serde(default)]
        session_data: Option<String>,
    },

    /// Bidirectional: heartbeat.
    Ping { timestamp: i64 },

    /// Bidirectional: heartbeat response.
    Pong { timestamp: i64 },
}

/// Failure reported by the sidecar for an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub kind: RemoteErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    InvalidArgs,
    NotReady,
    NotFound,
    #[default]
    Failed,
}

/// Encode a session blob for the wire.
pub fn encode_blob(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a session blob received from the wire.
pub fn decode_blob(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data.trim())
}
