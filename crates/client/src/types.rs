//! Events and error types shared by every client implementation.

use std::fmt;

/// Something the messaging client reports about its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A pairing challenge must be shown to the operator.
    Qr { code: String },
    /// The session is authenticated.  `session_data` resumes it later.
    Authenticated { session_data: Vec<u8> },
    /// Fully initialized; capabilities may now be enumerated.
    Ready,
    /// The client persisted its own copy of the session.
    RemoteSessionSaved,
    /// Authentication was rejected.
    AuthFailure { message: String },
    /// The messaging connection dropped.
    Disconnected { reason: String },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Qr { .. } => "qr",
            Self::Authenticated { .. } => "authenticated",
            Self::Ready => "ready",
            Self::RemoteSessionSaved => "remote_session_saved",
            Self::AuthFailure { .. } => "auth_failure",
            Self::Disconnected { .. } => "disconnected",
        }
    }
}

/// Connection-level client errors.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("websocket: {0}")]
    WebSocket(String),
    #[error("handshake: {0}")]
    Handshake(String),
    #[error("connect timed out after {0}s")]
    ConnectTimeout(u64),
    #[error("already connected")]
    AlreadyConnected,
    #[error("not connected")]
    NotConnected,
    #[error("snapshot: {0}")]
    Snapshot(String),
}

/// Why a capability invocation failed.
///
/// `Display` yields only the message so it can be passed through to HTTP
/// callers unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// Arguments did not match the capability's declared parameters.
    #[error("{0}")]
    Validation(String),
    /// The client cannot serve calls right now.
    #[error("{0}")]
    NotReady(String),
    /// The capability ran and failed, or the bridge dropped the call.
    #[error("{0}")]
    Upstream(String),
    /// Local failure unrelated to the capability itself.
    #[error("{0}")]
    Internal(String),
}

impl InvocationError {
    pub fn kind(&self) -> InvocationErrorKind {
        match self {
            Self::Validation(_) => InvocationErrorKind::Validation,
            Self::NotReady(_) => InvocationErrorKind::NotReady,
            Self::Upstream(_) => InvocationErrorKind::Upstream,
            Self::Internal(_) => InvocationErrorKind::Internal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::NotReady(m) | Self::Upstream(m) | Self::Internal(m) => m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationErrorKind {
    Validation,
    NotReady,
    Upstream,
    Internal,
}

impl InvocationErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotReady => "not_ready",
            Self::Upstream => "upstream",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for InvocationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_message() {
        let e = InvocationError::Upstream("boom".into());
        assert_eq!(e.to_string(), "boom");
        assert_eq!(e.kind().as_str(), "upstream");
    }

    #[test]
    fn event_names() {
        assert_eq!(ClientEvent::Ready.name(), "ready");
        assert_eq!(
            ClientEvent::AuthFailure { message: "x".into() }.name(),
            "auth_failure"
        );
    }
}
