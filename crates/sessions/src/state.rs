use std::fmt;

/// Where the messaging session is in its lifecycle.
///
/// ```text
/// UNINITIALIZED ──▶ AWAITING_PAIRING ──▶ AUTHENTICATED ──▶ READY
///       │                  │                   │
///       └──────────────────┴───────────────────┴──▶ CONNECTION_FAILED
/// ```
///
/// A stored session skips `AWAITING_PAIRING`.  `CONNECTION_FAILED` is
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    AwaitingPairing,
    Authenticated,
    Ready,
    ConnectionFailed { reason: String },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::AwaitingPairing => "AWAITING_PAIRING",
            Self::Authenticated => "AUTHENTICATED",
            Self::Ready => "READY",
            Self::ConnectionFailed { .. } => "CONNECTION_FAILED",
        }
    }

    /// Authenticated or beyond; the session is worth backing up.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Ready)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { reason } => write!(f, "CONNECTION_FAILED ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("lifecycle already started")]
    AlreadyStarted,
    #[error("lifecycle manager stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_predicates() {
        assert_eq!(SessionState::AwaitingPairing.name(), "AWAITING_PAIRING");
        assert!(SessionState::Ready.is_authenticated());
        assert!(!SessionState::AwaitingPairing.is_authenticated());
        let failed = SessionState::ConnectionFailed {
            reason: "auth".into(),
        };
        assert!(failed.is_terminal());
        assert_eq!(failed.to_string(), "CONNECTION_FAILED (auth)");
    }
}
