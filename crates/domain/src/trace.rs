use serde::Serialize;

/// Structured trace events emitted across all msgbridge crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionStateChanged {
        session: String,
        from: String,
        to: String,
    },
    SessionRestoreAttempted {
        session: String,
        record_bytes: usize,
    },
    PairingChallengeIssued {
        session: String,
    },
    PairingChallengeSuppressed {
        session: String,
    },
    SessionSaved {
        session: String,
        reason: String,
        bytes: usize,
        duration_ms: u64,
    },
    SessionSaveFailed {
        session: String,
        reason: String,
        error: String,
    },
    RouteTableBuilt {
        exposed: usize,
        skipped: usize,
    },
    CapabilityInvoked {
        capability: String,
        ok: bool,
        duration_ms: u64,
    },
    StoreCall {
        backend: String,
        op: String,
        status: u16,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "mb_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::PairingChallengeSuppressed {
            session: "default".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "PairingChallengeSuppressed");
        assert_eq!(json["session"], "default");
    }
}
