use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Capability gateway
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// When `false` (the default) every failed invocation is reported as
    /// `500 {"error": <message>}`.  When `true` the response also carries
    /// a `kind` field and a status code chosen by cause:
    /// validation → 400, not ready → 503, upstream → 502, internal → 500.
    #[serde(default)]
    pub tagged_errors: bool,
}
