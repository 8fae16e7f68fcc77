mod bridge;
mod gateway;
mod observability;
mod server;
mod session;
mod store;

pub use bridge::*;
pub use gateway::*;
pub use observability::*;
pub use server::*;
pub use session::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loading & environment overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Environment variable naming the session identifier.
pub const ENV_SESSION: &str = "SESSION";
/// Lowercase spelling accepted for deployments that already export it.
pub const ENV_SESSION_LEGACY: &str = "session";
/// Environment variable holding the durable store URI.
pub const ENV_STORE_URI: &str = "STORE_URI";
/// Environment variable holding the messaging bridge URL.
pub const ENV_BRIDGE_URL: &str = "BRIDGE_URL";
/// Environment variable holding the HTTP listen port.
pub const ENV_PORT: &str = "PORT";

impl Config {
    /// Parse a TOML document.  Missing sections fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read `path` if it exists, otherwise return the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Apply environment overrides using `lookup` (normally
    /// `std::env::var(..).ok()`).  Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = get(ENV_SESSION).or_else(|| get(ENV_SESSION_LEGACY)) {
            self.session.id = id;
        }
        if let Some(uri) = get(ENV_STORE_URI) {
            self.store.uri = uri;
        }
        if let Some(url) = get(ENV_BRIDGE_URL) {
            self.bridge.url = url;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_PORT}={port:?} is not a valid port")))?;
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.session.id.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "session.id".into(),
                message: "session identifier must not be empty".into(),
            });
        } else if self.session.id.contains(['/', '\\']) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "session.id".into(),
                message: "session identifier must not contain path separators".into(),
            });
        }

        if self.session.backup_interval_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "session.backup_interval_secs".into(),
                message: "backup interval must be greater than 0".into(),
            });
        } else if self.session.backup_interval_secs < 60 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "session.backup_interval_secs".into(),
                message: "backups more often than once a minute put load on the store".into(),
            });
        }

        if self.store.uri.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.uri".into(),
                message: format!("store URI must not be empty (set {ENV_STORE_URI})"),
            });
        } else if StoreBackend::from_uri(&self.store.uri).is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.uri".into(),
                message: format!(
                    "unsupported store URI {:?} (expected file://, http(s):// or memory://)",
                    self.store.uri
                ),
            });
        } else if StoreBackend::from_uri(&self.store.uri) == Some(StoreBackend::Memory) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "store.uri".into(),
                message: "memory:// store does not survive a restart".into(),
            });
        }

        if !(self.bridge.url.starts_with("ws://") || self.bridge.url.starts_with("wss://")) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "bridge.url".into(),
                message: format!("bridge URL must be ws:// or wss:// (got {:?})", self.bridge.url),
            });
        }

        if self.bridge.max_pending_requests == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "bridge.max_pending_requests".into(),
                message: "0 disables the in-flight request limit".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
