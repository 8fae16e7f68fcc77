pub mod config;
pub mod doctor;

use clap::{Parser, Subcommand};
use mb_domain::config::Config;

/// msgbridge: HTTP bridge for a messaging client session.
#[derive(Debug, Parser)]
#[command(name = "msgbridge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults and environment
    /// overrides) as TOML.  Secrets are masked.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "MB_CONFIG";

/// Load the configuration from the path specified by `MB_CONFIG` (or
/// `config.toml` by default), then apply the `SESSION`, `STORE_URI`,
/// `BRIDGE_URL` and `PORT` overrides.  Returns the parsed [`Config`] and
/// the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| "config.toml".into());

    let mut config = Config::load(std::path::Path::new(&config_path))
        .map_err(|e| anyhow::anyhow!("loading {config_path}: {e}"))?;
    config
        .apply_env_overrides(|key| std::env::var(key).ok())
        .map_err(|e| anyhow::anyhow!("environment overrides: {e}"))?;

    Ok((config, config_path))
}
