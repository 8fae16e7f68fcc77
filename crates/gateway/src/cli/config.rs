use mb_domain::config::{Config, ConfigSeverity};

const MASK: &str = "********";

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when at least one error was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = render(config)?;
    print!("{output}");
    Ok(())
}

fn render(config: &Config) -> anyhow::Result<String> {
    let mut masked = config.clone();
    if masked.store.api_key.is_some() {
        masked.store.api_key = Some(MASK.into());
    }
    if masked.bridge.token.is_some() {
        masked.bridge.token = Some(MASK.into());
    }
    toml::to_string_pretty(&masked).map_err(|e| anyhow::anyhow!("serializing config: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_secrets() {
        let mut config = Config::default();
        config.store.api_key = Some("k-123".into());
        config.bridge.token = Some("t-456".into());
        let out = render(&config).unwrap();
        assert!(!out.contains("k-123"));
        assert!(!out.contains("t-456"));
        assert!(out.contains(MASK));
    }

    #[test]
    fn rendered_config_parses_back() {
        let out = render(&Config::default()).unwrap();
        let parsed = Config::from_toml_str(&out).unwrap();
        assert_eq!(parsed.server.port, 3000);
        assert_eq!(parsed.session.id, "default");
    }
}
