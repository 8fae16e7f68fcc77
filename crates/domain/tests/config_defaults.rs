use mb_domain::config::{Config, StoreBackend};

#[test]
fn default_session_identifier_is_default() {
    let config = Config::default();
    assert_eq!(config.session.id, "default");
}

#[test]
fn default_port_is_3000() {
    let config = Config::default();
    assert_eq!(config.server.port, 3000);
}

#[test]
fn default_store_is_file_backed() {
    let config = Config::default();
    assert_eq!(
        StoreBackend::from_uri(&config.store.uri),
        Some(StoreBackend::File)
    );
}

#[test]
fn full_document_parses() {
    let toml_str = r#"
[server]
host = "127.0.0.1"
port = 8080

[session]
id = "support-line"
backup_interval_secs = 600

[store]
uri = "https://sessions.internal/api"
api_key = "k-123"

[bridge]
url = "ws://sidecar:7010/bridge"
max_pending_requests = 32

[gateway]
tagged_errors = true
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.session.id, "support-line");
    assert_eq!(config.session.backup_interval_secs, 600);
    assert_eq!(config.store.api_key.as_deref(), Some("k-123"));
    assert_eq!(config.bridge.max_pending_requests, 32);
    assert!(config.gateway.tagged_errors);
    assert!(config.validate().is_empty());
}

#[test]
fn partial_document_keeps_other_defaults() {
    let config = Config::from_toml_str("[session]\nid = \"x\"\n").unwrap();
    assert_eq!(config.session.id, "x");
    assert_eq!(config.session.backup_interval_secs, 300);
    assert_eq!(config.server.port, 3000);
}

#[test]
fn malformed_document_is_a_config_error() {
    let err = Config::from_toml_str("[server\nport = 1").unwrap_err();
    assert!(err.to_string().starts_with("config:"));
}
