//! AppState construction extracted from `main.rs`.
//!
//! Boot order matters: the store must be reachable before the client is
//! built, and routes are only derived once the client reports ready.

use std::sync::Arc;

use anyhow::Context;

use mb_client::{BridgeClient, MessagingClient};
use mb_domain::config::{Config, ConfigSeverity};
use mb_sessions::{ConsoleChallenge, LifecycleManager};

use crate::api::routes::RouteTable;
use crate::state::AppState;

/// Validate config, connect the store, bring the messaging session to
/// `READY` and return a fully-wired [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Durable session store ────────────────────────────────────────
    let store = mb_store::connect(&config.store)
        .await
        .with_context(|| format!("connecting to session store {}", config.store.uri))?;
    tracing::info!(backend = store.backend(), "session store connected");

    // ── Messaging client ─────────────────────────────────────────────
    let client: Arc<dyn MessagingClient> = Arc::new(BridgeClient::new(
        config.bridge.clone(),
        config.session.id.clone(),
    ));
    tracing::info!(url = %config.bridge.url, "bridge client ready");

    start_session(config, store, client).await
}

/// Run the session lifecycle to `READY` and snapshot the capability
/// surface.  Split out so alternative clients and stores can be wired in.
pub async fn start_session(
    config: Arc<Config>,
    store: Arc<dyn mb_store::SessionStore>,
    client: Arc<dyn MessagingClient>,
) -> anyhow::Result<AppState> {
    let challenges = Arc::new(ConsoleChallenge::new(config.session.render_qr));
    let lifecycle = LifecycleManager::new(&config.session, store, client.clone(), challenges);

    lifecycle
        .start()
        .await
        .context("starting session lifecycle")?;
    tracing::info!(session = %lifecycle.session(), "waiting for messaging client to become ready");
    lifecycle
        .wait_ready()
        .await
        .context("messaging client did not become ready")?;

    let routes = RouteTable::build(client.capabilities());
    tracing::info!(
        exposed = routes.len(),
        skipped = routes.skipped().len(),
        "capability routes built"
    );

    Ok(AppState::new(config, client, lifecycle, routes))
}
