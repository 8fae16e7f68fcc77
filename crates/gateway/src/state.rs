use std::sync::Arc;

use mb_client::MessagingClient;
use mb_domain::config::Config;
use mb_sessions::LifecycleManager;

use crate::api::routes::RouteTable;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// The messaging client every route dispatches to.
    pub client: Arc<dyn MessagingClient>,
    pub lifecycle: Arc<LifecycleManager>,
    /// Capability routes, fixed once the client reported ready.
    pub routes: Arc<RouteTable>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        client: Arc<dyn MessagingClient>,
        lifecycle: Arc<LifecycleManager>,
        routes: RouteTable,
    ) -> Self {
        Self {
            config,
            client,
            lifecycle,
            routes: Arc::new(routes),
        }
    }
}
