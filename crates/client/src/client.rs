use async_trait::async_trait;
use mb_domain::capability::CapabilityDescriptor;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::types::{ClientError, ClientEvent, InvocationError};

/// A connection to the messaging network.
///
/// Implementations synchronize internally; the lifecycle manager, the
/// backup loop and every HTTP request share one instance.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Start connecting.  `restore` is a session blob from the durable
    /// store; when present the client resumes without pairing.
    ///
    /// Events arrive on the returned channel until the connection ends.
    async fn connect(
        &self,
        restore: Option<Vec<u8>>,
    ) -> Result<mpsc::Receiver<ClientEvent>, ClientError>;

    /// The public surface advertised by the client.  Empty before
    /// [`ClientEvent::Ready`].
    fn capabilities(&self) -> Vec<CapabilityDescriptor>;

    /// Call a capability with positional arguments.
    async fn invoke(&self, capability: &str, args: Vec<Value>) -> Result<Value, InvocationError>;

    /// Current session blob, `None` when not authenticated.
    async fn snapshot(&self) -> Result<Option<Vec<u8>>, ClientError>;
}
