//! In-process [`MessagingClient`] that replays a script of events.
//!
//! Default behaviour mirrors a well-formed messaging client: with a
//! restore blob it authenticates silently, without one it first issues a
//! pairing challenge.  Tests can override the script, the capability
//! surface and the invocation handler, and push further events after
//! connect with [`ScriptedClient::emit`].

use std::sync::Arc;

use async_trait::async_trait;
use mb_domain::capability::CapabilityDescriptor;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::client::MessagingClient;
use crate::types::{ClientError, ClientEvent, InvocationError};

type Script = dyn Fn(Option<&[u8]>) -> Vec<ClientEvent> + Send + Sync;
type Handler = dyn Fn(&str, &[Value]) -> Result<Value, InvocationError> + Send + Sync;

/// Session blob produced by the default script after pairing.
pub const PAIRED_SESSION: &[u8] = b"paired-session";

pub struct ScriptedClient {
    capabilities: Vec<CapabilityDescriptor>,
    script: Arc<Script>,
    handler: Arc<Handler>,
    events: Mutex<Option<mpsc::Sender<ClientEvent>>>,
    restores: Mutex<Vec<Option<Vec<u8>>>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    snapshot: Mutex<Option<Vec<u8>>>,
}

impl ScriptedClient {
    pub fn new(capabilities: Vec<CapabilityDescriptor>) -> Self {
        Self {
            capabilities,
            script: Arc::new(default_script),
            handler: Arc::new(|_, _| Ok(Value::Null)),
            events: Mutex::new(None),
            restores: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            snapshot: Mutex::new(None),
        }
    }

    /// Replace the events replayed on connect.
    pub fn with_script<F>(mut self, script: F) -> Self
    where
        F: Fn(Option<&[u8]>) -> Vec<ClientEvent> + Send + Sync + 'static,
    {
        self.script = Arc::new(script);
        self
    }

    /// Replace the invocation handler.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &[Value]) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Push an event after connect.  Returns `false` if not connected or
    /// the receiver is gone.
    pub async fn emit(&self, event: ClientEvent) -> bool {
        let tx = self.events.lock().clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Close the event stream, as if the connection ended.
    pub fn close(&self) {
        self.events.lock().take();
    }

    /// Restore blobs passed to each `connect` call, in order.
    pub fn restores(&self) -> Vec<Option<Vec<u8>>> {
        self.restores.lock().clone()
    }

    /// Invocations received, in order.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }
}

fn default_script(restore: Option<&[u8]>) -> Vec<ClientEvent> {
    match restore {
        Some(data) => vec![
            ClientEvent::Authenticated {
                session_data: data.to_vec(),
            },
            ClientEvent::Ready,
        ],
        None => vec![
            ClientEvent::Qr {
                code: "pairing-code".into(),
            },
            ClientEvent::Authenticated {
                session_data: PAIRED_SESSION.to_vec(),
            },
            ClientEvent::Ready,
        ],
    }
}

#[async_trait]
impl MessagingClient for ScriptedClient {
    async fn connect(
        &self,
        restore: Option<Vec<u8>>,
    ) -> Result<mpsc::Receiver<ClientEvent>, ClientError> {
        if self.events.lock().is_some() {
            return Err(ClientError::AlreadyConnected);
        }
        let events = (self.script)(restore.as_deref());
        self.restores.lock().push(restore);

        let (tx, rx) = mpsc::channel(events.len() + 64);
        for event in events {
            if let ClientEvent::Authenticated { ref session_data } = event {
                *self.snapshot.lock() = Some(session_data.clone());
            }
            // Capacity covers the whole script.
            let _ = tx.try_send(event);
        }
        *self.events.lock() = Some(tx);
        Ok(rx)
    }

    fn capabilities(&self) -> Vec<CapabilityDescriptor> {
        self.capabilities.clone()
    }

    async fn invoke(&self, capability: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        let outcome = (self.handler)(capability, &args);
        self.calls.lock().push((capability.to_owned(), args));
        outcome
    }

    async fn snapshot(&self) -> Result<Option<Vec<u8>>, ClientError> {
        Ok(self.snapshot.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_script_pairs_without_restore() {
        let client = ScriptedClient::new(vec![]);
        let mut rx = client.connect(None).await.unwrap();
        assert!(matches!(rx.recv().await, Some(ClientEvent::Qr { .. })));
        assert!(matches!(rx.recv().await, Some(ClientEvent::Authenticated { .. })));
        assert_eq!(rx.recv().await, Some(ClientEvent::Ready));
        assert_eq!(client.snapshot().await.unwrap().as_deref(), Some(PAIRED_SESSION));
    }

    #[tokio::test]
    async fn default_script_restores_silently() {
        let client = ScriptedClient::new(vec![]);
        let mut rx = client.connect(Some(b"stored".to_vec())).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(ClientEvent::Authenticated {
                session_data: b"stored".to_vec()
            })
        );
        assert_eq!(rx.recv().await, Some(ClientEvent::Ready));
        assert_eq!(client.restores(), vec![Some(b"stored".to_vec())]);
    }

    #[tokio::test]
    async fn close_ends_the_stream() {
        let client = ScriptedClient::new(vec![]).with_script(|_| vec![]);
        let mut rx = client.connect(None).await.unwrap();
        client.close();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn handler_and_call_log() {
        let client = ScriptedClient::new(vec![])
            .with_handler(|name, args| Ok(serde_json::json!({ "op": name, "n": args.len() })));
        let out = client.invoke("send", vec![Value::from(1)]).await.unwrap();
        assert_eq!(out["op"], "send");
        assert_eq!(client.calls().len(), 1);
    }
}
