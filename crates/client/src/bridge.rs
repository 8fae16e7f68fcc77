//! WebSocket bridge client.  Drives a messaging-protocol sidecar.
//!
//! One connection per process.  After the `hello`/`welcome` handshake three
//! tasks run until the socket closes:
//!
//! - **reader**: turns sidecar frames into [`ClientEvent`]s and completes
//!   pending invocations / snapshots by `request_id`.
//! - **writer**: drains the outbound channel into the socket.
//! - **ping**: heartbeat at `bridge.heartbeat_secs`.
//!
//! When the socket closes every pending call fails with an upstream error
//! and a final [`ClientEvent::Disconnected`] is emitted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use mb_domain::capability::CapabilityDescriptor;
use mb_domain::config::BridgeConfig;
use mb_protocol::{
    decode_blob, encode_blob, BridgeMessage, RemoteError, RemoteErrorKind, MAX_FRAME_BYTES,
    PROTOCOL_VERSION,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::MessagingClient;
use crate::types::{ClientError, ClientEvent, InvocationError};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pending request tracker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

enum Pending {
    Invoke(oneshot::Sender<Result<Value, InvocationError>>),
    Snapshot(oneshot::Sender<Option<String>>),
}

/// Removes its pending entry when the waiting caller goes away, whether
/// it got a reply, failed, or was dropped mid-flight.
struct PendingSlot<'a> {
    pending: &'a Mutex<HashMap<String, Pending>>,
    request_id: String,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.request_id);
    }
}

struct Shared {
    outbound: Mutex<Option<mpsc::Sender<BridgeMessage>>>,
    /// Map of request_id → waiting caller.
    pending: Mutex<HashMap<String, Pending>>,
    capabilities: RwLock<Vec<CapabilityDescriptor>>,
    ready: AtomicBool,
}

impl Shared {
    /// Apply one inbound frame.  Returns the event to publish, if any.
    fn handle(&self, msg: BridgeMessage, outbound: &mpsc::Sender<BridgeMessage>) -> Option<ClientEvent> {
        match msg {
            BridgeMessage::Qr { code } => Some(ClientEvent::Qr { code }),
            BridgeMessage::Authenticated { session_data } => match decode_blob(&session_data) {
                Ok(bytes) => Some(ClientEvent::Authenticated {
                    session_data: bytes,
                }),
                Err(e) => Some(ClientEvent::AuthFailure {
                    message: format!("undecodable session data: {e}"),
                }),
            },
            BridgeMessage::Ready { capabilities } => {
                tracing::debug!(count = capabilities.len(), "sidecar advertised capabilities");
                *self.capabilities.write() = capabilities;
                self.ready.store(true, Ordering::SeqCst);
                Some(ClientEvent::Ready)
            }
            BridgeMessage::RemoteSessionSaved => Some(ClientEvent::RemoteSessionSaved),
            BridgeMessage::AuthFailure { message } => {
                self.ready.store(false, Ordering::SeqCst);
                Some(ClientEvent::AuthFailure { message })
            }
            BridgeMessage::Disconnected { reason } => {
                self.ready.store(false, Ordering::SeqCst);
                Some(ClientEvent::Disconnected { reason })
            }
            BridgeMessage::InvokeResult {
                request_id,
                ok,
                result,
                error,
            } => {
                match self.pending.lock().remove(&request_id) {
                    Some(Pending::Invoke(tx)) => {
                        let _ = tx.send(invoke_outcome(ok, result, error));
                    }
                    Some(Pending::Snapshot(_)) => {
                        tracing::warn!(request_id = %request_id, "invoke_result for a snapshot request");
                    }
                    None => {
                        tracing::debug!(request_id = %request_id, "invoke_result for unknown request");
                    }
                }
                None
            }
            BridgeMessage::Snapshot {
                request_id,
                session_data,
            } => {
                match self.pending.lock().remove(&request_id) {
                    Some(Pending::Snapshot(tx)) => {
                        let _ = tx.send(session_data);
                    }
                    Some(Pending::Invoke(tx)) => {
                        let _ = tx.send(Err(InvocationError::Upstream(
                            "sidecar answered an invocation with a snapshot".into(),
                        )));
                    }
                    None => {
                        tracing::debug!(request_id = %request_id, "snapshot for unknown request");
                    }
                }
                None
            }
            BridgeMessage::Ping { timestamp } => {
                let _ = outbound.try_send(BridgeMessage::Pong { timestamp });
                None
            }
            BridgeMessage::Pong { .. } => None,
            other @ (BridgeMessage::Hello { .. }
            | BridgeMessage::Welcome { .. }
            | BridgeMessage::Invoke { .. }
            | BridgeMessage::SnapshotRequest { .. }) => {
                tracing::warn!(message = ?other, "unexpected message from sidecar");
                None
            }
        }
    }

    /// Forget the connection and fail everything still waiting on it.
    fn teardown(&self, reason: &str) {
        self.ready.store(false, Ordering::SeqCst);
        *self.outbound.lock() = None;
        let drained: Vec<Pending> = self.pending.lock().drain().map(|(_, p)| p).collect();
        for pending in drained {
            if let Pending::Invoke(tx) = pending {
                let _ = tx.send(Err(InvocationError::Upstream(format!(
                    "bridge connection lost: {reason}"
                ))));
            }
        }
    }
}

fn invoke_outcome(
    ok: bool,
    result: Option<Value>,
    error: Option<RemoteError>,
) -> Result<Value, InvocationError> {
    if ok {
        return Ok(result.unwrap_or(Value::Null));
    }
    let err = error.unwrap_or_else(|| RemoteError {
        kind: RemoteErrorKind::Failed,
        message: "capability failed".into(),
    });
    Err(match err.kind {
        RemoteErrorKind::InvalidArgs | RemoteErrorKind::NotFound => {
            InvocationError::Validation(err.message)
        }
        RemoteErrorKind::NotReady => InvocationError::NotReady(err.message),
        RemoteErrorKind::Failed => InvocationError::Upstream(err.message),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BridgeClient
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct BridgeClient {
    cfg: BridgeConfig,
    session: String,
    shared: Arc<Shared>,
}

impl BridgeClient {
    pub fn new(cfg: BridgeConfig, session: impl Into<String>) -> Self {
        Self {
            cfg,
            session: session.into(),
            shared: Arc::new(Shared {
                outbound: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                capabilities: RwLock::new(Vec::new()),
                ready: AtomicBool::new(false),
            }),
        }
    }

    /// Number of invocations and snapshots awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    fn build_url(&self) -> String {
        let base = &self.cfg.url;
        match &self.cfg.token {
            Some(token) => {
                let sep = if base.contains('?') { "&" } else { "?" };
                format!("{base}{sep}token={token}")
            }
            None => base.clone(),
        }
    }

    fn outbound(&self) -> Option<mpsc::Sender<BridgeMessage>> {
        self.shared.outbound.lock().clone()
    }
}

#[async_trait]
impl MessagingClient for BridgeClient {
    async fn connect(
        &self,
        restore: Option<Vec<u8>>,
    ) -> Result<mpsc::Receiver<ClientEvent>, ClientError> {
        if self.shared.outbound.lock().is_some() {
            return Err(ClientError::AlreadyConnected);
        }

        let url = self.build_url();
        let deadline = self.cfg.connect_timeout();
        let secs = self.cfg.connect_timeout_secs;
        tracing::info!(url = %self.cfg.url, session = %self.session, "connecting to sidecar");

        let (ws, _response) = tokio::time::timeout(deadline, tokio_tungstenite::connect_async(url.as_str()))
            .await
            .map_err(|_| ClientError::ConnectTimeout(secs))?
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        // ── Send hello ───────────────────────────────────────────────
        let hello = BridgeMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            session: self.session.clone(),
            restore: restore.as_deref().map(encode_blob),
        };
        let json = serde_json::to_string(&hello).map_err(|e| ClientError::Handshake(e.to_string()))?;
        sink.send(Message::Text(json))
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;

        // ── Wait for welcome ─────────────────────────────────────────
        let welcome = tokio::time::timeout(deadline, async {
            while let Some(Ok(msg)) = stream.next().await {
                if let Message::Text(text) = msg {
                    if let Ok(BridgeMessage::Welcome { sidecar_version }) = serde_json::from_str(&text) {
                        return Ok(sidecar_version);
                    }
                }
            }
            Err(ClientError::Handshake("connection closed before welcome".into()))
        })
        .await
        .map_err(|_| ClientError::ConnectTimeout(secs))?;
        let sidecar_version = welcome?;

        tracing::info!(
            sidecar_version = %sidecar_version,
            session = %self.session,
            restoring = restore.is_some(),
            "sidecar welcomed us"
        );

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<BridgeMessage>(64);
        let (event_tx, event_rx) = mpsc::channel::<ClientEvent>(64);
        *self.shared.outbound.lock() = Some(outbound_tx.clone());
        let closed = CancellationToken::new();

        // Writer task: sends outbound messages to the WebSocket.
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize outbound message");
                        continue;
                    }
                };
                if sink.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Ping task: emit heartbeat pings until the socket closes.
        let ping_tx = outbound_tx.clone();
        let ping_every = self.cfg.heartbeat_interval();
        let ping_cancel = closed.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ping_every);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = ping_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let msg = BridgeMessage::Ping {
                            timestamp: Utc::now().timestamp_millis(),
                        };
                        if ping_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // Reader task: dispatch inbound messages.
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let reason = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_FRAME_BYTES {
                            tracing::warn!(bytes = text.len(), "oversized sidecar frame, dropping");
                            continue;
                        }
                        match serde_json::from_str::<BridgeMessage>(&text) {
                            Ok(msg) => {
                                if let Some(event) = shared.handle(msg, &outbound_tx) {
                                    if event_tx.send(event).await.is_err() {
                                        tracing::debug!("client event receiver dropped");
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "unparseable sidecar frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by sidecar".into());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break e.to_string(),
                    None => break "bridge connection closed".into(),
                }
            };

            tracing::warn!(reason = %reason, "sidecar connection ended");
            closed.cancel();
            shared.teardown(&reason);
            let _ = event_tx.send(ClientEvent::Disconnected { reason }).await;
        });

        Ok(event_rx)
    }

    fn capabilities(&self) -> Vec<CapabilityDescriptor> {
        self.shared.capabilities.read().clone()
    }

    async fn invoke(&self, capability: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        if !self.shared.ready.load(Ordering::SeqCst) {
            return Err(InvocationError::NotReady("messaging client is not ready".into()));
        }
        if !self.shared.capabilities.read().iter().any(|c| c.name == capability) {
            return Err(InvocationError::Validation(format!(
                "unknown capability: {capability}"
            )));
        }
        let outbound = self
            .outbound()
            .ok_or_else(|| InvocationError::NotReady("messaging client is not connected".into()))?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();

        // ── Bounded pending check ──────────────────────────────────
        {
            let mut pending = self.shared.pending.lock();
            let max = self.cfg.max_pending_requests;
            if max > 0 && pending.len() >= max {
                return Err(InvocationError::Internal(format!(
                    "pending limit reached ({} requests in-flight)",
                    pending.len()
                )));
            }
            pending.insert(request_id.clone(), Pending::Invoke(tx));
        }
        let _slot = PendingSlot {
            pending: &self.shared.pending,
            request_id: request_id.clone(),
        };

        let msg = BridgeMessage::Invoke {
            request_id,
            capability: capability.to_owned(),
            args,
        };
        if outbound.send(msg).await.is_err() {
            return Err(InvocationError::Upstream("bridge connection lost".into()));
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(InvocationError::Upstream("bridge connection lost".into())),
        }
    }

    async fn snapshot(&self) -> Result<Option<Vec<u8>>, ClientError> {
        let outbound = self.outbound().ok_or(ClientError::NotConnected)?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .insert(request_id.clone(), Pending::Snapshot(tx));
        let _slot = PendingSlot {
            pending: &self.shared.pending,
            request_id: request_id.clone(),
        };

        if outbound
            .send(BridgeMessage::SnapshotRequest { request_id })
            .await
            .is_err()
        {
            return Err(ClientError::NotConnected);
        }

        let data = match tokio::time::timeout(self.cfg.connect_timeout(), rx).await {
            Ok(Ok(data)) => data,
            Ok(Err(_)) => return Err(ClientError::Snapshot("bridge connection lost".into())),
            Err(_) => return Err(ClientError::Snapshot("timed out waiting for sidecar".into())),
        };

        data.map(|d| decode_blob(&d))
            .transpose()
            .map_err(|e| ClientError::Snapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str, token: Option<&str>) -> BridgeClient {
        BridgeClient::new(
            BridgeConfig {
                url: url.into(),
                token: token.map(Into::into),
                ..Default::default()
            },
            "default",
        )
    }

    #[test]
    fn build_url_with_token() {
        let c = client("ws://localhost:7010/bridge", Some("secret"));
        assert_eq!(c.build_url(), "ws://localhost:7010/bridge?token=secret");
    }

    #[test]
    fn build_url_with_existing_query_params() {
        let c = client("ws://localhost:7010/bridge?v=1", Some("secret"));
        assert_eq!(c.build_url(), "ws://localhost:7010/bridge?v=1&token=secret");
    }

    #[test]
    fn build_url_without_token() {
        let c = client("ws://localhost:7010/bridge", None);
        assert_eq!(c.build_url(), "ws://localhost:7010/bridge");
    }

    #[test]
    fn remote_error_kinds_map_to_invocation_errors() {
        let err = |kind| {
            invoke_outcome(
                false,
                None,
                Some(RemoteError {
                    kind,
                    message: "m".into(),
                }),
            )
            .unwrap_err()
        };
        assert!(matches!(err(RemoteErrorKind::InvalidArgs), InvocationError::Validation(_)));
        assert!(matches!(err(RemoteErrorKind::NotFound), InvocationError::Validation(_)));
        assert!(matches!(err(RemoteErrorKind::NotReady), InvocationError::NotReady(_)));
        assert!(matches!(err(RemoteErrorKind::Failed), InvocationError::Upstream(_)));
    }

    #[test]
    fn success_without_result_is_null() {
        assert_eq!(invoke_outcome(true, None, None).unwrap(), Value::Null);
    }

    #[test]
    fn failure_without_detail_is_upstream() {
        let err = invoke_outcome(false, None, None).unwrap_err();
        assert_eq!(err, InvocationError::Upstream("capability failed".into()));
    }

    #[tokio::test]
    async fn invoke_before_connect_is_not_ready() {
        let c = client("ws://127.0.0.1:1/bridge", None);
        let err = c.invoke("send", vec![]).await.unwrap_err();
        assert!(matches!(err, InvocationError::NotReady(_)));
    }

    #[tokio::test]
    async fn snapshot_before_connect_is_not_connected() {
        let c = client("ws://127.0.0.1:1/bridge", None);
        assert!(matches!(c.snapshot().await, Err(ClientError::NotConnected)));
    }
}
