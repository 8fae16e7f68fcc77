//! Messaging client abstraction for msgbridge.
//!
//! The gateway never talks to the messaging network itself.  It drives a
//! [`MessagingClient`]: connect (optionally resuming a stored session),
//! consume the [`ClientEvent`] stream, and forward capability invocations
//! once the client is ready.
//!
//! [`BridgeClient`] is the production adapter; it speaks the
//! `mb-protocol` envelope to a sidecar over WebSocket.
//! [`ScriptedClient`] is an in-process double for tests and dry runs.

pub mod bridge;
pub mod client;
pub mod scripted;
pub mod types;

pub use bridge::BridgeClient;
pub use client::MessagingClient;
pub use scripted::ScriptedClient;
pub use types::{ClientError, ClientEvent, InvocationError, InvocationErrorKind};
