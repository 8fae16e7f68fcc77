//! Session lifecycle for msgbridge.
//!
//! Owns the single authenticated messaging session of the process:
//! restoring it from the durable store, surfacing pairing challenges when
//! there is nothing to restore, persisting it on authentication and on a
//! fixed backup interval, and publishing the current [`SessionState`].

pub mod lifecycle;
pub mod pairing;
pub mod state;

pub use lifecycle::LifecycleManager;
pub use pairing::{ChallengeSink, ConsoleChallenge, PairingChallenge};
pub use state::{LifecycleError, SessionState};
