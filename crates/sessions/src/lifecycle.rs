//! Session lifecycle manager.
//!
//! Startup loads the durable record for the configured session.  With a
//! record the client resumes silently; without one it pairs, and every
//! challenge is shown unless the store already holds a record for the
//! session at that moment.  Each `authenticated` event is persisted once,
//! before the state moves to `AUTHENTICATED`.  A background loop
//! re-persists a fresh snapshot every `session.backup_interval_secs`.
//!
//! Failing before `READY` is terminal.  After `READY`, connection loss is
//! logged and the state is left alone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mb_client::{ClientEvent, MessagingClient};
use mb_domain::config::SessionConfig;
use mb_domain::trace::TraceEvent;
use mb_store::SessionStore;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::pairing::{ChallengeSink, PairingChallenge};
use crate::state::{LifecycleError, SessionState};

pub struct LifecycleManager {
    session: String,
    store: Arc<dyn SessionStore>,
    client: Arc<dyn MessagingClient>,
    challenges: Arc<dyn ChallengeSink>,
    backup_interval: Duration,
    state: watch::Sender<SessionState>,
    started: AtomicBool,
}

impl LifecycleManager {
    pub fn new(
        cfg: &SessionConfig,
        store: Arc<dyn SessionStore>,
        client: Arc<dyn MessagingClient>,
        challenges: Arc<dyn ChallengeSink>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Arc::new(Self {
            session: cfg.id.clone(),
            store,
            client,
            challenges,
            backup_interval: cfg.backup_interval(),
            state,
            started: AtomicBool::new(false),
        })
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve once the session is `READY`, or fail if it reached
    /// `CONNECTION_FAILED` first.
    pub async fn wait_ready(&self) -> Result<(), LifecycleError> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| matches!(s, SessionState::Ready) || s.is_terminal())
            .await
            .map_err(|_| LifecycleError::Stopped)?;
        match &*state {
            SessionState::ConnectionFailed { reason } => {
                Err(LifecycleError::ConnectionFailed(reason.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Load the stored session, connect the client, and spawn the event and
    /// backup loops.  Returns once the client is connecting; use
    /// [`wait_ready`](Self::wait_ready) to wait for `READY`.
    pub async fn start(self: &Arc<Self>) -> Result<(), LifecycleError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(LifecycleError::AlreadyStarted);
        }

        let restore = match self.store.load(&self.session).await {
            Ok(Some(record)) => {
                TraceEvent::SessionRestoreAttempted {
                    session: self.session.clone(),
                    record_bytes: record.data.len(),
                }
                .emit();
                Some(record.data)
            }
            Ok(None) => {
                tracing::info!(session = %self.session, "no stored session, pairing required");
                None
            }
            Err(e) => {
                tracing::warn!(
                    session = %self.session,
                    error = %e,
                    "failed to load stored session, pairing instead"
                );
                None
            }
        };
        let restoring = restore.is_some();

        let events = match self.client.connect(restore).await {
            Ok(rx) => rx,
            Err(e) => {
                let reason = format!("client connect failed: {e}");
                self.fail(&reason);
                return Err(LifecycleError::ConnectionFailed(reason));
            }
        };

        if !restoring {
            self.transition(SessionState::AwaitingPairing);
        }

        tokio::spawn(self.clone().run_events(events));
        tokio::spawn(self.clone().run_backups());
        Ok(())
    }

    /// Snapshot the live session and persist it.  Returns `true` when a
    /// record was written.  Does nothing unless authenticated.
    pub async fn backup_now(&self) -> bool {
        if !self.state().is_authenticated() {
            return false;
        }
        match self.client.snapshot().await {
            Ok(Some(data)) => self.persist(&data, "backup").await,
            Ok(None) => {
                tracing::debug!(session = %self.session, "client has no session to back up");
                false
            }
            Err(e) => {
                tracing::warn!(session = %self.session, error = %e, "session snapshot failed");
                false
            }
        }
    }

    // ── event handling ───────────────────────────────────────────────

    async fn run_events(self: Arc<Self>, mut events: mpsc::Receiver<ClientEvent>) {
        while let Some(event) = events.recv().await {
            tracing::debug!(session = %self.session, event = event.name(), "client event");
            match event {
                ClientEvent::Qr { code } => self.on_challenge(code).await,
                ClientEvent::Authenticated { session_data } => {
                    self.on_authenticated(&session_data).await
                }
                ClientEvent::Ready => self.transition(SessionState::Ready),
                ClientEvent::RemoteSessionSaved => {
                    tracing::info!(session = %self.session, "client saved its session remotely");
                }
                ClientEvent::AuthFailure { message } => {
                    self.connection_lost(&format!("authentication failed: {message}"));
                }
                ClientEvent::Disconnected { reason } => {
                    self.connection_lost(&format!("disconnected: {reason}"));
                }
            }
            if self.state().is_terminal() {
                return;
            }
        }
        self.connection_lost("client event stream closed");
    }

    async fn on_challenge(&self, code: String) {
        // The client wants pairing even if it was handed a record, so the
        // state moves on whether or not the prompt is shown.
        if self.state() == SessionState::Uninitialized {
            self.transition(SessionState::AwaitingPairing);
        }

        // A record may already exist while a slow restore is in flight;
        // prompting then would pair a second device.
        let stored = match self.store.exists(&self.session).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    session = %self.session,
                    error = %e,
                    "session lookup failed, showing pairing challenge"
                );
                false
            }
        };
        if stored {
            TraceEvent::PairingChallengeSuppressed {
                session: self.session.clone(),
            }
            .emit();
            return;
        }

        TraceEvent::PairingChallengeIssued {
            session: self.session.clone(),
        }
        .emit();
        self.challenges.present(&PairingChallenge {
            session: self.session.clone(),
            code,
        });
    }

    async fn on_authenticated(&self, data: &[u8]) {
        self.persist(data, "authenticated").await;
        if self.state() != SessionState::Ready {
            self.transition(SessionState::Authenticated);
        }
    }

    async fn persist(&self, data: &[u8], reason: &str) -> bool {
        let started = Instant::now();
        match self.store.save(&self.session, data).await {
            Ok(()) => {
                TraceEvent::SessionSaved {
                    session: self.session.clone(),
                    reason: reason.to_owned(),
                    bytes: data.len(),
                    duration_ms: started.elapsed().as_millis() as u64,
                }
                .emit();
                true
            }
            Err(e) => {
                tracing::error!(session = %self.session, reason, error = %e, "failed to persist session");
                TraceEvent::SessionSaveFailed {
                    session: self.session.clone(),
                    reason: reason.to_owned(),
                    error: e.to_string(),
                }
                .emit();
                false
            }
        }
    }

    /// Terminal before `READY`; logged only once serving.
    fn connection_lost(&self, reason: &str) {
        match self.state() {
            SessionState::Ready => {
                tracing::warn!(session = %self.session, reason, "messaging connection lost while serving");
            }
            SessionState::ConnectionFailed { .. } => {}
            _ => self.fail(reason),
        }
    }

    fn fail(&self, reason: &str) {
        tracing::error!(session = %self.session, reason, "session connection failed");
        self.transition(SessionState::ConnectionFailed {
            reason: reason.to_owned(),
        });
    }

    fn transition(&self, next: SessionState) {
        let session = &self.session;
        self.state.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            TraceEvent::SessionStateChanged {
                session: session.clone(),
                from: current.name().to_owned(),
                to: next.name().to_owned(),
            }
            .emit();
            *current = next;
            true
        });
    }

    // ── periodic backup ──────────────────────────────────────────────

    async fn run_backups(self: Arc<Self>) {
        let period = self.backup_interval;
        if period.is_zero() {
            tracing::warn!("session backups disabled (interval is zero)");
            return;
        }
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.state().is_terminal() {
                return;
            }
            self.backup_now().await;
        }
    }
}
