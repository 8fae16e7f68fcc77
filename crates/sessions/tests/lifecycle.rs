//! End-to-end lifecycle behaviour against in-process stores and clients.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mb_client::scripted::PAIRED_SESSION;
use mb_client::{ClientEvent, ScriptedClient};
use mb_domain::config::SessionConfig;
use mb_sessions::{ChallengeSink, LifecycleError, LifecycleManager, PairingChallenge, SessionState};
use mb_store::{FileSessionStore, MemorySessionStore, SessionRecord, SessionStore, StoreError, StoreResult};
use parking_lot::Mutex;

#[derive(Default)]
struct Recorder(Mutex<Vec<PairingChallenge>>);

impl ChallengeSink for Recorder {
    fn present(&self, challenge: &PairingChallenge) {
        self.0.lock().push(challenge.clone());
    }
}

impl Recorder {
    fn count(&self) -> usize {
        self.0.lock().len()
    }
}

/// Store whose lookups or writes can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemorySessionStore,
    fail_exists: bool,
    fail_save: bool,
}

#[async_trait]
impl SessionStore for FlakyStore {
    fn backend(&self) -> &'static str {
        "flaky"
    }

    async fn exists(&self, session: &str) -> StoreResult<bool> {
        if self.fail_exists {
            return Err(StoreError::Unreachable("lookup refused".into()));
        }
        self.inner.exists(session).await
    }

    async fn save(&self, session: &str, data: &[u8]) -> StoreResult<()> {
        if self.fail_save {
            return Err(StoreError::Unreachable("write refused".into()));
        }
        self.inner.save(session, data).await
    }

    async fn load(&self, session: &str) -> StoreResult<Option<SessionRecord>> {
        self.inner.load(session).await
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        id: "default".into(),
        ..Default::default()
    }
}

async fn ready(mgr: &Arc<LifecycleManager>) -> Result<(), LifecycleError> {
    mgr.start().await?;
    tokio::time::timeout(Duration::from_secs(5), mgr.wait_ready())
        .await
        .expect("lifecycle did not settle")
}

#[tokio::test]
async fn stored_session_restores_without_challenge() {
    let store = Arc::new(MemorySessionStore::with_record("default", b"stored"));
    let client = Arc::new(ScriptedClient::new(vec![]));
    let recorder = Arc::new(Recorder::default());
    let mgr = LifecycleManager::new(&config(), store.clone(), client.clone(), recorder.clone());

    ready(&mgr).await.unwrap();

    assert_eq!(client.restores(), vec![Some(b"stored".to_vec())]);
    assert_eq!(recorder.count(), 0);
    assert_eq!(mgr.state(), SessionState::Ready);
    let rec = store.load("default").await.unwrap().unwrap();
    assert_eq!(rec.data, b"stored");
}

#[tokio::test]
async fn challenge_suppressed_while_record_exists() {
    let store = Arc::new(MemorySessionStore::with_record("default", b"stored"));
    // A slow restore: the client still asks for pairing before it resumes.
    let client = Arc::new(ScriptedClient::new(vec![]).with_script(|restore| {
        vec![
            ClientEvent::Qr { code: "late".into() },
            ClientEvent::Qr { code: "later".into() },
            ClientEvent::Authenticated {
                session_data: restore.unwrap_or_default().to_vec(),
            },
            ClientEvent::Ready,
        ]
    }));
    let recorder = Arc::new(Recorder::default());
    let mgr = LifecycleManager::new(&config(), store, client, recorder.clone());

    ready(&mgr).await.unwrap();
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn stale_record_moves_to_awaiting_pairing_without_prompt() {
    let store = Arc::new(MemorySessionStore::with_record("default", b"expired"));
    // The client rejects the stored session and falls back to pairing.
    let client = Arc::new(ScriptedClient::new(vec![]).with_script(|_| {
        vec![ClientEvent::Qr { code: "fresh".into() }]
    }));
    let recorder = Arc::new(Recorder::default());
    let mgr = LifecycleManager::new(&config(), store, client, recorder.clone());
    let mut states = mgr.subscribe();

    mgr.start().await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == SessionState::AwaitingPairing),
    )
    .await
    .expect("never reached AWAITING_PAIRING")
    .unwrap();
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn failed_lookup_still_shows_challenge() {
    let store = Arc::new(FlakyStore {
        fail_exists: true,
        ..Default::default()
    });
    let client = Arc::new(ScriptedClient::new(vec![]));
    let recorder = Arc::new(Recorder::default());
    let mgr = LifecycleManager::new(&config(), store, client, recorder.clone());

    ready(&mgr).await.unwrap();
    assert_eq!(recorder.count(), 1);
    assert_eq!(recorder.0.lock()[0].session, "default");
}

#[tokio::test]
async fn authentication_is_saved_once_before_state_change() {
    let store = Arc::new(MemorySessionStore::new());
    // Hold READY back so AUTHENTICATED can be observed.
    let client = Arc::new(ScriptedClient::new(vec![]).with_script(|_| {
        vec![
            ClientEvent::Qr { code: "pair".into() },
            ClientEvent::Authenticated {
                session_data: b"creds".to_vec(),
            },
        ]
    }));
    let recorder = Arc::new(Recorder::default());
    let mgr = LifecycleManager::new(&config(), store.clone(), client.clone(), recorder);

    let mut states = mgr.subscribe();
    mgr.start().await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == SessionState::Authenticated),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(store.save_count(), 1);

    assert!(client.emit(ClientEvent::Ready).await);
    tokio::time::timeout(Duration::from_secs(5), mgr.wait_ready())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.load("default").await.unwrap().unwrap().data, b"creds");
}

#[tokio::test]
async fn cold_start_then_restart_resumes_silently() {
    let dir = tempfile::tempdir().unwrap();

    // First run: nothing stored, operator pairs.
    {
        let store = Arc::new(FileSessionStore::open(dir.path()).await.unwrap());
        let client = Arc::new(ScriptedClient::new(vec![]));
        let recorder = Arc::new(Recorder::default());
        let mgr = LifecycleManager::new(&config(), store.clone(), client.clone(), recorder.clone());

        let mut states = mgr.subscribe();
        mgr.start().await.unwrap();
        assert_ne!(*states.borrow_and_update(), SessionState::Uninitialized);

        tokio::time::timeout(Duration::from_secs(5), mgr.wait_ready())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.restores(), vec![None]);
        assert_eq!(recorder.count(), 1);
        assert!(store.exists("default").await.unwrap());
    }

    // Second run: the record from the first run is resumed.
    let store = Arc::new(FileSessionStore::open(dir.path()).await.unwrap());
    let client = Arc::new(ScriptedClient::new(vec![]));
    let recorder = Arc::new(Recorder::default());
    let mgr = LifecycleManager::new(&config(), store, client.clone(), recorder.clone());

    mgr.start().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), mgr.wait_ready())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.restores(), vec![Some(PAIRED_SESSION.to_vec())]);
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn auth_failure_before_ready_is_fatal() {
    let store = Arc::new(MemorySessionStore::new());
    let client = Arc::new(ScriptedClient::new(vec![]).with_script(|_| {
        vec![ClientEvent::AuthFailure {
            message: "revoked".into(),
        }]
    }));
    let mgr = LifecycleManager::new(&config(), store, client, Arc::new(Recorder::default()));

    let err = ready(&mgr).await.unwrap_err();
    assert!(matches!(err, LifecycleError::ConnectionFailed(ref r) if r.contains("revoked")));
    assert!(mgr.state().is_terminal());
}

#[tokio::test]
async fn closed_stream_before_ready_is_fatal() {
    let store = Arc::new(MemorySessionStore::new());
    let client = Arc::new(ScriptedClient::new(vec![]).with_script(|_| vec![]));
    let mgr = LifecycleManager::new(&config(), store, client.clone(), Arc::new(Recorder::default()));

    mgr.start().await.unwrap();
    client.close();
    let err = tokio::time::timeout(Duration::from_secs(5), mgr.wait_ready())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ConnectionFailed(_)));
}

#[tokio::test]
async fn disconnect_after_ready_keeps_serving() {
    let store = Arc::new(MemorySessionStore::new());
    let client = Arc::new(ScriptedClient::new(vec![]));
    let mgr = LifecycleManager::new(&config(), store, client.clone(), Arc::new(Recorder::default()));
    ready(&mgr).await.unwrap();

    assert!(
        client
            .emit(ClientEvent::Disconnected {
                reason: "phone offline".into()
            })
            .await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mgr.state(), SessionState::Ready);
}

#[tokio::test]
async fn save_failure_is_not_fatal() {
    let store = Arc::new(FlakyStore {
        fail_save: true,
        ..Default::default()
    });
    let client = Arc::new(ScriptedClient::new(vec![]));
    let mgr = LifecycleManager::new(&config(), store, client, Arc::new(Recorder::default()));
    ready(&mgr).await.unwrap();
    assert!(!mgr.backup_now().await);
}

#[tokio::test]
async fn backup_loop_persists_periodically() {
    let store = Arc::new(MemorySessionStore::new());
    let client = Arc::new(ScriptedClient::new(vec![]));
    let cfg = SessionConfig {
        backup_interval_secs: 1,
        ..config()
    };
    let mgr = LifecycleManager::new(&cfg, store.clone(), client, Arc::new(Recorder::default()));
    ready(&mgr).await.unwrap();
    assert_eq!(store.save_count(), 1);

    tokio::time::timeout(Duration::from_secs(5), async {
        while store.save_count() < 2 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("backup loop never saved");
}
