//! Session hub
//!
//! One holder of the current session per process. It is started explicitly
//! with [`SessionHub::init`], observed through read-only `watch` receivers,
//! and stopped with [`SessionHub::teardown`]. Only the login flows in this
//! crate publish new states.

use serde::{Deserialize, Serialize};
use shared::models::Session;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

/// JSON file holding the persisted session
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(base_path: impl Into<PathBuf>, filename: &str) -> Self {
        Self {
            path: base_path.into().join(filename),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, session: &Session) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)
    }

    /// Load the stored session; unreadable files count as absent
    pub fn load(&self) -> Option<Session> {
        let json = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&json).ok()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn delete(&self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct HubInner {
    sender: Mutex<Option<watch::Sender<SessionState>>>,
    receiver: watch::Receiver<SessionState>,
    storage: Option<SessionStorage>,
}

/// Process-wide session state holder; clones share the same state
#[derive(Clone)]
pub struct SessionHub {
    inner: Arc<HubInner>,
}

impl SessionHub {
    pub fn new(storage: Option<SessionStorage>) -> Self {
        let (sender, receiver) = watch::channel(SessionState {
            event: SessionEvent::InitialSession,
            session: None,
        });
        Self {
            inner: Arc::new(HubInner {
                sender: Mutex::new(Some(sender)),
                receiver,
                storage,
            }),
        }
    }

    /// Restore a persisted session and publish `InitialSession`
    pub fn init(&self) -> SessionState {
        let restored = self.inner.storage.as_ref().and_then(|storage| {
            let session = storage.load()?;
            if session.is_expired() {
                tracing::info!("discarding expired persisted session");
                if let Err(e) = storage.delete() {
                    tracing::warn!(error = %e, "failed to delete expired session");
                }
                return None;
            }
            Some(session)
        });

        if let Some(session) = &restored {
            tracing::info!(account_id = %session.account_id, "session restored");
        }
        let state = SessionState {
            event: SessionEvent::InitialSession,
            session: restored,
        };
        self.publish(state.clone());
        state
    }

    /// Read-only subscription to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.receiver.clone()
    }

    pub fn current(&self) -> SessionState {
        self.inner.receiver.borrow().clone()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.inner.receiver.borrow().session.clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.lock_sender().is_none()
    }

    pub(crate) fn set_signed_in(&self, session: Session) {
        self.persist(Some(&session));
        self.publish(SessionState {
            event: SessionEvent::SignedIn,
            session: Some(session),
        });
    }

    pub(crate) fn set_refreshed(&self, session: Session) {
        self.persist(Some(&session));
        self.publish(SessionState {
            event: SessionEvent::TokenRefreshed,
            session: Some(session),
        });
    }

    pub(crate) fn clear(&self) {
        self.persist(None);
        self.publish(SessionState {
            event: SessionEvent::SignedOut,
            session: None,
        });
    }

    /// Stop publishing; subscribers observe the channel closing
    pub fn teardown(&self) {
        if self.lock_sender().take().is_some() {
            tracing::debug!("session hub torn down");
        }
    }

    fn lock_sender(&self) -> MutexGuard<'_, Option<watch::Sender<SessionState>>> {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: SessionState) {
        match self.lock_sender().as_ref() {
            Some(sender) => {
                sender.send_replace(state);
            }
            None => tracing::debug!(event = ?state.event, "session hub closed, update dropped"),
        }
    }

    fn persist(&self, session: Option<&Session>) {
        if self.is_torn_down() {
            return;
        }
        let Some(storage) = &self.inner.storage else {
            return;
        };
        let result = match session {
            Some(session) => storage.save(session),
            None => storage.delete(),
        };
        if let Err(e) = result {
            tracing::warn!(path = %storage.path().display(), error = %e, "failed to persist session");
        }
    }
}

impl std::fmt::Debug for SessionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHub")
            .field("current", &self.current().event)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
