//! Tracks whether the user is signed in.
//!
//! A `Session` owns a `CredentialStore` and publishes `SessionState` changes over a
//! `tokio::sync::watch` channel. Writes made through the session are published immediately.
//! Writes made by another process (e.g. `finmate logout` in a second terminal while `finmate watch`
//! runs) are picked up by a `SessionWatcher`, which re-reads the store on a timer.

use crate::api::Token;
use crate::{utils, Result};
use anyhow::Context;
use serde::Serialize;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

/// Whether a credential is currently stored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Absent,
    Present,
}

serde_plain::derive_display_from_serialize!(SessionState);

impl SessionState {
    pub fn is_present(self) -> bool {
        self == SessionState::Present
    }
}

/// A navigation request handed back to the caller, which decides what showing it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    #[serde(rename = "/login")]
    Login,
    #[serde(rename = "/dashboard")]
    Dashboard,
}

serde_plain::derive_display_from_serialize!(Route);

/// Where the credential lives between runs.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync + Debug {
    /// Returns the stored token, or `None` if there is none.
    async fn load(&self) -> Result<Option<Token>>;

    /// Replaces the stored token.
    async fn save(&self, token: &Token) -> Result<()>;

    /// Removes the stored token. Removing a token that is not there succeeds.
    async fn clear(&self) -> Result<()>;
}

/// Keeps the token in a file that only the current user can read.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Token>> {
        let Some(contents) = utils::read_if_exists(&self.path).await? else {
            return Ok(None);
        };
        let token = Token::new(contents.trim());
        Ok((!token.is_empty()).then_some(token))
    }

    async fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            utils::make_dir(parent).await?;
        }
        utils::write_private(&self.path, token.as_str())
            .await
            .context("Unable to save the token")
    }

    async fn clear(&self) -> Result<()> {
        utils::remove_if_exists(&self.path)
            .await
            .context("Unable to remove the token")
    }
}

/// Keeps the token in memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<Token>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<Token>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Token>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save(&self, token: &Token) -> Result<()> {
        *self.token.lock().await = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}

/// The signed-in state of the user, shared by everything that needs to observe or change it.
/// Clones refer to the same session.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// Creates a session over `store` and reads it once.
    pub async fn open(store: Arc<dyn CredentialStore>) -> Result<Self> {
        let (state, _) = watch::channel(SessionState::Absent);
        let session = Self {
            inner: Arc::new(Inner { store, state }),
        };
        session.check_auth().await?;
        Ok(session)
    }

    /// The last published state. Does not touch the store.
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Re-reads the store and publishes the result if it changed.
    pub async fn check_auth(&self) -> Result<SessionState> {
        let state = match self.inner.store.load().await? {
            Some(_) => SessionState::Present,
            None => SessionState::Absent,
        };
        self.publish(state);
        Ok(state)
    }

    /// The stored token, if any.
    pub async fn credential(&self) -> Result<Option<Token>> {
        self.inner.store.load().await
    }

    /// Stores `token` and publishes `Present`.
    pub async fn sign_in(&self, token: &Token) -> Result<Route> {
        self.inner.store.save(token).await?;
        self.publish(SessionState::Present);
        Ok(Route::Dashboard)
    }

    /// Removes the credential and publishes `Absent`. Logging out when already logged out
    /// succeeds and asks for the same route.
    pub async fn logout(&self) -> Result<Route> {
        self.inner.store.clear().await?;
        self.publish(SessionState::Absent);
        Ok(Route::Login)
    }

    /// A receiver that observes every change of state from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    fn publish(&self, state: SessionState) {
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            debug!("Session is now {state}");
        }
    }
}

/// Re-checks the credential store on a fixed interval until dropped.
#[derive(Debug)]
pub struct SessionWatcher {
    handle: JoinHandle<()>,
}

impl SessionWatcher {
    /// Starts watching. Must be called from within a tokio runtime.
    pub fn spawn(session: Session, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                trace!("Checking the credential store");
                if let Err(e) = session.check_auth().await {
                    warn!("Unable to check the credential store: {e:#}");
                }
            }
        });
        Self { handle }
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
