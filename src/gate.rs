//! Decides which top-level view to show.
//!
//! `ViewState::next` is the state machine, kept free of I/O. `ViewGate` drives it: it watches the
//! `Session`, issues the fetch when a credential appears, and owns the `TransactionCache` the
//! dashboard renders from.

use crate::api::{Repository, Token};
use crate::cache::{Confirmation, TransactionCache};
use crate::error::{ApiError, MutationError};
use crate::model::{Transaction, TransactionDraft, TransactionId};
use crate::session::{Route, Session, SessionWatcher};
use crate::Result;
use anyhow::anyhow;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The message for operations that need a credential when there is none.
pub const NOT_SIGNED_IN: &str = "You are not signed in, run 'finmate signin' first";

/// What the user should be looking at.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ViewState {
    /// Nobody is signed in. Show the landing view.
    #[default]
    Anonymous,
    /// Signed in, but the transactions have not been fetched. `error` holds the reason the last
    /// fetch failed, if it did.
    Loading {
        #[serde(skip_serializing_if = "Option::is_none", serialize_with = "error_message")]
        error: Option<ApiError>,
    },
    /// Signed in with the transactions fetched. Show the dashboard.
    Ready,
}

/// Something that happened which may move the gate to another state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    CredentialPresent,
    CredentialAbsent,
    FetchSucceeded,
    FetchFailed(ApiError),
    LoggedOut,
}

impl ViewState {
    /// Returns the state that follows `self` when `event` happens.
    ///
    /// A fetch result that arrives while anonymous is stale and ignored. A rejected credential
    /// sends the gate back to anonymous. Any other failure keeps the gate loading with the error
    /// attached; nothing here retries.
    pub fn next(&self, event: GateEvent) -> ViewState {
        use GateEvent::*;
        use ViewState::*;

        match (self, event) {
            (_, CredentialAbsent | LoggedOut) => Anonymous,
            (Anonymous, CredentialPresent) => Loading { error: None },
            (Anonymous, FetchSucceeded | FetchFailed(_)) => Anonymous,
            (current, CredentialPresent) => current.clone(),
            (_, FetchSucceeded) => Ready,
            (_, FetchFailed(ApiError::Unauthorized)) => Anonymous,
            (_, FetchFailed(e)) => Loading { error: Some(e) },
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, ViewState::Anonymous)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready)
    }

    /// The error from the last failed fetch, if the gate is stuck loading because of one.
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ViewState::Loading { error } => error.as_ref(),
            _ => None,
        }
    }
}

fn error_message<S>(error: &Option<ApiError>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Runs the `ViewState` machine against a live session and repository.
pub struct ViewGate {
    session: Session,
    cache: TransactionCache,
    state: ViewState,
}

impl ViewGate {
    pub fn new(session: Session, repository: Arc<dyn Repository>) -> Self {
        Self {
            session,
            cache: TransactionCache::new(repository),
            state: ViewState::Anonymous,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &TransactionCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TransactionCache {
        &mut self.cache
    }

    /// Brings the gate in line with the session, fetching once if a credential has just appeared.
    pub async fn evaluate(&mut self) -> Result<&ViewState> {
        if self.observe_session() {
            self.fetch().await?;
        }
        Ok(&self.state)
    }

    /// Fetches again on request, e.g. after a failed fetch. Does nothing while anonymous.
    pub async fn refresh(&mut self) -> Result<&ViewState> {
        if !self.state.is_anonymous() {
            self.fetch().await?;
        }
        Ok(&self.state)
    }

    /// Records a new transaction through the cache, which resyncs afterwards.
    pub async fn create(&mut self, draft: &TransactionDraft) -> Result<Transaction> {
        let token = self.token().await?;
        let result = self.cache.create(&token, draft).await;
        self.settle(result).await
    }

    /// Deletes a transaction through the cache, which resyncs afterwards.
    pub async fn delete(&mut self, id: &TransactionId, confirmation: Confirmation) -> Result<()> {
        let token = self.token().await?;
        let result = self.cache.delete(&token, id, confirmation).await;
        self.settle(result).await
    }

    /// Logs the user out and returns the route to show next.
    pub async fn logout(&mut self) -> Result<Route> {
        let route = self.session.logout().await?;
        self.apply(GateEvent::LoggedOut);
        Ok(route)
    }

    /// Follows the session until `shutdown` resolves, calling `render` whenever the state changes
    /// (and once at the start). Changes made by other processes are noticed every `poll`.
    pub async fn run<F, R>(&mut self, poll: Duration, shutdown: F, mut render: R) -> Result<()>
    where
        F: Future<Output = ()>,
        R: FnMut(&ViewState, &mut TransactionCache),
    {
        let mut changes = self.session.subscribe();
        let _watcher = SessionWatcher::spawn(self.session.clone(), poll);
        tokio::pin!(shutdown);

        let initial = self.state.clone();
        self.step(&mut render).await;
        if self.state == initial {
            render(&self.state, &mut self.cache);
        }
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Shutting down the view gate");
                    break;
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    changes.borrow_and_update();
                    self.step(&mut render).await;
                }
            }
        }
        Ok(())
    }

    async fn step<R>(&mut self, render: &mut R)
    where
        R: FnMut(&ViewState, &mut TransactionCache),
    {
        let before = self.state.clone();
        let fetch = self.observe_session();
        if self.state != before {
            render(&self.state, &mut self.cache);
        }
        if fetch {
            let loading = self.state.clone();
            if let Err(e) = self.fetch().await {
                warn!("{e:#}");
            }
            if self.state != loading {
                render(&self.state, &mut self.cache);
            }
        }
    }

    /// Applies the published session state. Returns true if a fetch should follow.
    fn observe_session(&mut self) -> bool {
        let event = if self.session.state().is_present() {
            GateEvent::CredentialPresent
        } else {
            GateEvent::CredentialAbsent
        };
        let was_anonymous = self.state.is_anonymous();
        self.apply(event);
        was_anonymous && !self.state.is_anonymous()
    }

    async fn fetch(&mut self) -> Result<()> {
        let Some(token) = self.session.credential().await? else {
            self.apply(GateEvent::CredentialAbsent);
            return Ok(());
        };
        match self.cache.resync(&token).await {
            Ok(()) => self.apply(GateEvent::FetchSucceeded),
            Err(e) if e.is_unauthorized() => {
                info!("The service rejected the stored credential, signing out");
                self.session.logout().await?;
                self.apply(GateEvent::FetchFailed(e));
            }
            Err(e) => {
                warn!("Unable to fetch transactions: {e}");
                self.apply(GateEvent::FetchFailed(e));
            }
        }
        Ok(())
    }

    async fn token(&mut self) -> Result<Token> {
        match self.session.credential().await? {
            Some(token) => Ok(token),
            None => {
                self.apply(GateEvent::CredentialAbsent);
                Err(anyhow!(NOT_SIGNED_IN))
            }
        }
    }

    /// Passes `result` through and moves the gate on. The listing that follows a successful
    /// change counts as a fetch, so it can settle a loading gate or unsettle a ready one. A
    /// rejected credential at either step signs the user out.
    async fn settle<T>(&mut self, result: std::result::Result<T, MutationError>) -> Result<T> {
        let error = match result {
            Ok(value) => {
                self.apply(GateEvent::FetchSucceeded);
                return Ok(value);
            }
            Err(e) => e,
        };
        let api_error = error.api_error().clone();
        if api_error.is_unauthorized() {
            info!("The service rejected the stored credential, signing out");
            self.session.logout().await?;
            self.apply(GateEvent::FetchFailed(api_error.clone()));
        } else if let MutationError::Resync(_) = error {
            warn!("Unable to reload transactions after a change: {api_error}");
            self.apply(GateEvent::FetchFailed(api_error.clone()));
        }
        Err(match error {
            MutationError::Rejected(e) => e.into(),
            MutationError::Resync(e) => anyhow::Error::from(e)
                .context("The change was saved but your transactions could not be reloaded"),
        })
    }

    fn apply(&mut self, event: GateEvent) {
        let next = self.state.next(event);
        if next == self.state {
            return;
        }
        debug!("View state {:?} -> {:?}", self.state, next);
        if next.is_anonymous() {
            self.cache.clear();
        }
        self.state = next;
    }
}
