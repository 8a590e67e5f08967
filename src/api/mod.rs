//! The boundary with the remote spending service.
//!
//! `Repository` covers the transaction endpoints and `AuthApi` the account endpoints. Both are
//! implemented by `HttpRemote`, which talks to the real service, and by `TestRemote`, which keeps
//! everything in memory so the whole program can run top-to-bottom without a server.

mod http;
mod test_remote;

use crate::error::ApiResult;
use crate::model::{Transaction, TransactionDraft, TransactionId};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::debug;

pub(crate) use http::HttpRemote;
pub use test_remote::{TestRemote, DEMO_PASSWORD, DEMO_USERNAME};

/// When set and non-empty, the program talks to an in-memory `TestRemote` instead of the service.
pub const TEST_MODE_ENV: &str = "FINMATE_IN_TEST_MODE";

/// The opaque credential the service hands out on sign in. Its `Debug` output is redacted so it
/// never ends up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(***)")
    }
}

/// The body of a sign up request.
#[derive(Clone, Serialize)]
pub struct Registration {
    username: String,
    email: String,
    password: String,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Registration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// The body of a sign in request.
#[derive(Clone, Serialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// The transaction endpoints of the service. Implementations make exactly one attempt per call
/// and report the failure as-is.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// Fetches every transaction of the signed-in user, in the order they were added.
    async fn list(&self, token: &Token) -> ApiResult<Vec<Transaction>>;

    /// Persists `draft` and returns it with the identifier the service assigned.
    async fn create(&self, token: &Token, draft: &TransactionDraft) -> ApiResult<Transaction>;

    /// Removes the transaction `id`. Fails with `NotFound` if it does not exist.
    async fn delete(&self, token: &Token, id: &TransactionId) -> ApiResult<()>;
}

/// The account endpoints of the service.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Registers a new account. The service rejects taken usernames and emails with a message
    /// that is returned in `ApiError::Validation`.
    async fn sign_up(&self, registration: &Registration) -> ApiResult<()>;

    /// Exchanges a username and password for a token.
    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<Token>;
}

/// Which implementation of the service to talk to.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    /// The real service at the configured base URL.
    #[default]
    Http,
    /// An in-memory service seeded with a demo account.
    Test,
}

impl Mode {
    /// Returns `Mode::Test` when `FINMATE_IN_TEST_MODE` is set to a non-empty value.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Handles to both halves of the service, sharing one underlying connection.
#[derive(Clone)]
pub struct Remote {
    repository: Arc<dyn Repository>,
    auth: Arc<dyn AuthApi>,
}

impl Remote {
    pub fn new(repository: Arc<dyn Repository>, auth: Arc<dyn AuthApi>) -> Self {
        Self { repository, auth }
    }

    pub fn repository(&self) -> Arc<dyn Repository> {
        self.repository.clone()
    }

    pub fn auth(&self) -> &dyn AuthApi {
        self.auth.as_ref()
    }
}

impl From<TestRemote> for Remote {
    fn from(remote: TestRemote) -> Self {
        Remote::new(Arc::new(remote.clone()), Arc::new(remote))
    }
}

/// Creates the `Remote` selected by `mode`.
pub fn connect(config: &Config, mode: Mode) -> Result<Remote> {
    match mode {
        Mode::Http => {
            debug!("Connecting to {}", config.base_url());
            let remote = HttpRemote::new(config.base_url().clone(), config.request_timeout())?;
            Ok(Remote::new(Arc::new(remote.clone()), Arc::new(remote)))
        }
        Mode::Test => {
            debug!("Using the in-memory test service");
            Ok(TestRemote::seeded()?.into())
        }
    }
}
