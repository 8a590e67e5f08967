//! Command handlers for the finmate CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod add;
mod auth;
mod dashboard;
mod delete;
mod init;
mod list;
mod watch;

use crate::api::Remote;
use crate::error::ApiError;
use crate::gate::{ViewGate, ViewState, NOT_SIGNED_IN};
use crate::session::{FileCredentialStore, Session};
use crate::{Config, Result};
use anyhow::{anyhow, bail};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

pub use add::add;
pub use auth::{logout, password_or_prompt, signin, signup, status};
pub use dashboard::{dashboard, render_summary, Dashboard, LANDING};
pub use delete::{confirm_delete, delete};
pub use init::init;
pub use list::list;
pub use watch::watch;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Opens the session whose token lives under the finmate home directory.
pub(crate) async fn open_session(config: &Config) -> Result<Session> {
    let store = FileCredentialStore::new(config.token_path());
    Session::open(Arc::new(store)).await
}

/// Brings up a `ViewGate` and fails unless it reaches `Ready`.
pub(crate) async fn ready_gate(config: &Config, remote: &Remote) -> Result<ViewGate> {
    let session = open_session(config).await?;
    let mut gate = ViewGate::new(session, remote.repository());
    let state = gate.evaluate().await?.clone();
    match state {
        ViewState::Ready => Ok(gate),
        ViewState::Anonymous => bail!(NOT_SIGNED_IN),
        ViewState::Loading { error } => Err(fetch_error(error)),
    }
}

pub(crate) fn fetch_error(error: Option<ApiError>) -> anyhow::Error {
    match error {
        Some(e) => anyhow::Error::from(e).context("Unable to fetch your transactions"),
        None => anyhow!("Your transactions have not been fetched yet"),
    }
}
