//! Account command handlers.
//!
//! This module implements the CLI commands for:
//! - `finmate signup` - Register a new account
//! - `finmate signin` - Exchange a username and password for a token and store it
//! - `finmate logout` - Forget the stored token
//! - `finmate status` - Report whether a token is stored

use crate::api::{Credentials, Registration, Remote};
use crate::commands::{open_session, Out};
use crate::session::{Route, SessionState};
use crate::{Config, Result};
use anyhow::Context;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use tracing::debug;

/// Returns `given`, or asks for the password if it is `None`. With `confirm`, the password has to
/// be typed twice.
pub fn password_or_prompt(given: Option<&str>, confirm: bool) -> Result<String> {
    if let Some(password) = given {
        return Ok(password.to_string());
    }
    let theme = ColorfulTheme::default();
    let mut prompt = Password::with_theme(&theme);
    prompt = prompt.with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Repeat password", "The passwords do not match");
    }
    prompt
        .interact()
        .context("Unable to read the password, pass --password instead")
}

/// Registers a new account. Does not sign in; the user is sent to the login route afterwards.
pub async fn signup(remote: &Remote, registration: Registration) -> Result<Out<Route>> {
    debug!("Registering {registration:?}");
    remote
        .auth()
        .sign_up(&registration)
        .await
        .context("Unable to create the account")?;
    Ok(Out::new(
        format!(
            "Created the account '{}', run 'finmate signin' to sign in",
            registration.username()
        ),
        Route::Login,
    ))
}

/// Signs in and stores the token in the home directory.
pub async fn signin(
    config: &Config,
    remote: &Remote,
    credentials: Credentials,
) -> Result<Out<Route>> {
    let token = remote
        .auth()
        .sign_in(&credentials)
        .await
        .context("Unable to sign in, check your username and password")?;
    let session = open_session(config).await?;
    let route = session.sign_in(&token).await?;
    Ok(Out::new(
        format!("Signed in as '{}'", credentials.username()),
        route,
    ))
}

/// Removes the stored token. Succeeds when nobody is signed in.
pub async fn logout(config: &Config) -> Result<Out<Route>> {
    let session = open_session(config).await?;
    let was = session.state();
    let route = session.logout().await?;
    let message = match was {
        SessionState::Present => "Signed out",
        SessionState::Absent => "Already signed out",
    };
    Ok(Out::new(message, route))
}

/// Reports whether a token is stored. The token is not checked against the service.
pub async fn status(config: &Config) -> Result<Out<SessionState>> {
    let session = open_session(config).await?;
    let state = session.check_auth().await?;
    let message = match state {
        SessionState::Present => "Signed in",
        SessionState::Absent => "Not signed in, run 'finmate signin' to sign in",
    };
    Ok(Out::new(message, state))
}
