//! Configuration file handling for finmate.
//!
//! The configuration file is stored at `$FINMATE_HOME/config.json` and contains the address of the
//! spending service, the session poll interval, the request timeout, and optionally where the
//! token is kept.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "finmate";
const CONFIG_VERSION: u8 = 1;
const SESSION_POLL_MS: u64 = 1000;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const SECRETS: &str = ".secrets";
const TOKEN: &str = "token";
const CONFIG_JSON: &str = "config.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FINMATE_HOME` and from there it loads `$FINMATE_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the finmate home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    base_url: Url,
}

impl Config {
    /// Creates the data directory, its `.secrets` subdirectory and an initial `config.json` that
    /// points at `base_url`, with default settings for everything else.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/finmate`
    /// - `base_url` - Where the spending service listens, e.g. `http://localhost:8080`
    ///
    /// # Errors
    /// - Returns an error if `base_url` is not a valid http(s) URL or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the finmate home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = ConfigFile {
            base_url: base_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
            base_url,
        })
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load the config file
    /// - validate that the secrets directory exists
    /// - return the loaded configuration object
    pub async fn load(finmate_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = finmate_home.into();
        if !maybe_relative.is_dir() {
            bail!(
                "The finmate home directory is missing '{}', run 'finmate init' first",
                maybe_relative.display()
            )
        }
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let base_url = parse_base_url(&config_file.base_url)
            .with_context(|| format!("Bad base_url in {}", config_path.display()))?;

        let config = Self {
            root: root.clone(),
            secrets: root.join(SECRETS),
            config_path,
            config_file,
            base_url,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    /// The service address. Always ends in `/` so endpoint paths can be joined onto it.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session_poll_interval(&self) -> Duration {
        Duration::from_millis(self.config_file.session_poll_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.request_timeout_secs)
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        let p = self.config_file.token_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Parses `s` as the service address and makes sure its path ends in `/`. Without the trailing
/// slash, `Url::join` would replace the last path segment instead of appending to it.
fn parse_base_url(s: &str) -> Result<Url> {
    let mut url = Url::parse(s.trim()).with_context(|| format!("Invalid base URL '{s}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("The base URL must use http or https, got '{}'", url.scheme())
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "finmate",
///   "config_version": 1,
///   "base_url": "http://localhost:8080/",
///   "session_poll_ms": 1000,
///   "request_timeout_secs": 30,
///   "token_path": ".secrets/token"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "finmate"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Address of the spending service
    base_url: String,

    /// How often, in milliseconds, the token file is checked for changes made by other processes
    #[serde(default = "default_session_poll_ms")]
    session_poll_ms: u64,

    /// How long, in seconds, a single request to the service may take
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,

    /// Path to the token file (optional, relative to the home directory or absolute)
    /// Defaults to $FINMATE_HOME/.secrets/token if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

fn default_session_poll_ms() -> u64 {
    SESSION_POLL_MS
}

fn default_request_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            base_url: String::new(),
            session_poll_ms: SESSION_POLL_MS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            token_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version == CONFIG_VERSION,
            "Unsupported config_version in config file: expected {}, got {}",
            CONFIG_VERSION,
            config.config_version
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// Gets the token path.
    ///
    /// If the path is relative, it should be interpreted as relative to the home directory.
    /// If None, defaults to $FINMATE_HOME/.secrets/token
    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN))
    }
}
