use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its `.secrets` subdirectory and an initial `config.json` that
/// points at `base_url`.
///
/// # Arguments
/// - `finmate_home` - The directory that will be the root of data directory, e.g. `$HOME/finmate`
/// - `base_url` - Where the spending service listens, e.g. `http://localhost:8080`
///
/// # Errors
/// - Returns an error if the URL is invalid or any file operations fail.
pub async fn init(finmate_home: &Path, base_url: &str) -> Result<Out<()>> {
    let config = Config::create(finmate_home, base_url)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Successfully created the finmate directory at {} for {}",
        config.root().display(),
        config.base_url()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("finmate");
        let out = init(&home, "http://localhost:8080").await.unwrap();
        assert!(out.message().contains("http://localhost:8080/"));
        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.base_url().as_str(), "http://localhost:8080/");
    }

    #[tokio::test]
    async fn test_init_bad_url() {
        let dir = TempDir::new().unwrap();
        let result = init(dir.path(), "localhost").await;
        assert!(result.is_err());
    }
}
