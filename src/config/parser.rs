//! Generic TOML parsing with file path context.
//!
//! ```rust,no_run
//! use constellation_resolver::config::parse_config;
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     max_parallel: usize,
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings: Settings = parse_config(Path::new("resolver.toml")).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::Path;

/// Read and deserialize a TOML file.
///
/// # Errors
///
/// Fails when the file cannot be read or does not deserialize into `T`; the
/// error chain names the file.
pub async fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Deserialize TOML text.
pub fn parse_config_str<T>(content: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    Ok(toml::from_str(content)?)
}
