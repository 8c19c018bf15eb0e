//! Resolver configuration
//!
//! A resolver run is configured by an optional TOML file, selected with
//! `--config <path>` or the `CONSTELLATION_CONFIG` environment variable. A
//! missing selection means defaults; a selected file that does not exist is an
//! error. Command-line flags override values from the file.
//!
//! ```toml
//! # Worker-pool bound for scanning and materialization
//! max_parallel = 16
//!
//! # Abort the run after this many seconds
//! read_timeout_secs = 30
//!
//! # Attempts for transient read failures
//! read_retries = 3
//!
//! # Repository-wide default variables, overridden by constellation and
//! # cluster variables. Empty by default.
//! [defaults]
//! region = "eu-west-1"
//! ```

mod parser;

pub use parser::{parse_config, parse_config_str};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{CONFIG_ENV_VAR, DEFAULT_READ_RETRIES, default_max_parallel};
use crate::core::ResolverError;
use crate::variables::VariableScope;

fn default_read_retries() -> usize {
    DEFAULT_READ_RETRIES
}

/// Settings for a resolver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Upper bound on concurrently running scan and materialization jobs.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Overall run deadline in seconds. Expiry cancels the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,

    /// Total attempts for a read that fails with a transient I/O error.
    #[serde(default = "default_read_retries")]
    pub read_retries: usize,

    /// Repository-wide default variables, the outermost scope level.
    #[serde(default, skip_serializing_if = "VariableScope::is_empty")]
    pub defaults: VariableScope,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            read_timeout_secs: None,
            read_retries: DEFAULT_READ_RETRIES,
            defaults: VariableScope::default(),
        }
    }
}

impl ResolverConfig {
    /// Load from an explicit path, else from `CONSTELLATION_CONFIG`, else defaults.
    ///
    /// # Errors
    ///
    /// Fails if the selected file is missing, unparsable or holds invalid values.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let selected = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        let config = match selected {
            Some(path) => {
                if !path.exists() {
                    return Err(ResolverError::ConfigError {
                        message: format!("configuration file {} does not exist", path.display()),
                    }
                    .into());
                }
                tracing::debug!("Loading resolver configuration from {}", path.display());
                parse_config::<Self>(&path).await?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or misconfigure a run.
    pub fn validate(&self) -> Result<(), ResolverError> {
        if self.max_parallel == 0 {
            return Err(ResolverError::ConfigError {
                message: "max_parallel must be at least 1".to_string(),
            });
        }
        if self.read_retries == 0 {
            return Err(ResolverError::ConfigError {
                message: "read_retries must be at least 1".to_string(),
            });
        }
        if let Some(name) = self.defaults.names().find(|n| !crate::interpolation::is_identifier(n))
        {
            return Err(ResolverError::ConfigError {
                message: format!(
                    "default variable '{name}' is not a valid identifier ([A-Za-z0-9_]+)"
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: Option<usize>) -> Self {
        if let Some(value) = max_parallel {
            self.max_parallel = value;
        }
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, timeout: Option<u64>) -> Self {
        if timeout.is_some() {
            self.read_timeout_secs = timeout;
        }
        self
    }

    /// The run deadline as a [`Duration`], if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}
