//! Shared plumbing for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

use crate::config::ResolverConfig;
use crate::core::{Diagnostics, ResolverError, RunSignal};
use crate::resolver::Resolver;

/// Overrides collected from global flags.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// `--max-parallel`
    pub max_parallel: Option<usize>,
    /// `--timeout` in seconds
    pub timeout: Option<u64>,
}

impl GlobalOptions {
    /// Load the configuration file and apply flag overrides.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid configuration.
    pub async fn load_config(&self) -> Result<ResolverConfig> {
        let config = ResolverConfig::load(self.config.as_deref())
            .await?
            .with_max_parallel(self.max_parallel)
            .with_timeout_secs(self.timeout);
        config.validate()?;
        Ok(config)
    }
}

/// A resolver plus the signal of the current run.
///
/// Ctrl-C cancels the run for as long as the context is alive.
pub struct RunContext {
    pub resolver: Resolver,
    pub signal: RunSignal,
    interrupt: JoinHandle<()>,
}

impl RunContext {
    /// Build the resolver and arm the interrupt handler.
    ///
    /// # Errors
    ///
    /// Configuration problems.
    pub async fn prepare(options: &GlobalOptions) -> Result<Self> {
        let resolver = Resolver::new(options.load_config().await?);
        let (handle, signal) = resolver.signal();

        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling run");
                handle.cancel();
            }
        });

        Ok(Self {
            resolver,
            signal,
            interrupt,
        })
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        self.interrupt.abort();
    }
}

/// Print diagnostics to stderr, one per line, and turn them into an error.
///
/// Returns `Ok(())` when there is nothing to report.
///
/// # Errors
///
/// [`ResolverError::ValidationFailed`] when `diagnostics` is not empty.
pub fn report_diagnostics(diagnostics: &Diagnostics) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
    Err(ResolverError::ValidationFailed {
        count: diagnostics.len(),
    }
    .into())
}

/// Write `content` to `output`, or to stdout when `output` is `None` or `-`.
///
/// # Errors
///
/// The file could not be written.
pub async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) if path != Path::new("-") => {
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        _ => print!("{content}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Diagnostic, exit_code_for};
    use tempfile::TempDir;

    #[test]
    fn test_empty_diagnostics_are_ok() {
        assert!(report_diagnostics(&Diagnostics::new()).is_ok());
    }

    #[test]
    fn test_diagnostics_become_validation_failure() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::structure("a/cluster.yaml", "a", "required file is missing"));
        let error = report_diagnostics(&diagnostics).unwrap_err();
        assert_eq!(exit_code_for(&error), 2);
    }

    #[tokio::test]
    async fn test_write_output_to_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.json");
        write_output(Some(&path), "[]\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[tokio::test]
    async fn test_overrides_apply() {
        let options = GlobalOptions {
            config: None,
            max_parallel: Some(2),
            timeout: Some(5),
        };
        // the env var may point at a real file in some shells; only run on defaults
        if std::env::var_os(crate::constants::CONFIG_ENV_VAR).is_none() {
            let config = options.load_config().await.unwrap();
            assert_eq!(config.max_parallel, 2);
            assert_eq!(config.read_timeout_secs, Some(5));
        }
    }

    #[tokio::test]
    async fn test_zero_parallelism_rejected() {
        let options = GlobalOptions {
            config: None,
            max_parallel: Some(0),
            timeout: None,
        };
        if std::env::var_os(crate::constants::CONFIG_ENV_VAR).is_none() {
            assert!(options.load_config().await.is_err());
        }
    }
}
