//! Command-line interface for the constellation resolver.
//!
//! # Available Commands
//!
//! - `resolve` - run the full pipeline and emit every resolved application
//! - `validate` - structural and static referential checks, no interpolation
//! - `vars` - show one cluster's merged variables and where each came from
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only
//! - `--config` / `-c` - resolver configuration file (also `CONSTELLATION_CONFIG`)
//! - `--max-parallel` - worker-pool bound, overrides the configuration file
//! - `--timeout` - run deadline in seconds, overrides the configuration file
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | success |
//! | 1 | I/O, configuration or cancellation failure |
//! | 2 | the repository has validation errors |
//!
//! # Examples
//!
//! ```bash
//! constellation resolve --root ./gitops --format yaml
//! constellation resolve --root ./gitops --cluster cluster1 --output out.json
//! constellation validate --root ./gitops --format json
//! constellation vars --root ./gitops --cluster cluster1
//! ```

pub mod common;
mod resolve;
pub mod validate;
mod vars;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::constants::CONFIG_ENV_VAR;
pub use common::GlobalOptions;

/// Settings derived from global flags before any command runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,

    /// Overrides applied on top of the configuration file.
    pub options: GlobalOptions,
}

impl CliConfig {
    /// Install the tracing subscriber.
    ///
    /// `RUST_LOG` wins over the flag-derived level. Logs go to stderr so they
    /// never mix with records written to stdout. Calling this twice is harmless.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.as_str()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "constellation",
    about = "Resolve a GitOps constellation repository into fully-interpolated applications",
    version,
    long_about = "Scans templates, constellations, clusters and applications, merges variable \
                  scopes and interpolates {{ variables.<name> }} tokens into one resolved \
                  application record per cluster and application."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    ///
    /// Equivalent to `RUST_LOG=debug`. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a resolver configuration file (TOML).
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum number of concurrent scan and materialization jobs.
    #[arg(long, global = true, value_name = "N", value_parser = clap::value_parser!(usize))]
    max_parallel: Option<usize>,

    /// Abort the run after this many seconds.
    #[arg(long, global = true, value_name = "SECONDS")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every application on every cluster.
    ///
    /// Runs scan, hierarchy build, scope merge, interpolation and
    /// materialization. Records are written only when the whole repository is
    /// free of errors.
    Resolve(resolve::ResolveCommand),

    /// Check the repository without interpolating.
    ///
    /// Reports structural problems (missing or unparsable files, constellation
    /// back-references, duplicate identifiers), unknown templates, shared/local
    /// name collisions and malformed tokens.
    Validate(validate::ValidateCommand),

    /// Show a cluster's merged variable scope.
    Vars(vars::VarsCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; `main` turns it into an exit code.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            options: GlobalOptions {
                config: self.config.clone(),
                max_parallel: self.max_parallel,
                timeout: self.timeout,
            },
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Resolve(cmd) => cmd.execute(&config.options).await,
            Commands::Validate(cmd) => cmd.execute(&config.options).await,
            Commands::Vars(cmd) => cmd.execute(&config.options).await,
        }
    }
}
