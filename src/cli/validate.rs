//! `constellation validate`
//!
//! Runs the scanner, the hierarchy builder and the static checks. Nothing is
//! interpolated, so unresolved variables are only found by `resolve`.
//!
//! With `--format json` a report is printed to stdout whether or not the
//! repository is valid:
//!
//! ```json
//! {
//!   "valid": false,
//!   "error_count": 1,
//!   "counts": { "ReferenceError": 1 },
//!   "errors": [
//!     {
//!       "file": "environments/constellations/standalone-clusters/edge/cluster.yaml",
//!       "subject": "edge",
//!       "kind": "ReferenceError",
//!       "message": "cluster declares non-existent constellation 'c9' but resides under standalone-clusters"
//!     }
//!   ]
//! }
//! ```

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::common::{GlobalOptions, RunContext, report_diagnostics};
use crate::core::{Diagnostic, Diagnostics, ResolverError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per problem on stderr
    #[default]
    Text,
    /// JSON report on stdout
    Json,
}

#[derive(Args)]
pub struct ValidateCommand {
    /// Repository root
    #[arg(long, default_value = ".", value_name = "PATH")]
    pub root: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Machine-readable validation outcome.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub error_count: usize,
    /// Problems per kind
    pub counts: BTreeMap<String, usize>,
    pub errors: Vec<Diagnostic>,
}

impl From<&Diagnostics> for ValidationReport {
    fn from(diagnostics: &Diagnostics) -> Self {
        let mut counts = BTreeMap::new();
        for diagnostic in diagnostics {
            *counts.entry(diagnostic.kind.to_string()).or_insert(0) += 1;
        }
        Self {
            valid: diagnostics.is_empty(),
            error_count: diagnostics.len(),
            counts,
            errors: diagnostics.iter().cloned().collect(),
        }
    }
}

impl ValidateCommand {
    pub async fn execute(self, options: &GlobalOptions) -> Result<()> {
        let context = RunContext::prepare(options).await?;
        let diagnostics = context.resolver.validate(&self.root, &context.signal).await?;

        match self.format {
            OutputFormat::Json => {
                let report = ValidationReport::from(&diagnostics);
                println!("{}", serde_json::to_string_pretty(&report).map_err(ResolverError::from)?);
                if report.valid {
                    Ok(())
                } else {
                    Err(ResolverError::ValidationFailed {
                        count: report.error_count,
                    }
                    .into())
                }
            }
            OutputFormat::Text => {
                report_diagnostics(&diagnostics)?;
                println!("{} Repository {} is valid", "✓".green(), self.root.display());
                Ok(())
            }
        }
    }
}
