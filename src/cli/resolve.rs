//! `constellation resolve`

use anyhow::Result;
use clap::{Args, ValueEnum};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::common::{GlobalOptions, RunContext, report_diagnostics, write_output};
use crate::core::ResolverError;
use crate::models::ResolvedApplication;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RecordFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Args)]
pub struct ResolveCommand {
    /// Repository root
    #[arg(long, default_value = ".", value_name = "PATH")]
    pub root: PathBuf,

    /// Output file; `-` or absent writes to stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Record format
    #[arg(long, value_enum, default_value = "json")]
    pub format: RecordFormat,

    /// Only emit records for these clusters (repeatable).
    ///
    /// The whole repository is still resolved and validated.
    #[arg(long = "cluster", value_name = "NAME")]
    pub clusters: Vec<String>,
}

impl ResolveCommand {
    pub async fn execute(self, options: &GlobalOptions) -> Result<()> {
        let context = RunContext::prepare(options).await?;
        let resolution = context.resolver.resolve(&self.root, &context.signal).await?;
        report_diagnostics(&resolution.diagnostics)?;

        let applications = self.select(resolution.applications, &resolution.clusters)?;
        let rendered = render(&applications, self.format)?;
        write_output(self.output.as_deref(), &rendered).await
    }

    fn select(
        &self,
        applications: Vec<ResolvedApplication>,
        known: &[String],
    ) -> Result<Vec<ResolvedApplication>> {
        if self.clusters.is_empty() {
            return Ok(applications);
        }

        let wanted: BTreeSet<&str> = self.clusters.iter().map(String::as_str).collect();
        let missing =
            wanted.iter().copied().find(|name| !known.iter().any(|k| k.as_str() == *name));
        if let Some(missing) = missing {
            return Err(ResolverError::ClusterNotFound {
                name: missing.to_string(),
            }
            .into());
        }
        Ok(applications.into_iter().filter(|app| wanted.contains(app.cluster.as_str())).collect())
    }
}

fn render(applications: &[ResolvedApplication], format: RecordFormat) -> Result<String> {
    Ok(match format {
        RecordFormat::Json => {
            let mut text = serde_json::to_string_pretty(applications).map_err(ResolverError::from)?;
            text.push('\n');
            text
        }
        RecordFormat::Yaml => serde_yaml::to_string(applications).map_err(ResolverError::from)?,
    })
}
