//! `constellation vars`

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fmt::Write as _;
use std::path::PathBuf;

use super::common::{GlobalOptions, RunContext, report_diagnostics};
use super::validate::OutputFormat;
use crate::core::ResolverError;
use crate::interpolation::render_value;
use crate::resolver::ClusterScope;

#[derive(Args)]
pub struct VarsCommand {
    /// Repository root
    #[arg(long, default_value = ".", value_name = "PATH")]
    pub root: PathBuf,

    /// Cluster whose scope to show
    #[arg(long, value_name = "NAME")]
    pub cluster: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl VarsCommand {
    pub async fn execute(self, options: &GlobalOptions) -> Result<()> {
        let context = RunContext::prepare(options).await?;
        let lookup = context.resolver.scopes(&self.root, &self.cluster, &context.signal).await?;

        let Some(scope) = lookup.scope else {
            // The cluster exists on disk but failed a check: show why.
            report_diagnostics(&lookup.diagnostics_for(&self.cluster))?;
            return Err(ResolverError::ClusterNotFound {
                name: self.cluster,
            }
            .into());
        };

        if !lookup.diagnostics.is_empty() {
            tracing::warn!(
                "Repository has {} problem(s); run `constellation validate` for details",
                lookup.diagnostics.len()
            );
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&scope).map_err(ResolverError::from)?);
            }
            OutputFormat::Text => print!("{}", render_text(&scope)),
        }
        Ok(())
    }
}

fn render_text(scope: &ClusterScope) -> String {
    let mut out = String::new();
    match &scope.constellation {
        Some(parent) => {
            let _ = writeln!(out, "{} (constellation {})", scope.cluster.bold(), parent);
        }
        None => {
            let _ = writeln!(out, "{} (standalone)", scope.cluster.bold());
        }
    }

    if scope.variables.is_empty() {
        let _ = writeln!(out, "  (no variables)");
        return out;
    }

    let width = scope.variables.names().map(str::len).max().unwrap_or(0);
    for (name, entry) in scope.variables.iter() {
        let _ = writeln!(
            out,
            "  {:<width$} = {}  {}",
            name,
            render_value(&entry.value),
            format!("[{}]", entry.origin).dimmed(),
            width = width
        );
    }
    out
}
