//! Pipeline orchestration.
//!
//! [`Resolver`] runs the stages in order over one repository:
//!
//! ```text
//! scan -> build hierarchy -> merge scopes -> interpolate -> materialize
//! ```
//!
//! Nothing is cached between calls; every call recomputes from the files on
//! disk. Entity-level problems come back as [`Diagnostics`] with paths relative
//! to the repository root. Only run-level failures (missing root, cancellation,
//! worker failure) are returned as [`ResolverError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use constellation_resolver::config::ResolverConfig;
//! use constellation_resolver::resolver::Resolver;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let resolver = Resolver::new(ResolverConfig::default());
//! let (_handle, signal) = resolver.signal();
//! let resolution = resolver.resolve(Path::new("."), &signal).await?;
//!
//! if resolution.is_success() {
//!     for app in &resolution.applications {
//!         println!("{}/{} -> {}", app.cluster, app.name, app.template);
//!     }
//! } else {
//!     eprintln!("{}", resolution.diagnostics);
//! }
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::constants::{CLUSTERS_DIR, STANDALONE_CLUSTERS_DIR};
use crate::core::{CancelHandle, Diagnostics, ResolverError, RunSignal};
use crate::hierarchy::{self, HierarchyBuild};
use crate::materializer::materialize;
use crate::models::ResolvedApplication;
use crate::scanner::{ScanOptions, scan};
use crate::validator::check_hierarchy;
use crate::variables::{MergedScope, resolve_scope};

/// Output of [`Resolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Records of every cluster that resolved cleanly, sorted by cluster,
    /// then name. Failed clusters contribute nothing.
    pub applications: Vec<ResolvedApplication>,
    /// Every cluster that made it into the hierarchy, sorted
    pub clusters: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl Resolution {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// A cluster's merged variables with provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterScope {
    pub cluster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constellation: Option<String>,
    pub variables: MergedScope,
}

/// Output of [`Resolver::scopes`].
#[derive(Debug, Clone, Default)]
pub struct ScopeLookup {
    /// `None` when the cluster is unknown or failed structural checks
    pub scope: Option<ClusterScope>,
    pub diagnostics: Diagnostics,
}

impl ScopeLookup {
    /// Diagnostics that name `cluster` or point into its directory.
    #[must_use]
    pub fn diagnostics_for(&self, cluster: &str) -> Diagnostics {
        self.diagnostics
            .iter()
            .filter(|d| d.subject == cluster || in_cluster_dir(&d.file, cluster))
            .cloned()
            .collect()
    }
}

fn in_cluster_dir(file: &Path, cluster: &str) -> bool {
    let parts: Vec<&OsStr> = file.components().map(|c| c.as_os_str()).collect();
    parts.windows(2).any(|pair| {
        (pair[0] == CLUSTERS_DIR || pair[0] == STANDALONE_CLUSTERS_DIR) && pair[1] == cluster
    })
}

/// Runs the resolution pipeline with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    #[must_use]
    pub const fn new(config: ResolverConfig) -> Self {
        Self {
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// A fresh cancellation pair whose deadline is the configured timeout.
    #[must_use]
    pub fn signal(&self) -> (CancelHandle, RunSignal) {
        RunSignal::new(self.config.timeout())
    }

    /// Scan `root` and build its hierarchy.
    ///
    /// # Errors
    ///
    /// Missing root or cancellation.
    pub async fn build_hierarchy(
        &self,
        root: &Path,
        signal: &RunSignal,
    ) -> Result<HierarchyBuild, ResolverError> {
        let options = ScanOptions::from(&self.config);
        let scanned = scan(root, &options, signal).await?;
        let mut built = hierarchy::build(scanned, Some(self.config.defaults.clone()));
        built.diagnostics = relative(built.diagnostics, root);
        Ok(built)
    }

    /// Structural and static referential checks, without interpolation.
    ///
    /// # Errors
    ///
    /// Missing root or cancellation.
    pub async fn validate(
        &self,
        root: &Path,
        signal: &RunSignal,
    ) -> Result<Diagnostics, ResolverError> {
        let built = self.build_hierarchy(root, signal).await?;
        let mut diagnostics = built.diagnostics;
        diagnostics.merge(relative(check_hierarchy(&built.hierarchy), root));
        diagnostics.normalize();

        tracing::info!(
            "Validated {} clusters in {}: {} problem(s)",
            built.hierarchy.cluster_count(),
            root.display(),
            diagnostics.len()
        );
        Ok(diagnostics)
    }

    /// Run the full pipeline.
    ///
    /// # Errors
    ///
    /// Missing root, cancellation or a failed worker. Entity-level problems
    /// are returned in [`Resolution::diagnostics`].
    pub async fn resolve(
        &self,
        root: &Path,
        signal: &RunSignal,
    ) -> Result<Resolution, ResolverError> {
        let HierarchyBuild {
            hierarchy,
            diagnostics: mut all,
        } = self.build_hierarchy(root, signal).await?;

        let clusters: Vec<String> = hierarchy.clusters().map(|(_, c)| c.name.clone()).collect();
        let ids = hierarchy.cluster_ids().collect();
        let materialized =
            materialize(Arc::new(hierarchy), ids, self.config.max_parallel, signal).await?;

        all.merge(relative(materialized.diagnostics, root));
        all.normalize();

        if !all.is_empty() {
            tracing::warn!(
                "{} problem(s) reported; {} applications resolved on healthy clusters",
                all.len(),
                materialized.applications.len()
            );
        }

        Ok(Resolution {
            applications: materialized.applications,
            clusters,
            diagnostics: all,
        })
    }

    /// Merged variable scope of one cluster.
    ///
    /// # Errors
    ///
    /// Missing root or cancellation.
    pub async fn scopes(
        &self,
        root: &Path,
        cluster: &str,
        signal: &RunSignal,
    ) -> Result<ScopeLookup, ResolverError> {
        let built = self.build_hierarchy(root, signal).await?;
        let hierarchy = &built.hierarchy;

        let scope = hierarchy.find_cluster(cluster).map(|id| {
            let entry = hierarchy.cluster(id);
            ClusterScope {
                cluster: entry.name.clone(),
                constellation: entry
                    .constellation
                    .map(|parent| hierarchy.constellation(parent).name.clone()),
                variables: resolve_scope(hierarchy, id),
            }
        });

        Ok(ScopeLookup {
            scope,
            diagnostics: built.diagnostics,
        })
    }
}

fn relative(diagnostics: Diagnostics, root: &Path) -> Diagnostics {
    diagnostics.into_iter().map(|d| d.relative_to(root)).collect()
}
