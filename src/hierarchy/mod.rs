//! In-memory constellation graph.
//!
//! The builder turns a [`ScannedRepository`] into a [`Hierarchy`]: an arena of
//! constellations and clusters addressed by [`ConstellationId`] and
//! [`ClusterId`]. Once built the hierarchy is never mutated, so the
//! materializer can share it between workers behind an `Arc` without locks.
//!
//! # Structural checks
//!
//! While building, each entity is checked and only healthy entities enter the
//! arena:
//!
//! - a constellation whose own files failed to scan, or that declares two
//!   shared applications with the same name, is left out together with all of
//!   its member clusters; each member that passed its own checks gets a
//!   `ReferenceError` naming the failed constellation
//! - a cluster whose `constellation` field disagrees with the directory it lives
//!   in is left out (`ReferenceError`)
//! - a cluster identifier used by more than one cluster directory is left out
//!   everywhere it appears (`DuplicateError`)
//! - a cluster declaring two local applications with the same name is left out
//!
//! Clusters are stored sorted by name, so iteration order is deterministic.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::core::{Diagnostic, Diagnostics};
use crate::interpolation::is_identifier;
use crate::models::Parameters;
use crate::scanner::{Placement, RawApplication, RawCluster, RawConstellation, ScannedRepository};
use crate::validator;
use crate::variables::VariableScope;

/// Index of a constellation in its [`Hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstellationId(usize);

/// Index of a cluster in its [`Hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(usize);

/// An application declared by a constellation or a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSpec {
    pub name: String,
    /// Template reference without leading or trailing `/`
    pub template: String,
    pub parameters: Parameters,
    /// Declaring file
    pub source: PathBuf,
}

impl From<RawApplication> for ApplicationSpec {
    fn from(raw: RawApplication) -> Self {
        let template = raw.document.template_ref().to_string();
        Self {
            name: raw.document.name.trim().to_string(),
            template,
            parameters: raw.document.parameters,
            source: raw.file,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Constellation {
    pub name: String,
    pub variables: VariableScope,
    /// Shared applications, broadcast to every member
    pub applications: Vec<ApplicationSpec>,
    /// Member clusters, sorted by name
    pub members: Vec<ClusterId>,
    /// Path of `constellation.yaml`
    pub source: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    /// Parent constellation; `None` for standalone clusters
    pub constellation: Option<ConstellationId>,
    pub variables: VariableScope,
    /// Local applications
    pub applications: Vec<ApplicationSpec>,
    /// Path of `cluster.yaml`
    pub source: PathBuf,
}

/// Read-only graph of every healthy constellation and cluster.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    defaults: Option<VariableScope>,
    templates: BTreeSet<String>,
    constellations: Vec<Constellation>,
    clusters: Vec<Cluster>,
}

impl Hierarchy {
    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id.0]
    }

    #[must_use]
    pub fn constellation(&self, id: ConstellationId) -> &Constellation {
        &self.constellations[id.0]
    }

    /// Repository-wide default scope, when configured and non-empty.
    #[must_use]
    pub fn defaults(&self) -> Option<&VariableScope> {
        self.defaults.as_ref()
    }

    #[must_use]
    pub const fn templates(&self) -> &BTreeSet<String> {
        &self.templates
    }

    /// Cluster ids in name order.
    pub fn cluster_ids(&self) -> impl Iterator<Item = ClusterId> + '_ {
        (0..self.clusters.len()).map(ClusterId)
    }

    pub fn clusters(&self) -> impl Iterator<Item = (ClusterId, &Cluster)> {
        self.clusters.iter().enumerate().map(|(index, cluster)| (ClusterId(index), cluster))
    }

    pub fn constellations(&self) -> impl Iterator<Item = (ConstellationId, &Constellation)> {
        self.constellations
            .iter()
            .enumerate()
            .map(|(index, constellation)| (ConstellationId(index), constellation))
    }

    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    #[must_use]
    pub fn find_cluster(&self, name: &str) -> Option<ClusterId> {
        self.clusters.binary_search_by(|c| c.name.as_str().cmp(name)).ok().map(ClusterId)
    }

    /// Applications a cluster inherits from its constellation.
    #[must_use]
    pub fn shared_applications(&self, id: ClusterId) -> &[ApplicationSpec] {
        self.cluster(id)
            .constellation
            .map_or(&[], |parent| self.constellation(parent).applications.as_slice())
    }
}

/// A built hierarchy and the problems found while building it.
#[derive(Debug, Clone, Default)]
pub struct HierarchyBuild {
    pub hierarchy: Hierarchy,
    /// Scanner diagnostics followed by structural ones
    pub diagnostics: Diagnostics,
}

/// Build the hierarchy from scanner output.
///
/// `defaults` becomes the outermost scope level when it is non-empty.
#[must_use]
pub fn build(scanned: ScannedRepository, defaults: Option<VariableScope>) -> HierarchyBuild {
    let ScannedRepository {
        templates,
        constellations: raw_constellations,
        standalone,
        diagnostics: scan_diagnostics,
        ..
    } = scanned;

    let mut diagnostics = scan_diagnostics;
    let known: BTreeSet<String> = raw_constellations.iter().map(|c| c.name.clone()).collect();

    let duplicated = {
        let all_clusters =
            raw_constellations.iter().flat_map(|c| c.clusters.iter()).chain(standalone.iter());
        let (found, names) = validator::check_unique_clusters(all_clusters);
        diagnostics.merge(found);
        names
    };

    let mut hierarchy = Hierarchy {
        defaults: defaults.filter(|d| !d.is_empty()),
        templates,
        ..Hierarchy::default()
    };

    // Clusters are collected first and numbered once sorted.
    let mut pending: Vec<(Option<ConstellationId>, Cluster)> = Vec::new();

    for raw in raw_constellations {
        let RawConstellation {
            name,
            file,
            document,
            applications,
            clusters,
            failed,
        } = raw;

        let applications: Vec<ApplicationSpec> =
            applications.into_iter().map(Into::into).collect();
        let duplicates =
            validator::check_unique_names(&applications, &format!("constellation '{name}'"));
        let healthy = !failed && duplicates.is_empty();
        diagnostics.merge(duplicates);

        let parent = match document {
            Some(document) if healthy => {
                warn_on_variable_names(&document.variables, &name);
                let id = ConstellationId(hierarchy.constellations.len());
                hierarchy.constellations.push(Constellation {
                    name: name.clone(),
                    variables: document.variables,
                    applications,
                    members: Vec::new(),
                    source: file,
                });
                Some(id)
            }
            _ => {
                tracing::warn!(
                    target: "hierarchy",
                    "Skipping constellation '{}' and its {} clusters due to earlier errors",
                    name,
                    clusters.len()
                );
                None
            }
        };

        for raw_cluster in clusters {
            let Some(cluster) = admit_cluster(raw_cluster, &known, &duplicated, &mut diagnostics)
            else {
                continue;
            };
            match parent {
                Some(parent) => pending.push((Some(parent), cluster)),
                None => diagnostics.push(Diagnostic::reference(
                    &cluster.source,
                    &cluster.name,
                    format!("constellation '{name}' failed earlier checks; cluster skipped"),
                )),
            }
        }
    }

    for raw_cluster in standalone {
        if let Some(cluster) = admit_cluster(raw_cluster, &known, &duplicated, &mut diagnostics) {
            pending.push((None, cluster));
        }
    }

    pending.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    for (index, (parent, mut cluster)) in pending.into_iter().enumerate() {
        cluster.constellation = parent;
        if let Some(parent) = parent {
            hierarchy.constellations[parent.0].members.push(ClusterId(index));
        }
        hierarchy.clusters.push(cluster);
    }

    tracing::debug!(
        target: "hierarchy",
        "Built hierarchy with {} constellations and {} clusters",
        hierarchy.constellations.len(),
        hierarchy.clusters.len()
    );

    HierarchyBuild {
        hierarchy,
        diagnostics,
    }
}

/// Run the cluster-level checks; returns the cluster only when it passes all of them.
fn admit_cluster(
    raw: RawCluster,
    known: &BTreeSet<String>,
    duplicated: &BTreeSet<String>,
    diagnostics: &mut Diagnostics,
) -> Option<Cluster> {
    let mut healthy = !raw.failed && !duplicated.contains(&raw.name);

    if let Some(problem) = validator::check_membership(&raw, known) {
        diagnostics.push(problem);
        healthy = false;
    }

    let applications: Vec<ApplicationSpec> =
        raw.applications.into_iter().map(Into::into).collect();
    let duplicates =
        validator::check_unique_names(&applications, &format!("cluster '{}'", raw.name));
    healthy &= duplicates.is_empty();
    diagnostics.merge(duplicates);

    let document = raw.document?;
    if !healthy {
        tracing::warn!(
            target: "hierarchy",
            "Skipping cluster '{}' due to earlier errors",
            raw.name
        );
        return None;
    }

    let location = match &raw.placement {
        Placement::Constellation(parent) => format!("constellation '{parent}'"),
        Placement::Standalone => "standalone".to_string(),
    };
    tracing::debug!(target: "hierarchy", "Attached cluster '{}' ({})", raw.name, location);
    warn_on_variable_names(&document.variables, &raw.name);

    Some(Cluster {
        name: raw.name,
        constellation: None,
        variables: document.variables,
        applications,
        source: raw.file,
    })
}

fn warn_on_variable_names(scope: &VariableScope, owner: &str) {
    for name in scope.names().filter(|name| !is_identifier(name)) {
        tracing::warn!(
            target: "hierarchy",
            "Variable '{}' in '{}' cannot be referenced by a token",
            name,
            owner
        );
    }
}
