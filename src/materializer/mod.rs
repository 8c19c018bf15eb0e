//! Application materializer.
//!
//! For every cluster the attached applications are its constellation's shared
//! applications followed by its own local ones. Each is checked, then its
//! parameters are interpolated with the cluster's merged scope.
//!
//! A cluster with any problem contributes no [`ResolvedApplication`] at all;
//! its diagnostics explain why. Shared/local name collisions are found before
//! any interpolation happens.
//!
//! Clusters are independent: [`materialize`] runs one blocking task per cluster
//! over a shared, read-only [`Hierarchy`]. Each task returns its own
//! [`ClusterOutcome`] and outcomes are merged once all tasks have finished.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::core::{Diagnostics, ResolverError, RunSignal};
use crate::hierarchy::{ApplicationSpec, ClusterId, Hierarchy};
use crate::interpolation::interpolate_value;
use crate::models::{Parameters, ResolvedApplication};
use crate::validator::{self, token_diagnostic};
use crate::variables::{MergedScope, resolve_scope};

/// Result of materializing one cluster.
#[derive(Debug, Clone, Default)]
pub struct ClusterOutcome {
    /// Empty whenever `diagnostics` is not
    pub resolved: Vec<ResolvedApplication>,
    pub diagnostics: Diagnostics,
}

/// Resolved applications and diagnostics for a set of clusters.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    /// Sorted by cluster, then application name
    pub applications: Vec<ResolvedApplication>,
    pub diagnostics: Diagnostics,
}

/// Materialize every application attached to one cluster.
#[must_use]
pub fn materialize_cluster(hierarchy: &Hierarchy, id: ClusterId) -> ClusterOutcome {
    let cluster = hierarchy.cluster(id);
    let (mut diagnostics, collisions) = validator::check_collisions(hierarchy, id);
    let scope = resolve_scope(hierarchy, id);
    let mut resolved = Vec::new();

    let attached = hierarchy.shared_applications(id).iter().chain(&cluster.applications);
    for app in attached.filter(|app| !collisions.contains(&app.name)) {
        if let Some(problem) = validator::check_template(app, hierarchy.templates()) {
            diagnostics.push(problem);
            continue;
        }
        match interpolate_parameters(app, &scope, &cluster.name) {
            Ok(parameters) => resolved.push(ResolvedApplication {
                cluster: cluster.name.clone(),
                name: app.name.clone(),
                template: app.template.clone(),
                parameters,
            }),
            Err(problems) => diagnostics.merge(problems),
        }
    }

    if !diagnostics.is_empty() {
        tracing::debug!(
            target: "materializer",
            "Cluster '{}' failed with {} problem(s); discarding {} resolved applications",
            cluster.name,
            diagnostics.len(),
            resolved.len()
        );
        resolved.clear();
    }

    ClusterOutcome {
        resolved,
        diagnostics,
    }
}

fn interpolate_parameters(
    app: &ApplicationSpec,
    scope: &MergedScope,
    cluster: &str,
) -> Result<Parameters, Diagnostics> {
    let mut parameters = Parameters::new();
    let mut diagnostics = Diagnostics::new();

    for (name, raw) in &app.parameters {
        match interpolate_value(raw, scope) {
            Ok(value) => {
                parameters.insert(name.clone(), value);
            }
            Err(errors) => {
                for error in &errors {
                    diagnostics.push(token_diagnostic(app, name, error, Some(cluster)));
                }
            }
        }
    }

    if diagnostics.is_empty() { Ok(parameters) } else { Err(diagnostics) }
}

/// Materialize `clusters` concurrently, at most `max_parallel` at a time.
///
/// # Errors
///
/// [`ResolverError::Cancelled`] when `signal` trips before every cluster is
/// done; no partial output is returned in that case. [`ResolverError::TaskFailed`]
/// when a worker panics.
pub async fn materialize(
    hierarchy: Arc<Hierarchy>,
    clusters: Vec<ClusterId>,
    max_parallel: usize,
    signal: &RunSignal,
) -> Result<Materialized, ResolverError> {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    tracing::debug!(
        target: "materializer",
        "Materializing {} clusters with up to {} workers",
        clusters.len(),
        max_parallel
    );

    let tasks = clusters.into_iter().map(|id| {
        let hierarchy = Arc::clone(&hierarchy);
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore.acquire_owned().await.map_err(|e| ResolverError::TaskFailed {
                reason: e.to_string(),
            })?;
            tokio::task::spawn_blocking(move || materialize_cluster(&hierarchy, id))
                .await
                .map_err(|e| ResolverError::TaskFailed {
                    reason: e.to_string(),
                })
        }
    });

    let outcomes = signal.guard(join_all(tasks)).await?;

    let mut materialized = Materialized::default();
    for outcome in outcomes {
        let outcome = outcome?;
        materialized.applications.extend(outcome.resolved);
        materialized.diagnostics.merge(outcome.diagnostics);
    }
    signal.check()?;

    materialized
        .applications
        .sort_by(|a, b| a.cluster.cmp(&b.cluster).then_with(|| a.name.cmp(&b.name)));
    materialized.diagnostics.normalize();

    tracing::info!(
        target: "materializer",
        "Materialized {} applications ({} problems)",
        materialized.applications.len(),
        materialized.diagnostics.len()
    );
    Ok(materialized)
}
