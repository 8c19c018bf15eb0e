//! Structural and referential checks.
//!
//! Every check returns diagnostics instead of failing, so one run reports as
//! many problems as it can find. The hierarchy builder runs the structural
//! checks ([`check_unique_clusters`], [`check_unique_names`],
//! [`check_membership`]); the materializer and `constellation validate` run the
//! referential ones ([`check_collisions`], [`check_template`],
//! [`check_token_syntax`]).

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::STANDALONE_CLUSTERS_DIR;
use crate::core::{Diagnostic, Diagnostics};
use crate::hierarchy::{ApplicationSpec, ClusterId, Hierarchy};
use crate::interpolation::{TokenError, check_syntax, find_similar_names};
use crate::scanner::{Placement, RawCluster};

/// Report cluster identifiers used by more than one cluster directory.
///
/// Returns the diagnostics and the set of offending names. Every occurrence is
/// reported since none of them can be told apart in the output.
pub fn check_unique_clusters<'a>(
    clusters: impl IntoIterator<Item = &'a RawCluster>,
) -> (Diagnostics, BTreeSet<String>) {
    let mut by_name: BTreeMap<&str, Vec<&RawCluster>> = BTreeMap::new();
    for cluster in clusters {
        by_name.entry(cluster.name.as_str()).or_default().push(cluster);
    }

    let mut diagnostics = Diagnostics::new();
    let mut duplicated = BTreeSet::new();
    for (name, occurrences) in by_name.into_iter().filter(|(_, o)| o.len() > 1) {
        let places: Vec<String> =
            occurrences.iter().map(|c| describe_placement(&c.placement)).collect();
        let message = format!(
            "cluster identifier is used {} times ({})",
            occurrences.len(),
            places.join(", ")
        );
        for cluster in &occurrences {
            diagnostics.push(Diagnostic::duplicate(&cluster.file, name, message.clone()));
        }
        duplicated.insert(name.to_string());
    }
    (diagnostics, duplicated)
}

/// Report applications sharing a name within one declaring scope.
///
/// The first declaration (in file order) is kept as the reference; every later
/// one is reported.
pub fn check_unique_names(applications: &[ApplicationSpec], scope: &str) -> Diagnostics {
    let mut first_seen: BTreeMap<&str, &ApplicationSpec> = BTreeMap::new();
    let mut diagnostics = Diagnostics::new();

    for app in applications {
        match first_seen.get(app.name.as_str()) {
            Some(first) => diagnostics.push(Diagnostic::duplicate(
                &app.source,
                &app.name,
                format!(
                    "application name already declared in {} by {}",
                    scope,
                    first.source.display()
                ),
            )),
            None => {
                first_seen.insert(&app.name, app);
            }
        }
    }
    diagnostics
}

/// Check a cluster's `constellation` field against the directory it lives in.
///
/// `known` holds every constellation directory name found by the scanner.
/// Returns `None` for consistent clusters and for clusters whose document
/// could not be read (those already carry a diagnostic).
#[must_use]
pub fn check_membership(cluster: &RawCluster, known: &BTreeSet<String>) -> Option<Diagnostic> {
    let document = cluster.document.as_ref()?;
    let declared = document.constellation.as_deref().map(str::trim);

    let message = match (&cluster.placement, declared) {
        (Placement::Constellation(parent), Some(declared)) if declared == parent.as_str() => {
            return None;
        }
        (Placement::Standalone, None) => return None,
        (Placement::Constellation(parent), None) => format!(
            "cluster resides under constellation '{parent}' \
             but does not declare 'constellation: {parent}'"
        ),
        (placement, Some(declared)) if !known.contains(declared) => format!(
            "cluster declares non-existent constellation '{declared}' but resides {}",
            describe_placement(placement)
        ),
        (placement, Some(declared)) => format!(
            "cluster declares constellation '{declared}' but resides {}",
            describe_placement(placement)
        ),
    };
    Some(Diagnostic::reference(&cluster.file, &cluster.name, message))
}

fn describe_placement(placement: &Placement) -> String {
    match placement {
        Placement::Constellation(parent) => format!("under constellation '{parent}'"),
        Placement::Standalone => format!("under {STANDALONE_CLUSTERS_DIR}"),
    }
}

/// Names declared both by the constellation and locally.
#[must_use]
pub fn find_collisions(shared: &[ApplicationSpec], local: &[ApplicationSpec]) -> BTreeSet<String> {
    let shared_names: BTreeSet<&str> = shared.iter().map(|app| app.name.as_str()).collect();
    local
        .iter()
        .filter(|app| shared_names.contains(app.name.as_str()))
        .map(|app| app.name.clone())
        .collect()
}

/// Shared/local name collisions on one cluster.
///
/// Returns the diagnostics and the colliding names; the materializer produces
/// nothing for those names.
#[must_use]
pub fn check_collisions(hierarchy: &Hierarchy, id: ClusterId) -> (Diagnostics, BTreeSet<String>) {
    let cluster = hierarchy.cluster(id);
    let shared = hierarchy.shared_applications(id);
    let collisions = find_collisions(shared, &cluster.applications);

    let mut diagnostics = Diagnostics::new();
    if collisions.is_empty() {
        return (diagnostics, collisions);
    }

    let constellation =
        cluster.constellation.map(|parent| hierarchy.constellation(parent).name.as_str());
    for app in cluster.applications.iter().filter(|app| collisions.contains(&app.name)) {
        let shared_source = shared
            .iter()
            .find(|s| s.name == app.name)
            .map(|s| s.source.display().to_string())
            .unwrap_or_default();
        diagnostics.push(Diagnostic::duplicate(
            &app.source,
            &app.name,
            format!(
                "application on cluster '{}' collides with the shared application of \
                 constellation '{}' declared in {}",
                cluster.name,
                constellation.unwrap_or_default(),
                shared_source
            ),
        ));
    }
    (diagnostics, collisions)
}

/// Report an application whose template directory does not exist.
#[must_use]
pub fn check_template(app: &ApplicationSpec, templates: &BTreeSet<String>) -> Option<Diagnostic> {
    if templates.contains(&app.template) {
        return None;
    }

    let available: Vec<&str> = templates.iter().map(String::as_str).collect();
    let suggestions = find_similar_names(&app.template, &available);
    let hint = if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean '{}'?)", suggestions.join("', '"))
    };
    Some(Diagnostic::reference(
        &app.source,
        &app.name,
        format!("unknown template '{}'{}", app.template, hint),
    ))
}

/// Malformed or unterminated tokens in an application's parameters.
#[must_use]
pub fn check_token_syntax(app: &ApplicationSpec) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for (parameter, value) in &app.parameters {
        for error in check_syntax(value) {
            diagnostics.push(token_diagnostic(app, parameter, &error, None));
        }
    }
    diagnostics
}

/// Diagnostic for one interpolation failure.
///
/// Unresolved variables are `UnresolvedVariableError`; syntax problems and
/// values that would leave a token behind are `ReferenceError`.
#[must_use]
pub fn token_diagnostic(
    app: &ApplicationSpec,
    parameter: &str,
    error: &TokenError,
    cluster: Option<&str>,
) -> Diagnostic {
    let location = cluster.map(|c| format!(" on cluster '{c}'")).unwrap_or_default();
    let message = format!("parameter '{parameter}'{location}: {error}");
    match error {
        TokenError::Unresolved { .. } => Diagnostic::unresolved(&app.source, &app.name, message),
        TokenError::Malformed { .. }
        | TokenError::Unterminated { .. }
        | TokenError::NestedToken { .. } => Diagnostic::reference(&app.source, &app.name, message),
    }
}

/// Every check that does not need a merged scope, for one cluster.
#[must_use]
pub fn check_cluster(hierarchy: &Hierarchy, id: ClusterId) -> Diagnostics {
    let (mut diagnostics, _) = check_collisions(hierarchy, id);
    let cluster = hierarchy.cluster(id);

    for app in hierarchy.shared_applications(id).iter().chain(&cluster.applications) {
        diagnostics.extend(check_template(app, hierarchy.templates()));
        diagnostics.merge(check_token_syntax(app));
    }
    diagnostics
}

/// [`check_cluster`] over the whole hierarchy.
///
/// Shared applications of constellations without members are checked too.
#[must_use]
pub fn check_hierarchy(hierarchy: &Hierarchy) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for id in hierarchy.cluster_ids() {
        diagnostics.merge(check_cluster(hierarchy, id));
    }
    for (_, constellation) in hierarchy.constellations().filter(|(_, c)| c.members.is_empty()) {
        for app in &constellation.applications {
            diagnostics.extend(check_template(app, hierarchy.templates()));
            diagnostics.merge(check_token_syntax(app));
        }
    }
    diagnostics.normalize();
    diagnostics
}
