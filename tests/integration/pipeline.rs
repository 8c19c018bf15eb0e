use constellation_resolver::config::ResolverConfig;
use constellation_resolver::core::{ErrorKind, ResolverError, RunSignal};
use constellation_resolver::models::Value;
use constellation_resolver::resolver::Resolver;
use constellation_resolver::test_utils::{RepoFixture, init_test_logging};
use std::path::PathBuf;

use crate::common::tokenized_repo;

fn resolver() -> Resolver {
    init_test_logging(None);
    Resolver::new(ResolverConfig::default())
}

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).unwrap()
}

/// Constellation-shared application broadcast to a member plus its local one
#[tokio::test]
async fn test_sample_repository_resolves_two_records() {
    let fixture = RepoFixture::sample();
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();
    assert!(resolution.is_success(), "{}", resolution.diagnostics);

    let apps = &resolution.applications;
    assert_eq!(apps.len(), 2);
    assert!(apps.iter().all(|a| a.cluster == "cluster1"));

    let operator = apps.iter().find(|a| a.name == "db-operator").unwrap();
    assert_eq!(operator.template, "database-operator-helm");
    assert!(operator.parameters.is_empty());

    let instance = apps.iter().find(|a| a.name == "db-instance-1").unwrap();
    assert_eq!(instance.template, "database-cr");
    assert_eq!(instance.parameters.get("size"), Some(&yaml("small")));
}

#[tokio::test]
async fn test_nested_parameters_are_interpolated() {
    let fixture = tokenized_repo();
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();
    assert!(resolution.is_success(), "{}", resolution.diagnostics);

    let monitoring = resolution.applications.iter().find(|a| a.name == "monitoring").unwrap();
    assert_eq!(monitoring.parameters.get("target"), Some(&yaml("cluster1")));
    let labels = yaml("{env: production, static: fixed}");
    assert_eq!(monitoring.parameters.get("labels"), Some(&labels));
    assert_eq!(monitoring.parameters.get("replicas"), Some(&yaml("3")));
}

#[tokio::test]
async fn test_shared_application_broadcast_to_every_member() {
    let fixture = RepoFixture::sample()
        .cluster("c1", "cluster2", "constellation: c1\nvariables:\n  clusterName: cluster2\n")
        .constellation_application(
            "c1",
            "ingress",
            "name: ingress\ntemplate: database-cr\nparameters:\n  host: \"{{ variables.clusterName }}.example.com\"\n",
        );
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();
    assert!(resolution.is_success(), "{}", resolution.diagnostics);

    let hosts: Vec<_> = resolution
        .applications
        .iter()
        .filter(|a| a.name == "ingress")
        .map(|a| (a.cluster.as_str(), a.parameters.get("host").cloned()))
        .collect();
    assert_eq!(
        hosts,
        vec![
            ("cluster1", Some(yaml("cluster1.example.com"))),
            ("cluster2", Some(yaml("cluster2.example.com"))),
        ]
    );
}

#[tokio::test]
async fn test_cluster_variables_override_constellation() {
    let fixture = RepoFixture::sample()
        .cluster("c1", "staging", "constellation: c1\nvariables:\n  env: staging\n")
        .cluster_application(
            "c1",
            "staging",
            "app",
            "name: app\ntemplate: database-cr\nparameters:\n  env: \"{{ variables.env }}\"\n",
        );
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();
    let app = resolution
        .applications
        .iter()
        .find(|a| a.cluster == "staging" && a.name == "app")
        .unwrap();
    assert_eq!(app.parameters.get("env"), Some(&yaml("staging")));
}

/// A cluster physically under c1 that declares c2 is rejected and emits nothing
#[tokio::test]
async fn test_misplaced_cluster_is_reference_error() {
    let fixture = RepoFixture::sample()
        .constellation("c2", "")
        .cluster("c1", "rogue", "constellation: c2\n")
        .cluster_application("c1", "rogue", "app", "name: app\ntemplate: database-cr\n");
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();

    assert!(!resolution.applications.iter().any(|a| a.cluster == "rogue"));
    assert_eq!(resolution.applications.len(), 2);
    assert_eq!(resolution.diagnostics.len(), 1);
    let diagnostic = resolution.diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.kind, ErrorKind::Reference);
    assert_eq!(diagnostic.subject, "rogue");
    assert_eq!(
        diagnostic.file,
        PathBuf::from("environments/constellations/c1/clusters/rogue/cluster.yaml")
    );
    assert!(!resolution.clusters.contains(&"rogue".to_string()));
}

#[tokio::test]
async fn test_missing_variable_names_application_parameter_and_variable() {
    let fixture = RepoFixture::sample().cluster_application(
        "c1",
        "cluster1",
        "broken",
        "name: broken\ntemplate: database-cr\nparameters:\n  owner: \"{{ variables.missing }}\"\n",
    );
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();

    assert!(resolution.applications.is_empty());
    let diagnostic = resolution.diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.kind, ErrorKind::UnresolvedVariable);
    assert_eq!(diagnostic.subject, "broken");
    assert!(diagnostic.message.contains("'owner'"));
    assert!(diagnostic.message.contains("'missing'"));
}

#[tokio::test]
async fn test_errors_from_independent_subtrees_are_all_reported() {
    let fixture = RepoFixture::sample()
        .template("web")
        .standalone_cluster_raw("no-doc", None)
        .standalone_cluster("bad-yaml", "variables: [1, 2\n")
        .standalone_cluster("unknown-template", "")
        .standalone_application("unknown-template", "a", "name: a\ntemplate: nope\n")
        .constellation("c3", "")
        .constellation_application("c3", "x", "name: shared\ntemplate: web\n")
        .cluster("c3", "collide", "constellation: c3\n")
        .cluster_application("c3", "collide", "y", "name: shared\ntemplate: web\n");
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();

    assert!(resolution.applications.iter().all(|a| a.cluster == "cluster1"));
    let subjects: Vec<_> =
        resolution.diagnostics.iter().map(|d| (d.kind, d.subject.as_str())).collect();
    assert!(subjects.contains(&(ErrorKind::Structure, "no-doc")));
    assert!(subjects.contains(&(ErrorKind::Structure, "bad-yaml")));
    assert!(subjects.contains(&(ErrorKind::Reference, "a")));
    assert!(subjects.contains(&(ErrorKind::Duplicate, "shared")));
    assert_eq!(resolution.diagnostics.len(), 4);
}

/// A broken cluster contributes nothing; its healthy neighbours still resolve
#[tokio::test]
async fn test_failing_cluster_does_not_affect_healthy_clusters() {
    let fixture = RepoFixture::sample()
        .standalone_cluster("broken", "")
        .standalone_application("broken", "x", "name: x\ntemplate: nowhere\n")
        .standalone_application("broken", "y", "name: y\ntemplate: database-cr\n");
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();

    assert!(!resolution.is_success());
    assert_eq!(resolution.diagnostics.len(), 1);
    let diagnostic = resolution.diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.kind, ErrorKind::Reference);
    assert_eq!(diagnostic.subject, "x");

    let keys: Vec<_> =
        resolution.applications.iter().map(|a| (a.cluster.as_str(), a.name.as_str())).collect();
    assert_eq!(keys, vec![("cluster1", "db-instance-1"), ("cluster1", "db-operator")]);
}

/// A variable whose value is itself a token never leaks into the output
#[tokio::test]
async fn test_token_inside_variable_value_is_reported() {
    let fixture = RepoFixture::new()
        .template("t")
        .standalone_cluster("solo", "variables:\n  a: \"{{ variables.b }}\"\n  b: real\n")
        .standalone_application(
            "solo",
            "app",
            "name: app\ntemplate: t\nparameters:\n  p: \"{{ variables.a }}\"\n",
        );
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();

    assert!(resolution.applications.is_empty());
    let diagnostic = resolution.diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.kind, ErrorKind::Reference);
    assert_eq!(diagnostic.subject, "app");
    assert!(diagnostic.message.contains("'p'"));
    assert!(diagnostic.message.contains("variable 'a'"));
}

/// Members of a constellation that failed its own checks are listed, not dropped
#[tokio::test]
async fn test_members_of_failed_constellation_are_reported() {
    let fixture = RepoFixture::sample()
        .constellation_application("c1", "again", "name: db-operator\ntemplate: database-cr\n")
        .standalone_cluster("edge", "")
        .standalone_application("edge", "web", "name: web\ntemplate: database-cr\n");
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();

    let kinds: Vec<_> =
        resolution.diagnostics.iter().map(|d| (d.kind, d.subject.as_str())).collect();
    assert!(kinds.contains(&(ErrorKind::Duplicate, "db-operator")));
    assert!(kinds.contains(&(ErrorKind::Reference, "cluster1")));
    assert_eq!(resolution.diagnostics.len(), 2);

    let clusters: Vec<_> = resolution.applications.iter().map(|a| a.cluster.as_str()).collect();
    assert_eq!(clusters, vec!["edge"]);
}

#[tokio::test]
async fn test_literal_parameters_pass_through_unchanged() {
    let document = "name: plain\ntemplate: database-cr\nparameters:\n  text: \"no tokens here } {\"\n  list: [1, two, {three: 3}]\n  flag: true\n  nothing: null\n";
    let fixture = RepoFixture::new()
        .template("database-cr")
        .standalone_cluster("solo", "")
        .standalone_application("solo", "plain", document);
    let resolution = resolver().resolve(fixture.root(), &RunSignal::never()).await.unwrap();
    assert!(resolution.is_success(), "{}", resolution.diagnostics);

    let raw: serde_yaml::Mapping = serde_yaml::from_str(document).unwrap();
    let expected = raw.get("parameters").unwrap();
    let actual = serde_yaml::to_value(&resolution.applications[0].parameters).unwrap();
    assert_eq!(&actual, expected);
}

#[tokio::test]
async fn test_resolution_is_byte_identical_across_runs() {
    let fixture = tokenized_repo()
        .standalone_cluster("edge", "variables:\n  region: eu\n")
        .standalone_application(
            "edge",
            "z",
            "name: z\ntemplate: database-cr\nparameters:\n  r: \"{{ variables.region }}\"\n",
        )
        .standalone_application("edge", "a", "name: a\ntemplate: database-cr\n");

    let mut outputs = Vec::new();
    for parallel in [1, 8] {
        let mut config = ResolverConfig::default();
        config.max_parallel = parallel;
        let resolution =
            Resolver::new(config).resolve(fixture.root(), &RunSignal::never()).await.unwrap();
        outputs.push(serde_json::to_string(&resolution.applications).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_missing_root_is_run_level_error() {
    let fixture = RepoFixture::new();
    let result = resolver().resolve(&fixture.root().join("nope"), &RunSignal::never()).await;
    assert!(matches!(result, Err(ResolverError::RepositoryNotFound { .. })));
}

#[tokio::test]
async fn test_cancellation_produces_no_records() {
    let fixture = RepoFixture::sample();
    let (handle, signal) = RunSignal::new(None);
    handle.cancel();
    let result = resolver().resolve(fixture.root(), &signal).await;
    let error = result.unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::Cancelled));
}
