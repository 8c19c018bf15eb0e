use constellation_resolver::test_utils::RepoFixture;

use crate::common::run_constellation;

#[test]
fn test_vars_text_shows_provenance() {
    let fixture = RepoFixture::sample();
    let output = run_constellation(fixture.root(), &["vars", "--cluster", "cluster1"]).unwrap();
    output
        .assert_success()
        .assert_stdout_contains("cluster1 (constellation c1)")
        .assert_stdout_contains("[constellation c1]")
        .assert_stdout_contains("[cluster cluster1]");
}

#[test]
fn test_vars_json() {
    let fixture = RepoFixture::sample()
        .cluster("c1", "override", "constellation: c1\nvariables:\n  env: staging\n");
    let output =
        run_constellation(fixture.root(), &["vars", "--cluster", "override", "--format", "json"])
            .unwrap();
    output.assert_success();

    let json: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(json["cluster"], "override");
    assert_eq!(json["constellation"], "c1");
    assert_eq!(json["variables"]["env"]["value"], "staging");
    assert_eq!(json["variables"]["env"]["origin"]["level"], "cluster");
}

#[test]
fn test_vars_standalone_scope_is_own_scope() {
    let fixture = RepoFixture::sample().standalone_cluster("edge", "variables:\n  region: eu\n");
    let args = ["vars", "--cluster", "edge", "--format", "json"];
    let output = run_constellation(fixture.root(), &args).unwrap();
    output.assert_success();

    let json: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert!(json.get("constellation").is_none());
    let variables = json["variables"].as_object().unwrap();
    assert_eq!(variables.len(), 1);
    assert_eq!(variables["region"]["value"], "eu");
}

#[test]
fn test_vars_unknown_cluster_exits_1() {
    let fixture = RepoFixture::sample();
    run_constellation(fixture.root(), &["vars", "--cluster", "ghost"])
        .unwrap()
        .assert_code(1)
        .assert_stderr_contains("Cluster 'ghost' not found");
}

#[test]
fn test_vars_rejected_cluster_shows_its_errors() {
    let fixture = RepoFixture::sample().standalone_cluster("claims", "constellation: c1\n");
    let output = run_constellation(fixture.root(), &["vars", "--cluster", "claims"]).unwrap();
    output.assert_code(2);
    assert_eq!(output.diagnostic_lines().len(), 1);
}

#[test]
fn test_vars_cluster_with_duplicate_applications_shows_its_errors() {
    let fixture = RepoFixture::sample()
        .cluster_application("c1", "cluster1", "first", "name: twin\ntemplate: database-cr\n")
        .cluster_application("c1", "cluster1", "second", "name: twin\ntemplate: database-cr\n");
    let output = run_constellation(fixture.root(), &["vars", "--cluster", "cluster1"]).unwrap();
    output.assert_code(2);

    let lines = output.diagnostic_lines();
    assert_eq!(lines.len(), 1, "{}", output.stderr);
    assert!(lines[0].starts_with("DuplicateError:"));
    assert!(lines[0].contains("clusters/cluster1/applications/second.yaml"));
    assert!(!output.stderr.contains("not found"));
}

#[test]
fn test_vars_member_of_failed_constellation_shows_why() {
    let fixture = RepoFixture::sample()
        .constellation_application("c1", "copy", "name: db-operator\ntemplate: database-cr\n");
    let output = run_constellation(fixture.root(), &["vars", "--cluster", "cluster1"]).unwrap();
    output.assert_code(2);

    let lines = output.diagnostic_lines();
    assert_eq!(lines.len(), 1, "{}", output.stderr);
    assert!(lines[0].contains("cluster1") && lines[0].contains("'c1'"));
}
