use assert_cmd::Command;
use constellation_resolver::models::ResolvedApplication;
use constellation_resolver::test_utils::RepoFixture;
use predicates::prelude::*;

use crate::common::{run_constellation, tokenized_repo};

fn constellation() -> Command {
    let mut cmd = Command::cargo_bin("constellation").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("CONSTELLATION_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_resolve_json_to_stdout() {
    let fixture = RepoFixture::sample();
    let output = run_constellation(fixture.root(), &["resolve"]).unwrap();
    output.assert_success();

    let records: Vec<ResolvedApplication> = serde_json::from_str(&output.stdout).unwrap();
    let keys: Vec<_> = records.iter().map(|r| (r.cluster.as_str(), r.name.as_str())).collect();
    assert_eq!(keys, vec![("cluster1", "db-instance-1"), ("cluster1", "db-operator")]);
}

#[test]
fn test_resolve_yaml_to_file() {
    let fixture = tokenized_repo();
    let out = fixture.root().join("resolved.yaml");

    constellation()
        .arg("resolve")
        .arg("--root")
        .arg(fixture.root())
        .arg("--format")
        .arg("yaml")
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(&out).unwrap();
    let records: Vec<ResolvedApplication> = serde_yaml::from_str(&content).unwrap();
    let monitoring = records.iter().find(|r| r.name == "monitoring").unwrap();
    assert_eq!(monitoring.parameters.get("target").and_then(|v| v.as_str()), Some("cluster1"));
}

#[test]
fn test_resolve_output_is_deterministic() {
    let fixture = tokenized_repo()
        .standalone_cluster("alpha", "")
        .standalone_application("alpha", "web", "name: web\ntemplate: database-cr\n");

    let first = run_constellation(fixture.root(), &["resolve"]).unwrap();
    let second = run_constellation(fixture.root(), &["resolve", "--max-parallel", "1"]).unwrap();
    first.assert_success();
    second.assert_success();
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_resolve_cluster_filter() {
    let fixture = RepoFixture::sample()
        .standalone_cluster("alpha", "")
        .standalone_application("alpha", "web", "name: web\ntemplate: database-cr\n");

    let output = run_constellation(fixture.root(), &["resolve", "--cluster", "alpha"]).unwrap();
    output.assert_success();
    let records: Vec<ResolvedApplication> = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].cluster, "alpha");
}

#[test]
fn test_resolve_unknown_cluster_filter_exits_1() {
    let fixture = RepoFixture::sample();
    constellation()
        .current_dir(fixture.root())
        .args(["resolve", "--cluster", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_resolve_validation_errors_exit_2_with_one_line_each() {
    let fixture = RepoFixture::sample()
        .cluster_application(
            "c1",
            "cluster1",
            "db-operator",
            "name: db-operator\ntemplate: database-cr\n",
        )
        .standalone_cluster("edge", "")
        .standalone_application(
            "edge",
            "web",
            "name: web\ntemplate: database-cr\nparameters:\n  x: \"{{ variables.missing }}\"\n",
        );

    let output = run_constellation(fixture.root(), &["resolve"]).unwrap();
    output.assert_code(2);
    assert!(output.stdout.is_empty(), "no records expected, got {}", output.stdout);

    let lines = output.diagnostic_lines();
    assert_eq!(lines.len(), 2, "{}", output.stderr);
    assert!(lines.iter().any(|l| l.starts_with("DuplicateError:") && l.contains("db-operator")));
    assert!(lines.iter().any(|l| {
        l.starts_with("UnresolvedVariableError:") && l.contains("web") && l.contains("missing")
    }));
}

#[test]
fn test_resolve_missing_root_exits_1() {
    let fixture = RepoFixture::new();
    constellation()
        .args(["resolve", "--root"])
        .arg(fixture.root().join("absent"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Repository root not found"));
}

#[test]
fn test_resolve_with_cancelled_deadline_exits_1() {
    let fixture = RepoFixture::sample();
    let output = run_constellation(fixture.root(), &["resolve", "--timeout", "0"]).unwrap();
    output.assert_code(1).assert_stderr_contains("cancelled");
    assert!(output.stdout.is_empty());
}
