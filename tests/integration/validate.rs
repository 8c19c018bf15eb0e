use assert_cmd::Command;
use constellation_resolver::test_utils::RepoFixture;
use predicates::prelude::*;

use crate::common::run_constellation;

#[test]
fn test_validate_clean_repository() {
    let fixture = RepoFixture::sample();
    run_constellation(fixture.root(), &["validate"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("✓")
        .assert_stdout_contains("is valid");
}

/// validate never interpolates, so an undefined variable is not reported here
#[test]
fn test_validate_does_not_resolve_variables() {
    let fixture = RepoFixture::sample().cluster_application(
        "c1",
        "cluster1",
        "later",
        "name: later\ntemplate: database-cr\nparameters:\n  x: \"{{ variables.undefined }}\"\n",
    );
    run_constellation(fixture.root(), &["validate"]).unwrap().assert_success();
}

#[test]
fn test_validate_structural_problems_exit_2() {
    let fixture = RepoFixture::sample()
        .standalone_cluster("ghost", "constellation: nowhere\n")
        .standalone_cluster("typo", "variable:\n  a: b\n")
        .cluster_application(
            "c1",
            "cluster1",
            "expr",
            "name: expr\ntemplate: database-cr\nparameters:\n  x: \"{{ variables.a | upper }}\"\n",
        );

    let output = run_constellation(fixture.root(), &["validate"]).unwrap();
    output.assert_code(2);

    let lines = output.diagnostic_lines();
    assert_eq!(lines.len(), 3, "{}", output.stderr);
    assert!(lines.iter().any(|l| l.starts_with("ReferenceError:")
        && l.contains("standalone-clusters/ghost/cluster.yaml")
        && l.contains("non-existent")));
    assert!(lines.iter().any(|l| l.starts_with("StructureError:") && l.contains("typo")));
    assert!(lines.iter().any(|l| l.starts_with("ReferenceError:") && l.contains("expr")));
}

#[test]
fn test_validate_json_report() {
    let fixture = RepoFixture::sample()
        .standalone_cluster("edge", "")
        .standalone_application("edge", "a", "name: a\ntemplate: databse-cr\n");

    let output = Command::cargo_bin("constellation")
        .unwrap()
        .env("NO_COLOR", "1")
        .env_remove("CONSTELLATION_CONFIG")
        .current_dir(fixture.root())
        .args(["validate", "--format", "json"])
        .assert()
        .code(2)
        .get_output()
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], false);
    assert_eq!(report["error_count"], 1);
    assert_eq!(report["counts"]["ReferenceError"], 1);
    assert_eq!(report["errors"][0]["kind"], "ReferenceError");
    assert_eq!(report["errors"][0]["subject"], "a");
    let message = report["errors"][0]["message"].as_str().unwrap();
    assert!(message.contains("did you mean 'database-cr'"));
}

#[test]
fn test_validate_json_clean() {
    let fixture = RepoFixture::sample();
    Command::cargo_bin("constellation")
        .unwrap()
        .env("NO_COLOR", "1")
        .env_remove("CONSTELLATION_CONFIG")
        .args(["validate", "--format", "json", "--root"])
        .arg(fixture.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));
}

#[test]
fn test_validate_duplicate_application_names_in_one_scope() {
    let fixture = RepoFixture::sample()
        .cluster_application("c1", "cluster1", "copy-a", "name: twin\ntemplate: database-cr\n")
        .cluster_application("c1", "cluster1", "copy-b", "name: twin\ntemplate: database-cr\n");

    let output = run_constellation(fixture.root(), &["validate"]).unwrap();
    output.assert_code(2);
    let lines = output.diagnostic_lines();
    assert_eq!(lines.len(), 1, "{}", output.stderr);
    assert!(lines[0].starts_with("DuplicateError:"));
    assert!(lines[0].contains("copy-b.yaml"));
}
