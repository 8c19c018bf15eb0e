use constellation_resolver::test_utils::RepoFixture;

use crate::common::run_constellation;

#[test]
fn test_config_defaults_are_outermost_scope() {
    let fixture = RepoFixture::sample()
        .file(
            "resolver.toml",
            "max_parallel = 2\n\n[defaults]\nregion = \"eu-west-1\"\nenv = \"dev\"\n",
        )
        .cluster_application(
            "c1",
            "cluster1",
            "regional",
            "name: regional\ntemplate: database-cr\nparameters:\n  where: \"{{ variables.region }}/{{ variables.env }}\"\n",
        );

    let output =
        run_constellation(fixture.root(), &["--config", "resolver.toml", "resolve"]).unwrap();
    output.assert_success().assert_stdout_contains("\"where\": \"eu-west-1/production\"");
}

#[test]
fn test_missing_config_file_exits_1() {
    let fixture = RepoFixture::sample();
    run_constellation(fixture.root(), &["resolve", "--config", "absent.toml"])
        .unwrap()
        .assert_code(1)
        .assert_stderr_contains("absent.toml");
}

#[test]
fn test_invalid_config_exits_1() {
    let fixture = RepoFixture::sample().file("bad.toml", "max_parallel = \"many\"\n");
    run_constellation(fixture.root(), &["validate", "--config", "bad.toml"])
        .unwrap()
        .assert_code(1);
}

#[test]
fn test_unknown_config_key_rejected() {
    let fixture = RepoFixture::sample().file("typo.toml", "max_paralel = 4\n");
    run_constellation(fixture.root(), &["validate", "--config", "typo.toml"])
        .unwrap()
        .assert_code(1);
}

#[test]
fn test_zero_max_parallel_flag_rejected() {
    let fixture = RepoFixture::sample();
    run_constellation(fixture.root(), &["resolve", "--max-parallel", "0"])
        .unwrap()
        .assert_code(1)
        .assert_stderr_contains("max_parallel");
}
