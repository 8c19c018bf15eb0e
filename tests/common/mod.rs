//! Shared helpers for the integration suite

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::{Context, Result};
use constellation_resolver::test_utils::RepoFixture;
use std::path::Path;
use std::process::Command;

/// Captured result of one CLI invocation
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "Command failed with code {:?}\nStderr: {}",
            self.code, self.stderr
        );
        self
    }

    pub fn assert_code(&self, code: i32) -> &Self {
        assert_eq!(
            self.code,
            Some(code),
            "Unexpected exit code\nStdout: {}\nStderr: {}",
            self.stdout,
            self.stderr
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Expected stdout to contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Expected stderr to contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }

    /// stderr lines produced by diagnostics
    pub fn diagnostic_lines(&self) -> Vec<&str> {
        const KINDS: [&str; 4] =
            ["StructureError:", "ReferenceError:", "DuplicateError:", "UnresolvedVariableError:"];
        self.stderr
            .lines()
            .filter(|line| KINDS.iter().any(|kind| line.starts_with(kind)))
            .collect()
    }
}

/// Run the binary against `root` with colors and env config disabled.
pub fn run_constellation(root: &Path, args: &[&str]) -> Result<CommandOutput> {
    let binary = env!("CARGO_BIN_EXE_constellation");
    let output = Command::new(binary)
        .args(args)
        .current_dir(root)
        .env("NO_COLOR", "1")
        .env_remove("CONSTELLATION_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .context("Failed to run constellation command")?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
        code: output.status.code(),
    })
}

/// The sample repository plus a cluster-local application using tokens.
pub fn tokenized_repo() -> RepoFixture {
    RepoFixture::sample().cluster_application(
        "c1",
        "cluster1",
        "monitoring",
        "name: monitoring\ntemplate: database-cr\nparameters:\n  \
         target: \"{{ variables.clusterName }}\"\n  \
         labels:\n    env: \"{{variables.env}}\"\n    static: fixed\n  \
         replicas: 3\n",
    )
}
