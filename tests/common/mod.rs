//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Variables the binary reads that must not leak in from the test environment
const ISOLATED_VARS: &[&str] = &[
    "GITHUB_ACTIONS",
    "GITHUB_OUTPUT",
    "GITHUB_ENV",
    "GITHUB_RUN_NUMBER",
    "GITHUB_EVENT_NAME",
    "RUNNER_TEMP",
    "INPUT_REPOSITORY",
    "INPUT_REF",
    "INPUT_PROVIDER",
    "INPUT_FILES",
    "PEW_STATE_FILE",
    "PEW_GITHUB_APPID",
    "PEW_GITHUB_KEY",
    "PEW_GITHUB_API_URL",
    "PEW_GITLAB_TOKEN",
    "PEW_BITBUCKET_USERNAME",
    "PEW_BITBUCKET_PASSWORD",
    "PEW_BITBUCKET_API_URL",
    "PEW_P4USER",
    "PEW_P4PASS",
    "PEW_P4_CLIENT_TEMPLATE",
    "PEW_P4PORT_FINGERPRINT",
    "PEW_P4_BINARY",
    "RUST_LOG",
];

/// Sandbox for one invocation of the binary
///
/// Owns a temporary directory holding the state, output and env files.
pub struct TestRunner {
    /// Temporary directory for the run
    pub dir: TempDir,
}

impl TestRunner {
    /// Create a runner with a fresh temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the temporary directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// State file used by `run` and `post`
    pub fn state_file(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    /// `$GITHUB_OUTPUT` file
    pub fn output_file(&self) -> PathBuf {
        self.dir.path().join("github_output")
    }

    /// `$GITHUB_ENV` file
    pub fn env_file(&self) -> PathBuf {
        self.dir.path().join("github_env")
    }

    /// Build a command with an isolated environment
    pub fn command(&self, args: &[&str]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_pew-resolve"));
        for var in ISOLATED_VARS {
            cmd.env_remove(var);
        }
        cmd.env("PEW_STATE_FILE", self.state_file());
        cmd.current_dir(self.dir.path());
        cmd.args(args);
        cmd
    }

    /// Build a command that behaves as if inside a GitHub Actions runner
    pub fn actions_command(&self, args: &[&str]) -> tokio::process::Command {
        let mut cmd = self.command(args);
        cmd.env("GITHUB_ACTIONS", "true")
            .env("GITHUB_OUTPUT", self.output_file())
            .env("GITHUB_ENV", self.env_file());
        cmd
    }

    /// Read `name<<delimiter` blocks written to a workflow file
    pub fn read_blocks(&self, path: &Path) -> Vec<(String, String)> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        let mut blocks = Vec::new();
        let mut lines = content.lines();
        while let Some(header) = lines.next() {
            let (name, delimiter) = header.split_once("<<").expect("Malformed block header");
            let mut value = Vec::new();
            for line in lines.by_ref() {
                if line == delimiter {
                    break;
                }
                value.push(line);
            }
            blocks.push((name.to_string(), value.join("\n")));
        }
        blocks
    }

    /// Value of a named block in a workflow file
    pub fn block(&self, path: &Path, name: &str) -> Option<String> {
        self.read_blocks(path)
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode captured output as UTF-8
pub fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
