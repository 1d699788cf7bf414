//! External process execution
//!
//! Runs a command to completion, optionally feeding a secret on stdin, and
//! returns its stdout. Secrets go through a pipe and never touch disk or the
//! command line.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::core::secret::Secret;
use crate::error::ProcessError;

/// Runs one executable with varying arguments and environment
#[derive(Debug, Clone)]
pub struct CommandRunner {
    /// Path to the executable
    program: PathBuf,
}

impl CommandRunner {
    /// Create a runner for an explicit executable path
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// Create a runner for an executable found in `PATH`
    pub fn locate(program: &str) -> Result<Self, ProcessError> {
        which::which(program)
            .map(Self::new)
            .map_err(|_| ProcessError::NotFound {
                program: program.to_string(),
            })
    }

    /// Get the executable path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the command and return its stdout
    ///
    /// # Arguments
    /// * `args` - Command line arguments
    /// * `env` - Variables added to the inherited environment
    /// * `stdin` - Secret written to stdin, followed by a newline
    pub async fn run(
        &self,
        args: &[&str],
        env: &[(&str, &str)],
        stdin: Option<&Secret>,
    ) -> Result<String, ProcessError> {
        let program = self.program.display().to_string();
        tracing::debug!("Running {} {}", program, args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| ProcessError::Spawn {
            program: program.clone(),
            error: e.to_string(),
        })?;

        if let (Some(secret), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let mut payload = zeroize::Zeroizing::new(secret.expose().as_bytes().to_vec());
            payload.push(b'\n');
            pipe.write_all(&payload)
                .await
                .map_err(|e| ProcessError::Io {
                    path: self.program.clone(),
                    error: e.to_string(),
                })?;
            // Closing stdin lets the child see EOF
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ProcessError::Spawn {
                program: program.clone(),
                error: e.to_string(),
            })?;

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(ProcessError::Failed {
                program,
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse newline-delimited JSON objects
pub fn parse_json_lines(
    program: &str,
    output: &str,
) -> Result<Vec<serde_json::Value>, ProcessError> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| ProcessError::Parse {
                program: program.to_string(),
                error: format!("{e} in line '{line}'"),
            })
        })
        .collect()
}
