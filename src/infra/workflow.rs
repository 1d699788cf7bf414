//! Workflow outputs
//!
//! Implements the GitHub Actions workflow-command protocol: outputs and
//! exported variables are appended to the files named by `$GITHUB_OUTPUT`
//! and `$GITHUB_ENV`, secrets are registered with `::add-mask::`, and
//! annotations are printed as `::warning::` / `::error::`. Outside Actions,
//! outputs are printed as `name=value` lines with secrets redacted.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::config::env;
use crate::core::secret::Secret;
use crate::error::OutputError;

/// Destination for run results
pub trait OutputSink {
    /// Set a step output
    fn set_output(&mut self, name: &str, value: &str) -> Result<(), OutputError>;

    /// Set a step output holding a secret; the value is masked first
    fn set_secret_output(&mut self, name: &str, value: &Secret) -> Result<(), OutputError>;

    /// Export an environment variable to later steps
    fn export_variable(&mut self, name: &str, value: &str) -> Result<(), OutputError>;

    /// Register a secret so the runner redacts it from logs
    fn mask(&mut self, secret: &Secret) -> Result<(), OutputError>;

    /// Emit a warning annotation
    fn warning(&mut self, message: &str);
}

/// [`OutputSink`] speaking the GitHub Actions protocol
#[derive(Debug)]
pub struct ActionsSink<W: Write> {
    /// `$GITHUB_OUTPUT`
    output_file: Option<PathBuf>,
    /// `$GITHUB_ENV`
    env_file: Option<PathBuf>,
    /// Whether workflow commands are understood by whoever reads `out`
    in_actions: bool,
    /// Where commands and plain outputs are written
    out: W,
    /// Secrets already registered with the runner
    masked: Vec<Secret>,
}

impl ActionsSink<std::io::Stdout> {
    /// Create a sink from the runner environment, writing to stdout
    pub fn from_env() -> Self {
        Self::from_env_with(std::io::stdout())
    }
}

impl<W: Write> ActionsSink<W> {
    /// Create a sink from the runner environment, writing to `out`
    pub fn from_env_with(out: W) -> Self {
        let file = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        let in_actions = std::env::var(env::GITHUB_ACTIONS).is_ok_and(|v| v == "true");

        Self::new(file(env::GITHUB_OUTPUT), file(env::GITHUB_ENV), in_actions, out)
    }

    /// Create a sink with explicit files and writer
    pub fn new(
        output_file: Option<PathBuf>,
        env_file: Option<PathBuf>,
        in_actions: bool,
        out: W,
    ) -> Self {
        Self {
            output_file,
            env_file,
            in_actions,
            out,
            masked: Vec::new(),
        }
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, line: &str) -> Result<(), OutputError> {
        writeln!(self.out, "{line}").map_err(|e| OutputError::Stdout(e.to_string()))
    }
}

impl<W: Write> OutputSink for ActionsSink<W> {
    fn set_output(&mut self, name: &str, value: &str) -> Result<(), OutputError> {
        match &self.output_file {
            Some(path) => append_command(path, name, value),
            None => self.print(&format!("{name}={value}")),
        }
    }

    fn set_secret_output(&mut self, name: &str, value: &Secret) -> Result<(), OutputError> {
        self.mask(value)?;
        match &self.output_file {
            Some(path) => append_command(path, name, value.expose()),
            None => self.print(&format!("{name}={value}")),
        }
    }

    fn export_variable(&mut self, name: &str, value: &str) -> Result<(), OutputError> {
        match &self.env_file {
            Some(path) => append_command(path, name, value),
            None => {
                tracing::info!("Not exporting '{}': no $GITHUB_ENV file", name);
                Ok(())
            }
        }
    }

    fn mask(&mut self, secret: &Secret) -> Result<(), OutputError> {
        if !self.in_actions || self.masked.contains(secret) {
            return Ok(());
        }
        // The runner masks line by line
        for line in secret.expose().lines().filter(|l| !l.trim().is_empty()) {
            self.print(&format!("::add-mask::{line}"))?;
        }
        self.masked.push(secret.clone());
        Ok(())
    }

    fn warning(&mut self, message: &str) {
        if self.in_actions {
            let _ = self.print(&format!("::warning::{}", escape_data(message)));
        } else {
            tracing::warn!("{}", message);
        }
    }
}

/// Escape annotation data per the workflow command syntax
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Format a `name<<delimiter` block
pub fn format_command(name: &str, value: &str, delimiter: &str) -> Result<String, OutputError> {
    if name.contains(delimiter) || value.contains(delimiter) {
        return Err(OutputError::DelimiterCollision {
            name: name.to_string(),
        });
    }
    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}

fn append_command(path: &PathBuf, name: &str, value: &str) -> Result<(), OutputError> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    let block = format_command(name, value, &delimiter)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| OutputError::Write {
            path: path.clone(),
            error: e.to_string(),
        })?;
    file.write_all(block.as_bytes())
        .map_err(|e| OutputError::Write {
            path: path.clone(),
            error: e.to_string(),
        })
}
