//! Output formatting
//!
//! Global output mode (quiet, JSON, verbosity), status-prefixed messages and
//! error display. Inside GitHub Actions errors are printed as `::error::`
//! annotations so they show up on the run summary.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::Serialize;

use crate::config::env;
use crate::infra::workflow::escape_data;

static QUIET: AtomicBool = AtomicBool::new(false);
static JSON: AtomicBool = AtomicBool::new(false);
static VERBOSITY: AtomicU8 = AtomicU8::new(0);

/// Output settings taken from the global flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
    /// Print machine-readable JSON
    pub json: bool,
    /// `-v` count
    pub verbose: u8,
}

impl OutputConfig {
    /// Create an output configuration
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make this configuration visible to [`is_quiet`], [`is_json`] and [`verbosity`]
    pub fn apply_global(&self) {
        QUIET.store(self.quiet, Ordering::Relaxed);
        JSON.store(self.json, Ordering::Relaxed);
        VERBOSITY.store(self.verbose, Ordering::Relaxed);
    }

    /// Log level implied by the flags
    pub fn log_level(&self) -> tracing::Level {
        match (self.quiet, self.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        }
    }
}

/// Whether `--quiet` is in effect
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Whether `--json` is in effect
pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

/// Number of `-v` flags
pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

/// Whether we run inside a GitHub Actions runner
pub fn in_actions() -> bool {
    std::env::var(env::GITHUB_ACTIONS).is_ok_and(|v| v == "true")
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success line unless quiet
pub fn success(message: &str) {
    if !is_quiet() && !is_json() {
        println!("{} {message}", status::SUCCESS);
    }
}

/// Print an informational line unless quiet
pub fn info(message: &str) {
    if !is_quiet() && !is_json() {
        println!("{} {message}", status::INFO);
    }
}

/// Format an error and its causes
///
/// The cause chain is only included with `-v`.
pub fn format_error(error: &anyhow::Error, verbose: bool) -> String {
    let mut message = error.to_string();
    if verbose {
        for cause in error.chain().skip(1) {
            message.push_str(&format!("\n  caused by: {cause}"));
        }
    }
    message
}

/// Report a fatal error
pub fn display_error(error: &anyhow::Error) {
    let message = format_error(error, verbosity() > 0);
    if in_actions() {
        println!("::error::{}", escape_data(&message));
    } else {
        eprintln!("{} Error: {message}", status::ERROR);
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_flags() {
        assert_eq!(OutputConfig::new(false, false, 0).log_level(), tracing::Level::WARN);
        assert_eq!(OutputConfig::new(false, false, 1).log_level(), tracing::Level::INFO);
        assert_eq!(OutputConfig::new(false, false, 2).log_level(), tracing::Level::DEBUG);
        assert_eq!(OutputConfig::new(false, true, 3).log_level(), tracing::Level::TRACE);
        assert_eq!(OutputConfig::new(true, false, 2).log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_format_error_includes_causes_when_verbose() {
        let error = anyhow::anyhow!("root cause").context("Failed to resolve");
        assert_eq!(format_error(&error, false), "Failed to resolve");
        assert_eq!(
            format_error(&error, true),
            "Failed to resolve\n  caused by: root cause"
        );
    }
}
