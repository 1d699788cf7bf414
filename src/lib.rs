//! pew-resolve - CI source resolution and build naming
//!
//! Resolves a source-control ref to an immutable commit on GitHub, GitLab,
//! Bitbucket or Perforce, fetches requested files at that commit, and derives
//! deterministic build names from the result.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Build naming and the run/post pipelines
//! - [`provider`] - Source provider backends
//! - [`infra`] - Infrastructure layer (HTTP, processes, state file, workflow outputs)
//! - [`config`] - Constants and environment variable names
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod provider;

#[cfg(test)]
pub mod test_utils;
