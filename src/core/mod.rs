//! Core business logic module
//!
//! Build naming, file request handling and the run/post pipelines. Network
//! and process I/O lives in [`crate::infra`] and [`crate::provider`].
//!
//! # Submodules
//!
//! - [`buildname`] - Deterministic build name generation
//! - [`wordlist`] - Word selection for short build names
//! - [`files`] - `files` input parsing and required-file checks
//! - [`repository`] - Provider-independent resolution results
//! - [`secret`] - Secret values that never reach a log line
//! - [`state`] - State carried from the run phase to the post phase
//! - [`run`] - Run phase pipeline
//! - [`post`] - Post phase cleanup

pub mod buildname;
pub mod files;
pub mod post;
pub mod repository;
pub mod run;
pub mod secret;
pub mod state;
pub mod wordlist;
