//! Configuration and constants
//!
//! - [`defaults`] - Default values and tunables
//! - [`urls`] - Upstream API base URLs
//! - [`env`] - Environment variable names read by the providers and the CLI

pub mod defaults;
pub mod env;
pub mod urls;
