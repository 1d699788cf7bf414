//! Infrastructure layer
//!
//! Handles all I/O operations: HTTP, external processes, the post-state file
//! and the workflow output protocol.

pub mod http;
pub mod process;
pub mod state_store;
pub mod workflow;
