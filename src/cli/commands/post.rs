//! CLI implementation for `pew-resolve post`
//!
//! Cleans up after a previous run. Never fails: problems are warnings.

use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use crate::cli::output::{self, status};
use crate::core::post;
use crate::infra::state_store::StateStore;
use crate::infra::workflow::ActionsSink;
use crate::provider::Provider;

/// Execute the post command
pub async fn execute(state_file: Option<PathBuf>) -> Result<()> {
    let store = StateStore::new(state_file.unwrap_or_else(StateStore::default_path));
    let mut sink = ActionsSink::from_env();

    let report = post::execute(&store, &mut sink, Provider::from_env).await;

    if output::is_json() {
        output::print_json(&json!({
            "completed": report.completed,
            "warnings": report.warnings,
        }))?;
    } else {
        if report.completed.is_empty() && report.warnings.is_empty() {
            output::info("Nothing to clean up");
        }
        for action in &report.completed {
            output::success(action);
        }
        if !report.warnings.is_empty() && !output::is_quiet() {
            eprintln!(
                "{} Cleanup finished with {} warning(s)",
                status::WARNING,
                report.warnings.len()
            );
        }
    }
    Ok(())
}
