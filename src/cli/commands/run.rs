//! CLI implementation for `pew-resolve run`
//!
//! Validates the inputs, resolves the ref with the selected provider and
//! writes every output through the workflow sink.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::cli::output;
use crate::core::run::{self, RunInputs, RunReport};
use crate::infra::state_store::StateStore;
use crate::infra::workflow::ActionsSink;
use crate::provider::Provider;

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Repository identifier(s)
    pub repository: Option<String>,
    /// Ref to resolve
    pub reference: Option<String>,
    /// Provider name
    pub provider: Option<String>,
    /// `files` mapping
    pub files: Option<String>,
    /// Run number
    pub run_number: String,
    /// Use the current time for the build name
    pub use_current_time: bool,
    /// State file override
    pub state_file: Option<PathBuf>,
}

/// Execute the run command
pub async fn execute(options: RunOptions) -> Result<()> {
    let inputs = RunInputs::parse(
        options.repository.as_deref(),
        options.reference.as_deref(),
        options.provider.as_deref(),
        options.files.as_deref(),
    )?
    .with_run_number(options.run_number)
    .with_build_time(options.use_current_time.then(Utc::now));

    let provider = Provider::from_env(inputs.provider);
    let store = StateStore::new(options.state_file.unwrap_or_else(StateStore::default_path));

    // Plain `name=value` lines would corrupt the JSON document on stdout
    let report = if output::is_json() && !output::in_actions() {
        let mut sink = ActionsSink::from_env_with(std::io::sink());
        run::execute(&provider, &inputs, &store, &mut sink).await?
    } else {
        let mut sink = ActionsSink::from_env();
        run::execute(&provider, &inputs, &store, &mut sink).await?
    };

    if output::is_json() {
        output::print_json(&report_json(&report))?;
    } else {
        output::success(&format!(
            "Resolved {} to {} ({})",
            inputs.reference, report.commit, report.build.short
        ));
    }
    Ok(())
}

fn report_json(report: &RunReport) -> serde_json::Value {
    json!({
        "commit": report.commit,
        "commit_date": report.commit_date.to_rfc3339_opts(SecondsFormat::Secs, true),
        "build": report.build,
        "exported": report.exported,
        "unrequested": report.unrequested,
    })
}
