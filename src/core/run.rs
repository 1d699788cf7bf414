//! Run phase
//!
//! Resolves the ref with the selected provider, persists the post state,
//! generates the build names and emits every output. The state file is
//! written even when resolution fails, so anything acquired along the way
//! is still cleaned up by the post phase.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::core::buildname::{self, BuildDescription, BuildName};
use crate::core::files::{ensure_required, FileMappings};
use crate::core::state::PostState;
use crate::error::{InputError, OutputError, PewError};
use crate::infra::state_store::StateStore;
use crate::infra::workflow::OutputSink;
use crate::provider::{ProviderKind, SourceProvider};

/// Validated inputs of the run phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInputs {
    /// Repository identifiers, in input order
    pub repositories: Vec<String>,
    /// Ref to resolve
    pub reference: String,
    /// Backend to resolve against
    pub provider: ProviderKind,
    /// Requested files and their environment variables
    pub files: FileMappings,
    /// Counter distinguishing repeated builds of a ref
    pub run_number: String,
    /// Timestamp to name the build after instead of the commit date
    pub build_time: Option<DateTime<Utc>>,
}

impl RunInputs {
    /// Validate raw inputs
    ///
    /// Repository, ref and provider are checked in that order; the first
    /// missing one is reported.
    pub fn parse(
        repository: Option<&str>,
        reference: Option<&str>,
        provider: Option<&str>,
        files: Option<&str>,
    ) -> Result<Self, InputError> {
        let present = |value: Option<&str>, name: &str| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
                .ok_or_else(|| InputError::MissingInput {
                    name: name.to_string(),
                })
        };

        let repositories = split_repositories(&present(repository, "repository")?);
        let reference = present(reference, "ref")?;
        let provider = present(provider, "provider")?.parse()?;

        Ok(Self {
            repositories,
            reference,
            provider,
            files: FileMappings::parse(files.unwrap_or_default()),
            run_number: String::new(),
            build_time: None,
        })
    }

    /// Set the run number
    #[must_use]
    pub fn with_run_number(mut self, run_number: impl Into<String>) -> Self {
        self.run_number = run_number.into();
        self
    }

    /// Name the build after `time` instead of the commit date
    #[must_use]
    pub fn with_build_time(mut self, time: Option<DateTime<Utc>>) -> Self {
        self.build_time = time;
        self
    }
}

/// Split a repository input on commas and newlines
pub fn split_repositories(input: &str) -> Vec<String> {
    input
        .split([',', '\n'])
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Resolved commit id
    pub commit: String,
    /// Commit timestamp
    pub commit_date: DateTime<Utc>,
    /// Generated build names
    pub build: BuildName,
    /// Environment variables files were exported to
    pub exported: Vec<String>,
    /// Fetched files nobody asked for
    pub unrequested: Vec<String>,
}

/// Execute the run phase
///
/// # Arguments
/// * `provider` - Backend to resolve with
/// * `inputs` - Validated inputs
/// * `store` - Where the post state is persisted
/// * `sink` - Receives outputs, exports and warnings
pub async fn execute<P, S>(
    provider: &P,
    inputs: &RunInputs,
    store: &StateStore,
    sink: &mut S,
) -> Result<RunReport, PewError>
where
    P: SourceProvider,
    S: OutputSink,
{
    let requests = inputs.files.requests();
    let mut state = PostState::for_provider(provider.kind());

    tracing::info!(
        "Resolving '{}' with the {} provider",
        inputs.reference,
        provider.kind()
    );
    let resolved = provider
        .resolve(&inputs.repositories, &inputs.reference, &requests, &mut state)
        .await;

    // Mask acquired credentials even when resolving failed
    let masked = state.secrets().try_for_each(|secret| sink.mask(secret));

    if let Err(e) = store.save(&state) {
        // A resolve failure is the more useful error to report
        if resolved.is_err() {
            tracing::error!("{}", e);
        } else {
            return Err(e.into());
        }
    }
    let info = resolved?;
    masked?;

    sink.set_secret_output("token", &info.token)?;
    sink.set_output("commit", &info.commit)?;
    sink.set_output(
        "commit-date",
        &info.commit_date.to_rfc3339_opts(SecondsFormat::Secs, true),
    )?;
    tracing::info!("Resolved {} to: {}", inputs.reference, info.commit);

    ensure_required(&requests, &info.files)?;

    let build = buildname::generate(
        &BuildDescription {
            reference: inputs.reference.clone(),
            commit: info.commit.clone(),
            date: inputs.build_time.unwrap_or(info.commit_date),
        },
        &inputs.run_number,
    );
    sink.set_output("build-template", &build.template)?;
    sink.set_output("build-short", &build.short)?;
    let components = serde_json::to_string(&build).map_err(|e| OutputError::Stdout(e.to_string()))?;
    sink.set_output("build-components", &components)?;
    tracing::info!("Build names:");
    tracing::info!("  template: {}", build.template);
    tracing::info!("  short: {}", build.short);

    let mut exported = Vec::new();
    let mut unrequested = Vec::new();
    for file in &info.files {
        match inputs.files.env_for(&file.path) {
            Some(var) => {
                sink.export_variable(var, &file.content)?;
                tracing::info!("Exporting file '{}' as environment variable '{}'", file.path, var);
                exported.push(var.to_string());
            }
            None => {
                sink.warning(&format!("Provider returned unrequested file '{}'", file.path));
                unrequested.push(file.path.clone());
            }
        }
    }

    Ok(RunReport {
        commit: info.commit,
        commit_date: info.commit_date,
        build,
        exported,
        unrequested,
    })
}
