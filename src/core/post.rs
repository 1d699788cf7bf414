//! Post phase
//!
//! Loads the state left by the run phase and asks the provider that wrote
//! it to undo what it acquired. Nothing here fails the job: every problem
//! is reported as a warning.

use crate::core::state::CleanupReport;
use crate::infra::state_store::StateStore;
use crate::infra::workflow::OutputSink;
use crate::provider::{ProviderKind, SourceProvider};

/// Execute the post phase
///
/// `make_provider` builds the provider named in the saved state; it is only
/// called when there is a state to clean up.
pub async fn execute<S, F, P>(store: &StateStore, sink: &mut S, make_provider: F) -> CleanupReport
where
    S: OutputSink,
    F: FnOnce(ProviderKind) -> P,
    P: SourceProvider,
{
    let mut report = CleanupReport::new();

    let state = match store.load() {
        Ok(Some(state)) => state,
        Ok(None) => {
            tracing::info!("No post state at {}, nothing to clean up", store.path().display());
            return report;
        }
        Err(e) => {
            report.warn(e.to_string());
            emit_warnings(sink, &report);
            return report;
        }
    };

    match state.provider {
        Some(kind) if !state.is_empty() => {
            tracing::info!("Cleaning up after the {} provider", kind);
            report.merge(make_provider(kind).cleanup(&state).await);
        }
        Some(_) => tracing::debug!("Post state holds nothing to clean up"),
        None if state.is_empty() => {}
        None => report.warn("Post state does not name its provider, skipping cleanup"),
    }

    for action in &report.completed {
        tracing::info!("{}", action);
    }

    if let Err(e) = store.remove() {
        report.warn(e.to_string());
    }

    emit_warnings(sink, &report);
    report
}

fn emit_warnings<S: OutputSink>(sink: &mut S, report: &CleanupReport) {
    for warning in &report.warnings {
        sink.warning(warning);
    }
}
