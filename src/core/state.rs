//! Post-phase state
//!
//! Everything the cleanup phase needs is recorded here while resolving, then
//! persisted by the caller and handed back to the post phase. Providers
//! record a credential as soon as they acquire it so a later failure still
//! leaves it revocable.

use serde::{Deserialize, Serialize};

use crate::core::secret::Secret;
use crate::provider::ProviderKind;

/// Perforce login to undo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerforceLogin {
    /// `P4PORT` logged into
    pub port: String,
    /// `P4USER` logged in as
    pub user: String,
}

/// State carried from the run phase to the post phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostState {
    /// Provider that produced the state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,

    /// GitHub installation token to revoke
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<Secret>,

    /// Perforce login to log out of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perforce_login: Option<PerforceLogin>,

    /// Perforce port whose trust was added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perforce_trust_port: Option<String>,
}

impl PostState {
    /// Create an empty state for a provider
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider: Some(provider),
            ..Self::default()
        }
    }

    /// Secrets held by the state
    pub fn secrets(&self) -> impl Iterator<Item = &Secret> {
        self.github_token.iter()
    }

    /// Whether there is anything to clean up
    pub fn is_empty(&self) -> bool {
        self.github_token.is_none()
            && self.perforce_login.is_none()
            && self.perforce_trust_port.is_none()
    }
}

/// Outcome of a cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Actions that succeeded
    pub completed: Vec<String>,
    /// Failures, reported but never fatal
    pub warnings: Vec<String>,
}

impl CleanupReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed action
    pub fn complete(&mut self, action: impl Into<String>) {
        self.completed.push(action.into());
    }

    /// Record a failed action
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: CleanupReport) {
        self.completed.extend(other.completed);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state_serializes_to_provider_only() {
        let state = PostState::for_provider(ProviderKind::Gitlab);
        assert!(state.is_empty());
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"provider":"gitlab"}"#
        );
    }

    #[test]
    fn test_state_roundtrip_with_credentials() {
        let state = PostState {
            provider: Some(ProviderKind::Perforce),
            github_token: None,
            perforce_login: Some(PerforceLogin {
                port: "ssl:perforce:1666".to_string(),
                user: "builder".to_string(),
            }),
            perforce_trust_port: Some("ssl:perforce:1666".to_string()),
        };

        let json = serde_json::to_string(&state).unwrap();
        let back: PostState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert!(!back.is_empty());
    }

    #[test]
    fn test_cleanup_report_merge() {
        let mut report = CleanupReport::new();
        report.complete("Logged out");
        let mut other = CleanupReport::new();
        other.warn("trust -d failed");
        report.merge(other);

        assert_eq!(report.completed, vec!["Logged out".to_string()]);
        assert_eq!(report.warnings, vec!["trust -d failed".to_string()]);
    }
}
