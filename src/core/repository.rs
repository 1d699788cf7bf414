//! Resolved repository data
//!
//! The shape every provider returns, independent of the backend.

use chrono::{DateTime, Utc};

use crate::core::secret::Secret;

/// A file requested from the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    /// Exact path at the resolved commit
    pub path: String,
    /// Whether absence fails the run
    pub required: bool,
}

/// A file fetched from the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFile {
    /// Path as requested
    pub path: String,
    /// File content
    pub content: String,
}

/// Result of resolving a ref
#[derive(Debug, Clone)]
pub struct RepositoryInfo {
    /// Immutable commit id (git SHA, or `@<changelist>` for Perforce)
    pub commit: String,
    /// Commit timestamp
    pub commit_date: DateTime<Utc>,
    /// Access token for later steps
    pub token: Secret,
    /// Requested files that exist at the commit, in request order
    pub files: Vec<RepositoryFile>,
}
