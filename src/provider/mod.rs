//! Source providers
//!
//! Resolves a ref to an immutable commit on one of a fixed set of backends.
//!
//! - [`github`] - GitHub, authenticated as a GitHub App
//! - [`gitlab`] - GitLab, authenticated with an access token
//! - [`bitbucket`] - Bitbucket Cloud, authenticated with basic auth
//! - [`perforce`] - Perforce Helix Core, through the `p4` command line

pub mod bitbucket;
pub mod github;
pub mod gitlab;
pub mod perforce;

use base64::Engine;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;

use crate::config::defaults;
use crate::core::repository::{FileRequest, RepositoryFile, RepositoryInfo};
use crate::core::state::{CleanupReport, PostState};
use crate::error::{InputError, PewError, ResolveError};

pub use bitbucket::BitbucketProvider;
pub use github::GithubProvider;
pub use gitlab::GitlabProvider;
pub use perforce::PerforceProvider;

/// Environment lookup used to read provider settings and credentials
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// GitHub
    Github,
    /// GitLab
    Gitlab,
    /// Bitbucket Cloud
    Bitbucket,
    /// Perforce Helix Core
    Perforce,
}

impl ProviderKind {
    /// All providers
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Github,
        ProviderKind::Gitlab,
        ProviderKind::Bitbucket,
        ProviderKind::Perforce,
    ];

    /// Input value selecting this provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::Perforce => "perforce",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Gitlab => "GitLab",
            Self::Bitbucket => "Bitbucket",
            Self::Perforce => "Perforce",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| InputError::UnknownProvider {
                name: s.to_string(),
            })
    }
}

/// Capability shared by every backend
#[allow(async_fn_in_trait)]
pub trait SourceProvider {
    /// Which backend this is
    fn kind(&self) -> ProviderKind;

    /// Resolve `reference` and fetch the requested files at the commit
    ///
    /// Credentials are recorded into `state` as soon as they are acquired.
    async fn resolve(
        &self,
        repositories: &[String],
        reference: &str,
        files: &[FileRequest],
        state: &mut PostState,
    ) -> Result<RepositoryInfo, PewError>;

    /// Undo what `resolve` recorded; failures become report warnings
    async fn cleanup(&self, state: &PostState) -> CleanupReport;
}

/// A configured backend
#[derive(Debug)]
pub enum Provider {
    /// GitHub
    Github(GithubProvider),
    /// GitLab
    Gitlab(GitlabProvider),
    /// Bitbucket
    Bitbucket(BitbucketProvider),
    /// Perforce
    Perforce(PerforceProvider),
}

impl Provider {
    /// Configure a provider from an environment lookup
    ///
    /// Missing credentials are reported by `resolve`, so a provider built
    /// for cleanup only needs none.
    pub fn from_lookup(kind: ProviderKind, lookup: EnvLookup<'_>) -> Self {
        match kind {
            ProviderKind::Github => Self::Github(GithubProvider::from_lookup(lookup)),
            ProviderKind::Gitlab => Self::Gitlab(GitlabProvider::from_lookup(lookup)),
            ProviderKind::Bitbucket => Self::Bitbucket(BitbucketProvider::from_lookup(lookup)),
            ProviderKind::Perforce => Self::Perforce(PerforceProvider::from_lookup(lookup)),
        }
    }

    /// Configure a provider from the process environment
    pub fn from_env(kind: ProviderKind) -> Self {
        Self::from_lookup(kind, &|name: &str| std::env::var(name).ok())
    }
}

impl SourceProvider for Provider {
    fn kind(&self) -> ProviderKind {
        match self {
            Self::Github(p) => p.kind(),
            Self::Gitlab(p) => p.kind(),
            Self::Bitbucket(p) => p.kind(),
            Self::Perforce(p) => p.kind(),
        }
    }

    async fn resolve(
        &self,
        repositories: &[String],
        reference: &str,
        files: &[FileRequest],
        state: &mut PostState,
    ) -> Result<RepositoryInfo, PewError> {
        match self {
            Self::Github(p) => p.resolve(repositories, reference, files, state).await,
            Self::Gitlab(p) => p.resolve(repositories, reference, files, state).await,
            Self::Bitbucket(p) => p.resolve(repositories, reference, files, state).await,
            Self::Perforce(p) => p.resolve(repositories, reference, files, state).await,
        }
    }

    async fn cleanup(&self, state: &PostState) -> CleanupReport {
        match self {
            Self::Github(p) => p.cleanup(state).await,
            Self::Gitlab(p) => p.cleanup(state).await,
            Self::Bitbucket(p) => p.cleanup(state).await,
            Self::Perforce(p) => p.cleanup(state).await,
        }
    }
}

/// Read a non-empty variable
pub(crate) fn lookup_var(lookup: EnvLookup<'_>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

/// Unwrap a credential read at construction time
pub(crate) fn require<T: Clone>(
    value: Option<&T>,
    provider: ProviderKind,
    variable: &str,
) -> Result<T, InputError> {
    value.cloned().ok_or_else(|| InputError::MissingCredential {
        provider: provider.display_name().to_string(),
        variable: variable.to_string(),
    })
}

/// Reject more than one repository
pub(crate) fn single_repository(
    repositories: &[String],
    provider: ProviderKind,
) -> Result<&str, PewError> {
    match repositories {
        [] => Err(InputError::MissingInput {
            name: "repository".to_string(),
        }
        .into()),
        [one] => Ok(one.as_str()),
        _ => Err(ResolveError::TooManyRepositories {
            provider: provider.display_name().to_string(),
        }
        .into()),
    }
}

/// Fetch files concurrently, reporting in request order
///
/// `fetch` returns `Ok(None)` for a file that does not exist. The first
/// error in request order is returned.
pub(crate) async fn fetch_files<F, Fut>(
    files: &[FileRequest],
    fetch: F,
) -> Result<Vec<RepositoryFile>, PewError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Option<String>, PewError>>,
{
    let results: Vec<(String, Result<Option<String>, PewError>)> =
        futures::stream::iter(files.iter().map(|file| {
            let path = file.path.clone();
            let pending = fetch(path.clone());
            async move { (path, pending.await) }
        }))
        .buffered(defaults::MAX_PARALLEL_FETCHES)
        .collect()
        .await;

    let mut fetched = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(Some(content)) => fetched.push(RepositoryFile { path, content }),
            Ok(None) => tracing::info!("File '{}' not found at the resolved commit", path),
            Err(e) => {
                tracing::error!("Failed to get file '{}'", path);
                return Err(e);
            }
        }
    }
    Ok(fetched)
}

/// Decode a base64 file body as returned by the GitHub and GitLab APIs
pub(crate) fn decode_base64_content(context: &str, content: &str) -> Result<String, ResolveError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| ResolveError::MalformedResponse {
            context: context.to_string(),
            error: e.to_string(),
        })
}
