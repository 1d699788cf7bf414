//! Bitbucket Cloud provider
//!
//! Looks refs up by name through the 2.0 API with HTTP basic auth. The basic
//! auth header value is handed to later steps as the token.

use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use url::Url;

use crate::config::{env, urls};
use crate::core::repository::{FileRequest, RepositoryInfo};
use crate::core::secret::Secret;
use crate::core::state::{CleanupReport, PostState};
use crate::error::{HttpError, PewError, ResolveError};
use crate::infra::http::{endpoint, path_segments, HttpClient};
use crate::provider::{
    fetch_files, lookup_var, require, single_repository, EnvLookup, ProviderKind, SourceProvider,
};

/// Workspace and repository slug parsed from a repository URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitbucketRepository {
    /// Workspace slug
    pub workspace: String,
    /// Repository slug
    pub slug: String,
}

impl BitbucketRepository {
    /// Parse `https://bitbucket.org/{workspace}/{repo}(.git)`
    pub fn parse(repository: &str) -> Result<Self, ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidRepository {
            repository: repository.to_string(),
            reason,
        };

        let url = Url::parse(repository).map_err(|e| invalid(e.to_string()))?;
        match url.path().split('/').collect::<Vec<_>>().as_slice() {
            ["", workspace, slug] if !workspace.is_empty() && !slug.is_empty() => {
                let slug = slug.strip_suffix(".git").unwrap_or(*slug);
                if slug.is_empty() {
                    return Err(invalid("missing repository slug".to_string()));
                }
                Ok(Self {
                    workspace: (*workspace).to_string(),
                    slug: slug.to_string(),
                })
            }
            _ => Err(invalid("expected '/{workspace}/{repository}'".to_string())),
        }
    }
}

/// Build the `Basic` authorization header value
pub fn basic_auth(username: &str, password: &Secret) -> Secret {
    let credentials = zeroize::Zeroizing::new(format!("{username}:{}", password.expose()));
    Secret::new(format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes())
    ))
}

/// Whether a ref could be an abbreviated or full commit hash
pub fn looks_like_commit(reference: &str) -> bool {
    (7..=40).contains(&reference.len()) && reference.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Deserialize)]
struct RefsPage {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    values: Vec<RefEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefEntry {
    target: Commit,
}

#[derive(Debug, Deserialize)]
struct Commit {
    hash: String,
    date: DateTime<Utc>,
}

/// Bitbucket backend
#[derive(Debug, Clone)]
pub struct BitbucketProvider {
    http: HttpClient,
    api_url: String,
    username: Option<String>,
    password: Option<Secret>,
}

impl BitbucketProvider {
    /// Configure from an environment lookup
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Self {
        Self {
            http: HttpClient::new(),
            api_url: lookup_var(lookup, env::BITBUCKET_API_URL)
                .unwrap_or_else(|| urls::BITBUCKET_API.to_string()),
            username: lookup_var(lookup, env::BITBUCKET_USERNAME),
            password: lookup_var(lookup, env::BITBUCKET_PASSWORD).map(Secret::new),
        }
    }

    fn repository_url(&self, repo: &BitbucketRepository, rest: &[&str]) -> Result<Url, HttpError> {
        let mut segments = vec!["2.0", "repositories", repo.workspace.as_str(), repo.slug.as_str()];
        segments.extend_from_slice(rest);
        endpoint(&self.api_url, &segments)
    }

    fn request(&self, url: Url, auth: &Secret) -> reqwest::RequestBuilder {
        self.http
            .client()
            .request(Method::GET, url)
            .header("Authorization", auth.expose())
    }

    /// Look the ref up by exact name
    async fn find_ref(
        &self,
        repo: &BitbucketRepository,
        reference: &str,
        auth: &Secret,
    ) -> Result<Option<Commit>, PewError> {
        let mut url = self.repository_url(repo, &["refs"])?;
        url.query_pairs_mut()
            .append_pair("q", &format!("name=\"{reference}\""));

        let page: RefsPage = self
            .http
            .json(self.request(url, auth))
            .await
            .map_err(upstream_error)?;
        if page.kind.as_deref() == Some("error") {
            return Err(ResolveError::Upstream {
                provider: ProviderKind::Bitbucket.display_name().to_string(),
                message: page
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "unknown error".to_string()),
            }
            .into());
        }

        let mut values = page.values;
        match values.len() {
            0 => Ok(None),
            1 => Ok(values.pop().map(|entry| entry.target)),
            count => Err(ResolveError::AmbiguousRef {
                reference: reference.to_string(),
                count,
            }
            .into()),
        }
    }

    /// Look the ref up as a commit hash
    async fn find_commit(
        &self,
        repo: &BitbucketRepository,
        reference: &str,
        auth: &Secret,
    ) -> Result<Option<Commit>, PewError> {
        let url = self.repository_url(repo, &["commit", reference])?;
        self.http
            .optional_json(self.request(url, auth))
            .await
            .map_err(upstream_error)
    }

    async fn fetch_file(
        &self,
        repo: &BitbucketRepository,
        auth: &Secret,
        sha: &str,
        path: String,
    ) -> Result<Option<String>, PewError> {
        let mut rest = vec!["src", sha];
        rest.extend(path_segments(&path));
        let url = self.repository_url(repo, &rest)?;
        Ok(self.http.optional_text(self.request(url, auth)).await?)
    }
}

/// Surface the message of a Bitbucket error payload when there is one
fn upstream_error(error: HttpError) -> PewError {
    if let HttpError::Status { body, .. } = &error {
        if let Ok(RefsPage {
            kind: Some(kind),
            error: Some(ApiError {
                message: Some(message),
            }),
            ..
        }) = serde_json::from_str::<RefsPage>(body)
        {
            if kind == "error" {
                return ResolveError::Upstream {
                    provider: ProviderKind::Bitbucket.display_name().to_string(),
                    message,
                }
                .into();
            }
        }
    }
    error.into()
}

impl SourceProvider for BitbucketProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bitbucket
    }

    async fn resolve(
        &self,
        repositories: &[String],
        reference: &str,
        files: &[FileRequest],
        _state: &mut PostState,
    ) -> Result<RepositoryInfo, PewError> {
        let username = require(self.username.as_ref(), self.kind(), env::BITBUCKET_USERNAME)?;
        let password = require(self.password.as_ref(), self.kind(), env::BITBUCKET_PASSWORD)?;
        let auth = basic_auth(&username, &password);

        let repository = single_repository(repositories, self.kind())?;
        let repo = BitbucketRepository::parse(repository)?;
        tracing::info!("Resolving '{}' in {}/{}", reference, repo.workspace, repo.slug);

        let mut commit = self.find_ref(&repo, reference, &auth).await?;
        if commit.is_none() && looks_like_commit(reference) {
            tracing::debug!("No ref named '{}', trying it as a commit", reference);
            commit = self.find_commit(&repo, reference, &auth).await?;
        }
        let commit = commit.ok_or_else(|| ResolveError::RefNotFound {
            reference: reference.to_string(),
        })?;

        let files = fetch_files(files, |path| self.fetch_file(&repo, &auth, &commit.hash, path)).await?;

        Ok(RepositoryInfo {
            commit: commit.hash,
            commit_date: commit.date,
            token: auth,
            files,
        })
    }

    async fn cleanup(&self, _state: &PostState) -> CleanupReport {
        tracing::debug!("Bitbucket credentials are not revoked");
        CleanupReport::new()
    }
}
