//! GitLab provider
//!
//! Resolves refs through the GitLab REST API v4 of whichever host the
//! repository URL points at. The configured access token doubles as the
//! output token; there is nothing to revoke afterwards.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use url::Url;

use crate::config::{env, urls};
use crate::core::repository::{FileRequest, RepositoryInfo};
use crate::core::secret::Secret;
use crate::core::state::{CleanupReport, PostState};
use crate::error::{PewError, ResolveError};
use crate::infra::http::{endpoint, HttpClient};
use crate::provider::{
    decode_base64_content, fetch_files, lookup_var, require, single_repository, EnvLookup,
    ProviderKind, SourceProvider,
};

/// GitLab host and project path parsed from a repository URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitlabProject {
    /// Scheme, host and port of the GitLab instance
    pub origin: String,
    /// `group/subgroup/project`
    pub path: String,
}

impl GitlabProject {
    /// Parse `https://host/group/project(.git)`
    pub fn parse(repository: &str) -> Result<Self, ResolveError> {
        let invalid = |reason: &str| ResolveError::InvalidRepository {
            repository: repository.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(repository).map_err(|e| invalid(&e.to_string()))?;
        if !url.has_host() {
            return Err(invalid("missing host"));
        }

        let path = url.path().trim_start_matches('/').trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        if path.is_empty() {
            return Err(invalid("missing project path"));
        }

        Ok(Self {
            origin: url.origin().ascii_serialization(),
            path: path.to_string(),
        })
    }

    /// Base of the project API, e.g. `https://host/api/v4/projects/group%2Fproject`
    fn api_segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = urls::GITLAB_API_PATH.split('/').collect();
        segments.push("projects");
        segments.push(self.path.as_str());
        segments
    }
}

#[derive(Debug, Deserialize)]
struct Commit {
    id: String,
    committed_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    content: String,
}

/// GitLab backend
#[derive(Debug, Clone)]
pub struct GitlabProvider {
    http: HttpClient,
    token: Option<Secret>,
}

impl GitlabProvider {
    /// Configure from an environment lookup
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Self {
        Self {
            http: HttpClient::new(),
            token: lookup_var(lookup, env::GITLAB_TOKEN).map(Secret::new),
        }
    }

    fn request(&self, url: Url, token: &Secret) -> reqwest::RequestBuilder {
        self.http
            .client()
            .request(Method::GET, url)
            .header("PRIVATE-TOKEN", token.expose())
    }

    async fn fetch_file(
        &self,
        token: &Secret,
        project: &GitlabProject,
        sha: &str,
        path: String,
    ) -> Result<Option<String>, PewError> {
        let mut segments = project.api_segments();
        segments.extend(["repository", "files", path.as_str()]);
        let mut url = endpoint(&project.origin, &segments)?;
        url.query_pairs_mut().append_pair("ref", sha);

        let file: Option<FileContent> = self.http.optional_json(self.request(url, token)).await?;
        match file {
            Some(file) => Ok(Some(decode_base64_content(
                &format!("GitLab file '{path}'"),
                &file.content,
            )?)),
            None => Ok(None),
        }
    }
}

impl SourceProvider for GitlabProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gitlab
    }

    async fn resolve(
        &self,
        repositories: &[String],
        reference: &str,
        files: &[FileRequest],
        _state: &mut PostState,
    ) -> Result<RepositoryInfo, PewError> {
        let token = require(self.token.as_ref(), self.kind(), env::GITLAB_TOKEN)?;
        let repository = single_repository(repositories, self.kind())?;
        let project = GitlabProject::parse(repository)?;
        tracing::info!("Resolving '{}' in {}/{}", reference, project.origin, project.path);

        let mut segments = project.api_segments();
        segments.extend(["repository", "commits"]);
        let mut url = endpoint(&project.origin, &segments)?;
        url.query_pairs_mut()
            .append_pair("ref_name", reference)
            .append_pair("per_page", "1");

        let commits: Vec<Commit> = self.http.json(self.request(url, &token)).await?;
        let commit = match <[Commit; 1]>::try_from(commits) {
            Ok([commit]) => commit,
            Err(_) => {
                return Err(ResolveError::RefNotFound {
                    reference: reference.to_string(),
                }
                .into())
            }
        };

        let files =
            fetch_files(files, |path| self.fetch_file(&token, &project, &commit.id, path)).await?;

        Ok(RepositoryInfo {
            commit: commit.id,
            commit_date: commit.committed_date,
            token,
            files,
        })
    }

    async fn cleanup(&self, _state: &PostState) -> CleanupReport {
        tracing::debug!("GitLab access tokens are not revoked");
        CleanupReport::new()
    }
}
