//! GitHub provider
//!
//! Authenticates as a GitHub App, mints an installation token scoped to the
//! requested repositories with read-only contents access, and resolves the
//! ref through the commits API. The token is revoked in the post phase.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use regex::Regex;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::config::{defaults, env, urls};
use crate::core::repository::{FileRequest, RepositoryInfo};
use crate::core::secret::Secret;
use crate::core::state::{CleanupReport, PostState};
use crate::error::{HttpError, PewError, ResolveError};
use crate::infra::http::{endpoint, path_segments, HttpClient};
use crate::provider::{
    decode_base64_content, fetch_files, lookup_var, require, EnvLookup, ProviderKind,
    SourceProvider,
};

/// GitHub REST API version header value
const API_VERSION: &str = "2022-11-28";

/// Owner and repository names a token is requested for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryScope {
    /// Owner shared by every repository
    pub owner: String,
    /// Repository the ref is resolved in
    pub name: String,
    /// Every repository the token covers, in input order
    pub names: Vec<String>,
}

/// Split `owner/name` identifiers, requiring a single owner
///
/// The first repository decides the owner and is the one the ref is
/// resolved in.
pub fn parse_repositories(repositories: &[String]) -> Result<RepositoryScope, ResolveError> {
    let first = repositories
        .first()
        .ok_or_else(|| ResolveError::InvalidRepository {
            repository: String::new(),
            reason: "no repository supplied".to_string(),
        })?;

    let (owner, name) = match first.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => {
            ((*owner).to_string(), (*name).to_string())
        }
        _ => {
            return Err(ResolveError::InvalidRepository {
                repository: first.clone(),
                reason: "expected 'owner/name'".to_string(),
            })
        }
    };

    let mut names = Vec::with_capacity(repositories.len());
    for repository in repositories {
        let parts: Vec<&str> = repository.split('/').collect();
        if parts.len() < 2 || parts[1].is_empty() {
            return Err(ResolveError::InvalidRepository {
                repository: repository.clone(),
                reason: "missing repository name".to_string(),
            });
        }
        if parts[0] != owner {
            return Err(ResolveError::InvalidRepository {
                repository: repository.clone(),
                reason: format!("not owned by the same owner as '{first}'"),
            });
        }
        names.push(parts[1].to_string());
    }

    Ok(RepositoryScope { owner, name, names })
}

/// Rewrite `N/merge` to `refs/pull/N/head` for pull request events
pub fn commit_ref(reference: &str, event_name: Option<&str>) -> String {
    if event_name != Some(defaults::GITHUB_PULL_REQUEST_EVENT) {
        return reference.to_string();
    }

    let Ok(re) = Regex::new(r"^(\d+)/merge$") else {
        return reference.to_string();
    };
    match re.captures(reference) {
        Some(caps) => format!("refs/pull/{}/head", &caps[1]),
        None => reference.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct Claims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Sign the app JWT used for app-level endpoints
pub fn app_jwt(app_id: &str, private_key: &Secret, now: DateTime<Utc>) -> Result<String, ResolveError> {
    // Keys pasted into single-line secrets arrive with literal `\n`
    let pem = if private_key.expose().contains('\n') {
        zeroize::Zeroizing::new(private_key.expose().to_string())
    } else {
        zeroize::Zeroizing::new(private_key.expose().replace("\\n", "\n"))
    };

    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| ResolveError::Authentication {
        error: format!("invalid GitHub App private key: {e}"),
    })?;

    let claims = Claims {
        iat: now.timestamp() - defaults::GITHUB_JWT_BACKDATE_SECS,
        exp: now.timestamp() + defaults::GITHUB_JWT_LIFETIME_SECS,
        iss: app_id.to_string(),
    };

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        ResolveError::Authentication {
            error: e.to_string(),
        }
    })
}

#[derive(Debug, Deserialize)]
struct App {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Installation {
    id: u64,
    #[serde(default)]
    account: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Serialize)]
struct AccessTokenRequest<'a> {
    repositories: &'a [String],
    permissions: Permissions,
}

#[derive(Debug, Serialize)]
struct Permissions {
    contents: &'static str,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    token: String,
    #[serde(default)]
    repositories: Option<Vec<TokenRepository>>,
}

#[derive(Debug, Deserialize)]
struct TokenRepository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct Commit {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    committer: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// GitHub backend
#[derive(Debug, Clone)]
pub struct GithubProvider {
    http: HttpClient,
    api_url: String,
    app_id: Option<String>,
    private_key: Option<Secret>,
    event_name: Option<String>,
}

impl GithubProvider {
    /// Configure from an environment lookup
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Self {
        Self {
            http: HttpClient::new(),
            api_url: lookup_var(lookup, env::GITHUB_API_URL)
                .unwrap_or_else(|| urls::GITHUB_API.to_string()),
            app_id: lookup_var(lookup, env::GITHUB_APP_ID),
            private_key: lookup_var(lookup, env::GITHUB_KEY).map(Secret::new),
            event_name: lookup_var(lookup, env::GITHUB_EVENT_NAME),
        }
    }

    /// Get the API base URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request(&self, method: Method, url: url::Url, bearer: &str) -> reqwest::RequestBuilder {
        self.http
            .client()
            .request(method, url)
            .bearer_auth(bearer)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Find the installation of the app on `owner`'s account
    async fn installation_id(&self, jwt: &str, owner: &str) -> Result<u64, PewError> {
        let per_page = defaults::GITHUB_INSTALLATIONS_PER_PAGE;
        let mut page = 1u32;
        loop {
            let mut url = endpoint(&self.api_url, &["app", "installations"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &per_page.to_string())
                .append_pair("page", &page.to_string());

            let installations: Vec<Installation> =
                self.http.json(self.request(Method::GET, url, jwt)).await?;

            let found = installations.iter().find(|i| {
                i.account
                    .as_ref()
                    .and_then(|a| a.login.as_deref())
                    .is_some_and(|login| login.eq_ignore_ascii_case(owner))
            });
            if let Some(installation) = found {
                return Ok(installation.id);
            }

            if installations.len() < per_page as usize {
                return Err(ResolveError::InstallationNotFound {
                    owner: owner.to_string(),
                }
                .into());
            }
            page += 1;
        }
    }

    async fn fetch_file(
        &self,
        token: &Secret,
        scope: &RepositoryScope,
        sha: &str,
        path: String,
    ) -> Result<Option<String>, PewError> {
        let mut segments = vec!["repos", scope.owner.as_str(), scope.name.as_str(), "contents"];
        segments.extend(path_segments(&path));
        let mut url = endpoint(&self.api_url, &segments)?;
        url.query_pairs_mut().append_pair("ref", sha);

        let content: Option<Content> = self
            .http
            .optional_json(self.request(Method::GET, url, token.expose()))
            .await?;

        let Some(content) = content else {
            return Ok(None);
        };
        match (content.encoding.as_deref(), content.content) {
            (Some("base64"), Some(body)) => {
                Ok(Some(decode_base64_content(&format!("GitHub file '{path}'"), &body)?))
            }
            (encoding, _) => Err(ResolveError::MalformedResponse {
                context: format!("GitHub file '{path}'"),
                error: format!("unsupported encoding {encoding:?}"),
            }
            .into()),
        }
    }
}

impl SourceProvider for GithubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
    }

    async fn resolve(
        &self,
        repositories: &[String],
        reference: &str,
        files: &[FileRequest],
        state: &mut PostState,
    ) -> Result<RepositoryInfo, PewError> {
        let app_id = require(self.app_id.as_ref(), self.kind(), env::GITHUB_APP_ID)?;
        let private_key = require(self.private_key.as_ref(), self.kind(), env::GITHUB_KEY)?;

        tracing::info!("Received repositories: {}", repositories.join(", "));
        let scope = parse_repositories(repositories)?;

        let jwt = app_jwt(&app_id, &private_key, Utc::now())?;
        let app: App = self
            .http
            .json(self.request(Method::GET, endpoint(&self.api_url, &["app"])?, &jwt))
            .await?;
        tracing::info!(
            "Authenticated as application '{}'",
            app.name.as_deref().unwrap_or("unknown")
        );

        tracing::info!("Determining installation id for owner '{}'", scope.owner);
        let installation_id = self.installation_id(&jwt, &scope.owner).await?;

        let installation_id = installation_id.to_string();
        let url = endpoint(
            &self.api_url,
            &["app", "installations", installation_id.as_str(), "access_tokens"],
        )?;
        let body = AccessTokenRequest {
            repositories: &scope.names,
            permissions: Permissions { contents: "read" },
        };
        let access: AccessToken = self
            .http
            .json(self.request(Method::POST, url, &jwt).json(&body))
            .await?;

        let token = Secret::new(access.token);
        state.github_token = Some(token.clone());

        let granted = access.repositories.map_or_else(
            || "all".to_string(),
            |repos| {
                repos
                    .iter()
                    .map(|r| r.full_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        );
        tracing::info!("Access token granted for {}", granted);

        let target = commit_ref(reference, self.event_name.as_deref());
        let url = endpoint(
            &self.api_url,
            &["repos", scope.owner.as_str(), scope.name.as_str(), "commits", target.as_str()],
        )?;
        let commit: Commit = match self
            .http
            .json(self.request(Method::GET, url, token.expose()))
            .await
        {
            Ok(commit) => commit,
            Err(HttpError::Status { status: 404 | 422, .. }) => {
                return Err(ResolveError::RefNotFound { reference: target }.into())
            }
            Err(e) => return Err(e.into()),
        };

        let commit_date = commit
            .commit
            .committer
            .and_then(|c| c.date)
            .ok_or_else(|| ResolveError::MalformedResponse {
                context: "GitHub commit".to_string(),
                error: "missing committer date".to_string(),
            })?;

        let files = fetch_files(files, |path| self.fetch_file(&token, &scope, &commit.sha, path)).await?;

        Ok(RepositoryInfo {
            commit: commit.sha,
            commit_date,
            token,
            files,
        })
    }

    async fn cleanup(&self, state: &PostState) -> CleanupReport {
        let mut report = CleanupReport::new();
        let Some(token) = &state.github_token else {
            return report;
        };

        let result = match endpoint(&self.api_url, &["installation", "token"]) {
            Ok(url) => {
                self.http
                    .empty(self.request(Method::DELETE, url, token.expose()))
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!("Revoked GitHub access token");
                report.complete("Revoked GitHub access token");
            }
            Err(e) => report.warn(format!("Failed to revoke GitHub access token: {e}")),
        }
        report
    }
}
