//! Upstream API base URLs

/// GitHub REST API
pub const GITHUB_API: &str = "https://api.github.com";

/// Bitbucket Cloud REST API
pub const BITBUCKET_API: &str = "https://api.bitbucket.org";

/// Path of the GitLab REST API relative to the instance origin
pub const GITLAB_API_PATH: &str = "api/v4";
