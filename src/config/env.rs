//! Environment variable names
//!
//! Credentials are read from the environment so they can be wired to CI
//! secrets without ever appearing on a command line.

/// GitHub App id
pub const GITHUB_APP_ID: &str = "PEW_GITHUB_APPID";
/// GitHub App private key (PEM)
pub const GITHUB_KEY: &str = "PEW_GITHUB_KEY";
/// Override for the GitHub API base URL
pub const GITHUB_API_URL: &str = "PEW_GITHUB_API_URL";

/// GitLab personal or project access token
pub const GITLAB_TOKEN: &str = "PEW_GITLAB_TOKEN";

/// Bitbucket user name
pub const BITBUCKET_USERNAME: &str = "PEW_BITBUCKET_USERNAME";
/// Bitbucket password or app password
pub const BITBUCKET_PASSWORD: &str = "PEW_BITBUCKET_PASSWORD";
/// Override for the Bitbucket API base URL
pub const BITBUCKET_API_URL: &str = "PEW_BITBUCKET_API_URL";

/// Perforce user
pub const P4_USER: &str = "PEW_P4USER";
/// Perforce password
pub const P4_PASS: &str = "PEW_P4PASS";
/// Client workspace whose view selects the depot paths
pub const P4_CLIENT_TEMPLATE: &str = "PEW_P4_CLIENT_TEMPLATE";
/// Trust fingerprint for `ssl:` servers
pub const P4_PORT_FINGERPRINT: &str = "PEW_P4PORT_FINGERPRINT";
/// Override for the `p4` executable
pub const P4_BINARY: &str = "PEW_P4_BINARY";

/// Location of the post-phase state record
pub const STATE_FILE: &str = "PEW_STATE_FILE";

/// GitHub Actions output file
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";
/// GitHub Actions environment file
pub const GITHUB_ENV: &str = "GITHUB_ENV";
/// Runner temp directory
pub const RUNNER_TEMP: &str = "RUNNER_TEMP";
/// Set to `true` by GitHub Actions runners
pub const GITHUB_ACTIONS: &str = "GITHUB_ACTIONS";
/// Event that triggered the workflow
pub const GITHUB_EVENT_NAME: &str = "GITHUB_EVENT_NAME";
