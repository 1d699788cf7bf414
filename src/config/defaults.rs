//! Default configuration values

/// Build name template.
///
/// `{project-name}`, `{platform}` and `{configuration}` are left in place for
/// downstream consumers to fill in.
pub const BUILD_NAME_TEMPLATE: &str =
    "{project-name}-{datetime}-{hash}-{shortname}+{platform}+{configuration}+{branch}";

/// Number of commit characters kept in the `{hash}` segment
pub const SHORT_HASH_LEN: usize = 7;

/// Maximum number of concurrent file fetches per provider
pub const MAX_PARALLEL_FETCHES: usize = 4;

/// HTTP connect timeout (in seconds)
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 30;

/// HTTP request timeout (in seconds)
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;

/// User agent sent with every API request
pub const USER_AGENT: &str = concat!("pew-resolve/", env!("CARGO_PKG_VERSION"));

/// GitHub App JWT lifetime (GitHub rejects anything over 10 minutes)
pub const GITHUB_JWT_LIFETIME_SECS: i64 = 9 * 60;

/// Backdate applied to the JWT `iat` claim to absorb clock drift
pub const GITHUB_JWT_BACKDATE_SECS: i64 = 60;

/// Page size used when listing GitHub App installations
pub const GITHUB_INSTALLATIONS_PER_PAGE: u32 = 100;

/// Event name under which `N/merge` refs are rewritten to the PR head
pub const GITHUB_PULL_REQUEST_EVENT: &str = "pull_request";

/// Default `p4` executable name
#[cfg(windows)]
pub const P4_BINARY: &str = "p4.exe";

/// Default `p4` executable name
#[cfg(not(windows))]
pub const P4_BINARY: &str = "p4";

/// Token reported for Perforce, whose ticket stays in the runner's ticket store
pub const PERFORCE_TOKEN_MARKER: &str = "p4ticket";

/// File name of the post-phase state record
pub const STATE_FILE_NAME: &str = "pew-resolve-state.json";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;

/// Commit the binary was built from, as recorded by the build script
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};
