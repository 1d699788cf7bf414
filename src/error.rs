//! Error types for pew-resolve
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Input and configuration errors
#[derive(Error, Debug)]
pub enum InputError {
    /// Required input not supplied
    #[error("No {name} supplied")]
    MissingInput { name: String },

    /// Provider name not recognized
    #[error("Unknown provider '{name}'")]
    UnknownProvider { name: String },

    /// Credential environment variable not set
    #[error("{provider} repositories must supply `env.{variable}`")]
    MissingCredential { provider: String, variable: String },

    /// Date could not be parsed
    #[error("Invalid date '{value}': {error}")]
    InvalidDate { value: String, error: String },
}

/// Reference resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Repository identifier is malformed
    #[error("Invalid repository '{repository}': {reason}")]
    InvalidRepository { repository: String, reason: String },

    /// Provider only handles one repository
    #[error("{provider} provider only supports a single repository")]
    TooManyRepositories { provider: String },

    /// Ref not found
    #[error("Failed to find ref '{reference}'")]
    RefNotFound { reference: String },

    /// Ref matched more than one target
    #[error("Ref '{reference}' is ambiguous ({count} matches)")]
    AmbiguousRef { reference: String, count: usize },

    /// Ref syntax not supported by the provider
    #[error("Unsupported {provider} ref '{reference}'")]
    UnsupportedRef { provider: String, reference: String },

    /// No GitHub App installation for the owner
    #[error("Failed to find installation id for '{owner}'")]
    InstallationNotFound { owner: String },

    /// Perforce client view line is not `<depot> <client>`
    #[error("Malformed client view '{view}'")]
    MalformedClientView { view: String },

    /// No Perforce changelist matched the client view
    #[error("Failed to find a suitable changelist")]
    NoChangelist,

    /// Provider cannot fetch files
    #[error("{provider} provider does not support fetching files")]
    FilesUnsupported { provider: String },

    /// Upstream answered with something we could not interpret
    #[error("Malformed response from {context}: {error}")]
    MalformedResponse { context: String, error: String },

    /// Upstream reported an error in its payload
    #[error("{provider} error: {message}")]
    Upstream { provider: String, message: String },

    /// Could not produce provider credentials
    #[error("Authentication failed: {error}")]
    Authentication { error: String },
}

/// File fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Files marked required were absent at the resolved commit
    #[error("Missing required file(s): {}", paths.join(", "))]
    MissingRequiredFiles { paths: Vec<String> },
}

/// HTTP transport errors
#[derive(Error, Debug)]
pub enum HttpError {
    /// URL could not be built
    #[error("Invalid URL '{url}': {error}")]
    InvalidUrl { url: String, error: String },

    /// Request could not be sent or the body could not be read
    #[error("Network error for '{url}': {error}")]
    Request { url: String, error: String },

    /// Non-success status
    #[error("Request to '{url}' failed: HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// Body could not be decoded
    #[error("Failed to decode response from '{url}': {error}")]
    Decode { url: String, error: String },
}

impl HttpError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// External process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Executable not found
    #[error("Executable '{program}' not found in PATH")]
    NotFound { program: String },

    /// Process could not be started
    #[error("Failed to run '{program}': {error}")]
    Spawn { program: String, error: String },

    /// Process exited unsuccessfully
    #[error("{program} returned error {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// Tagged output could not be parsed
    #[error("Failed to parse output of '{program}': {error}")]
    Parse { program: String, error: String },

    /// IO error around the process (stdin files)
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Post-phase state persistence errors
#[derive(Error, Debug)]
pub enum StateError {
    /// Failed to read state file
    #[error("Failed to read state file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to write state file
    #[error("Failed to write state file '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// Failed to parse state file
    #[error("Failed to parse state file '{path}': {error}")]
    Parse { path: PathBuf, error: String },
}

/// Workflow output errors
#[derive(Error, Debug)]
pub enum OutputError {
    /// Failed to append to a workflow command file
    #[error("Failed to write '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// Value collides with the heredoc delimiter
    #[error("Value for '{name}' contains the delimiter")]
    DelimiterCollision { name: String },

    /// Failed to write to stdout
    #[error("Failed to write output: {0}")]
    Stdout(String),
}

/// Top-level pew-resolve error type
#[derive(Error, Debug)]
pub enum PewError {
    /// Input error
    #[error(transparent)]
    Input(#[from] InputError),

    /// Resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// File fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// HTTP error
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Process error
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// State error
    #[error(transparent)]
    State(#[from] StateError),

    /// Output error
    #[error(transparent)]
    Output(#[from] OutputError),
}
