//! Requested file parsing
//!
//! The `files` input is a `;`-separated list of `path|ENV_VAR` pairs. A path
//! ending in `!` is required: the run fails when it is absent at the
//! resolved commit.

use crate::core::repository::{FileRequest, RepositoryFile};
use crate::error::FetchError;

/// A requested file and the environment variable its content is exported to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    /// The file request passed to the provider
    pub request: FileRequest,
    /// Environment variable receiving the content
    pub env: String,
}

/// Ordered set of file mappings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMappings {
    entries: Vec<FileMapping>,
}

impl FileMappings {
    /// Parse the `files` input
    ///
    /// Entries that do not contain exactly one `|` are skipped.
    pub fn parse(input: &str) -> Self {
        let entries = input
            .split(';')
            .filter_map(|entry| {
                let mut parts = entry.split('|');
                let (path, env) = match (parts.next(), parts.next(), parts.next()) {
                    (Some(path), Some(env), None) => (path.trim(), env.trim()),
                    _ => {
                        if !entry.trim().is_empty() {
                            tracing::debug!("Ignoring malformed file entry '{}'", entry.trim());
                        }
                        return None;
                    }
                };

                let (path, required) = match path.strip_suffix('!') {
                    Some(stripped) => (stripped, true),
                    None => (path, false),
                };

                Some(FileMapping {
                    request: FileRequest {
                        path: path.to_string(),
                        required,
                    },
                    env: env.to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    /// File requests in input order
    pub fn requests(&self) -> Vec<FileRequest> {
        self.entries.iter().map(|m| m.request.clone()).collect()
    }

    /// Environment variable for a path, if requested
    pub fn env_for(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|m| m.request.path == path)
            .map(|m| m.env.as_str())
    }

    /// Number of mappings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no file was requested
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fail once, naming every required file missing from `fetched`
pub fn ensure_required(
    requests: &[FileRequest],
    fetched: &[RepositoryFile],
) -> Result<(), FetchError> {
    let missing: Vec<String> = requests
        .iter()
        .filter(|r| r.required && !fetched.iter().any(|f| f.path == r.path))
        .map(|r| r.path.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FetchError::MissingRequiredFiles { paths: missing })
    }
}
