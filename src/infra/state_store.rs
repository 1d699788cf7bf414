//! Post-phase state persistence
//!
//! The run phase writes the [`PostState`] record to a file only the current
//! user can read; the post phase reads it back and deletes it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{defaults, env};
use crate::core::state::PostState;
use crate::error::StateError;

/// File-backed store for the post-phase state
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store at an explicit path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default state file location
    ///
    /// `$RUNNER_TEMP` when running inside Actions, the system temp
    /// directory otherwise.
    pub fn default_path() -> PathBuf {
        std::env::var_os(env::RUNNER_TEMP)
            .filter(|v| !v.is_empty())
            .map_or_else(std::env::temp_dir, PathBuf::from)
            .join(defaults::STATE_FILE_NAME)
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the state, replacing any previous record
    pub fn save(&self, state: &PostState) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(state).map_err(|e| StateError::Write {
            path: self.path.clone(),
            error: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StateError::Write {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| StateError::Write {
            path: self.path.clone(),
            error: e.to_string(),
        })?;
        file.write_all(&json).map_err(|e| StateError::Write {
            path: self.path.clone(),
            error: e.to_string(),
        })?;

        tracing::debug!("Saved post state to {}", self.path.display());
        Ok(())
    }

    /// Read the state, `None` when no run phase left one
    pub fn load(&self) -> Result<Option<PostState>, StateError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    error: e.to_string(),
                })
            }
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| StateError::Parse {
                path: self.path.clone(),
                error: e.to_string(),
            })
    }

    /// Delete the state file if present
    pub fn remove(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::Write {
                path: self.path.clone(),
                error: e.to_string(),
            }),
        }
    }
}
