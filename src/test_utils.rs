//! Test utilities
//!
//! Proptest generators and an in-memory [`OutputSink`].

use crate::core::secret::Secret;
use crate::error::OutputError;
use crate::infra::workflow::OutputSink;

/// Sink recording everything it is given
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Outputs in the order they were set, secrets included
    pub outputs: Vec<(String, String)>,
    /// Masked secret values, each recorded once
    pub masked: Vec<String>,
    /// Exported environment variables
    pub exports: Vec<(String, String)>,
    /// Warning annotations
    pub warnings: Vec<String>,
}

impl RecordingSink {
    /// Get the value of an output by name
    pub fn output(&self, name: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl OutputSink for RecordingSink {
    fn set_output(&mut self, name: &str, value: &str) -> Result<(), OutputError> {
        self.outputs.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_secret_output(&mut self, name: &str, value: &Secret) -> Result<(), OutputError> {
        self.mask(value)?;
        self.set_output(name, value.expose())
    }

    fn export_variable(&mut self, name: &str, value: &str) -> Result<(), OutputError> {
        self.exports.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn mask(&mut self, secret: &Secret) -> Result<(), OutputError> {
        let value = secret.expose().to_string();
        if !self.masked.contains(&value) {
            self.masked.push(value);
        }
        Ok(())
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

pub mod generators {
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    /// Generate a full git commit hash (40 hex characters, either case)
    pub fn commit_hash() -> impl Strategy<Value = String> {
        "[0-9a-fA-F]{40}"
    }

    /// Generate a branch, tag or pull request ref
    pub fn git_ref() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z][a-z0-9-]{0,20}",
            "[a-z]{1,10}/[a-z0-9-]{1,20}",
            "v[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}",
            "[0-9]{1,5}/merge",
        ]
    }

    /// Generate a CI run number
    pub fn run_number() -> impl Strategy<Value = String> {
        (1u32..100_000).prop_map(|n| n.to_string())
    }

    /// Generate a UTC timestamp between 2000 and 2099, whole seconds
    pub fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        (946_684_800i64..4_102_444_799).prop_map(|secs| {
            Utc.timestamp_opt(secs, 0)
                .single()
                .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap())
        })
    }
}
