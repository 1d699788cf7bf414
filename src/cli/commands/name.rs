//! CLI implementation for `pew-resolve name`
//!
//! Generates build names offline from a ref, commit and timestamp.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::cli::output;
use crate::core::buildname::{self, BuildDescription, BuildName};
use crate::error::InputError;

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, InputError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| InputError::InvalidDate {
            value: value.to_string(),
            error: e.to_string(),
        })
}

/// Generate names for the given inputs
pub fn generate(
    reference: &str,
    commit: &str,
    date: Option<&str>,
    run_number: &str,
) -> Result<BuildName, InputError> {
    let date = match date {
        Some(value) => parse_date(value)?,
        None => Utc::now(),
    };
    Ok(buildname::generate(
        &BuildDescription {
            reference: reference.to_string(),
            commit: commit.to_string(),
            date,
        },
        run_number,
    ))
}

/// Execute the name command
pub fn execute(reference: &str, commit: &str, date: Option<&str>, run_number: &str) -> Result<()> {
    let name = generate(reference, commit, date, run_number)?;

    if output::is_json() {
        output::print_json(&name)?;
    } else {
        println!("template: {}", name.template);
        println!("short: {}", name.short);
    }
    Ok(())
}
