//! Build name generation
//!
//! Derives a templated long name and a short, memorable name from a resolved
//! commit. Both are pure functions of the ref, commit, timestamp and run
//! number, so any two machines naming the same build agree without
//! coordination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::defaults::{BUILD_NAME_TEMPLATE, SHORT_HASH_LEN};
use crate::core::wordlist;

/// What a build is named after
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescription {
    /// Ref the build was requested for
    pub reference: String,
    /// Resolved commit id
    pub commit: String,
    /// Timestamp the name is stamped with (UTC)
    pub date: DateTime<Utc>,
}

/// Generated build names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildName {
    /// Template with datetime, hash, shortname and branch filled in
    pub template: String,
    /// Short name (`MMDD` + word)
    pub short: String,
    /// Timestamp the name was derived from
    pub time: DateTime<Utc>,
    /// Ref the build was requested for
    #[serde(rename = "ref")]
    pub reference: String,
    /// Resolved commit id
    pub commit: String,
    /// Build identifier, same as `short`
    pub build: String,
}

/// Generate the build names for a description and run number
pub fn generate(desc: &BuildDescription, run_number: &str) -> BuildName {
    let long = long_date(&desc.date);
    let short_date = short_date(&desc.date);
    let hash = short_hash(&desc.commit);
    let numbered_branch = format!("{}{run_number}", desc.reference);

    let partial = BUILD_NAME_TEMPLATE
        .replacen("{datetime}", &long, 1)
        .replacen("{hash}", &hash, 1)
        .replacen("{branch}", &numbered_branch, 1);

    let short = format!("{short_date}{}", wordlist::select_word(&partial));
    let template = partial.replacen("{shortname}", &short, 1);

    BuildName {
        template,
        short: short.clone(),
        time: desc.date,
        reference: desc.reference.clone(),
        commit: desc.commit.clone(),
        build: short,
    }
}

/// `YYMMDD-HHMMSS` in UTC
pub fn long_date(date: &DateTime<Utc>) -> String {
    date.format("%y%m%d-%H%M%S").to_string()
}

/// `MMDD` in UTC
pub fn short_date(date: &DateTime<Utc>) -> String {
    date.format("%m%d").to_string()
}

/// First seven characters of the commit, lower-cased
pub fn short_hash(commit: &str) -> String {
    commit
        .chars()
        .take(SHORT_HASH_LEN)
        .collect::<String>()
        .to_lowercase()
}
