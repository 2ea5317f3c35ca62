//! Consumer metrics.
//!
//! # Metrics
//! - `sailor_commits_total` (counter): snapshots published, by kind
//! - `sailor_snapshot_revision` (gauge): latest revision, by kind
//! - `sailor_acquire_failures_total` (counter): failed fetches, by kind and source
//! - `sailor_fallbacks_total` (counter): fallback attempts, by kind
//! - `sailor_reingest_failures_total` (counter): failed reloads after a file change

use crate::config::ResourceKind;

pub fn record_commit(kind: ResourceKind, revision: u64) {
    ::metrics::counter!("sailor_commits_total", "kind" => kind.as_str()).increment(1);
    ::metrics::gauge!("sailor_snapshot_revision", "kind" => kind.as_str()).set(revision as f64);
}

/// `source` is one of "primary", "fallback" or "poll".
pub fn record_acquire_failure(kind: ResourceKind, source: &'static str) {
    ::metrics::counter!(
        "sailor_acquire_failures_total",
        "kind" => kind.as_str(),
        "source" => source
    )
    .increment(1);
}

pub fn record_fallback(kind: ResourceKind) {
    ::metrics::counter!("sailor_fallbacks_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_reingest_failure(kind: ResourceKind) {
    ::metrics::counter!("sailor_reingest_failures_total", "kind" => kind.as_str()).increment(1);
}
