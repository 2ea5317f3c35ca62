//! Preset resource declarations.
//!
//! Volume presets read from [`DEFAULT_MOUNT_PATH`]; pull presets refresh
//! every [`DEFAULT_PULL_INTERVAL`]. All of them enable the fallback.

use crate::config::schema::{
    FetchStrategy, ResourceKind, ResourceOption, DEFAULT_MOUNT_PATH, DEFAULT_PULL_INTERVAL,
};

/// Config map mounted into the pod, watched for changes.
pub fn config_map_default() -> ResourceOption {
    ResourceOption::new(ResourceKind::Config, FetchStrategy::Volume)
        .at_path(DEFAULT_MOUNT_PATH)
        .with_fallback()
}

/// Secrets mounted into the pod, watched for changes.
pub fn secrets_default() -> ResourceOption {
    ResourceOption::new(ResourceKind::Secret, FetchStrategy::Volume)
        .at_path(DEFAULT_MOUNT_PATH)
        .with_fallback()
}

/// Misc resource pulled from Sailor exactly once.
pub fn misc_once_default(name: impl Into<String>) -> ResourceOption {
    ResourceOption::new(ResourceKind::Misc, FetchStrategy::Pull)
        .named(name)
        .once()
        .with_fallback()
}

/// Config pulled from Sailor and refreshed periodically.
pub fn config_pull_default() -> ResourceOption {
    ResourceOption::new(ResourceKind::Config, FetchStrategy::Pull)
        .every(DEFAULT_PULL_INTERVAL)
        .with_fallback()
}

/// Secrets pulled from Sailor and refreshed periodically.
pub fn secrets_pull_default() -> ResourceOption {
    ResourceOption::new(ResourceKind::Secret, FetchStrategy::Pull)
        .every(DEFAULT_PULL_INTERVAL)
        .with_fallback()
}

/// Misc resource pulled from Sailor and refreshed periodically.
pub fn misc_pull_default(name: impl Into<String>) -> ResourceOption {
    ResourceOption::new(ResourceKind::Misc, FetchStrategy::Pull)
        .named(name)
        .every(DEFAULT_PULL_INTERVAL)
        .with_fallback()
}
