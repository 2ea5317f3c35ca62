//! Mounted-path source.
//!
//! Files live directly inside the mount directory and are named
//! `<app>-config`, `<app>-secret` and `<app>-<name>-misc`.

use std::path::{Path, PathBuf};

use crate::config::{ResourceKind, ResourceOption};
use crate::error::AcquireError;

/// File name of a resource inside its mount directory.
pub fn file_name(app: &str, kind: ResourceKind, name: &str) -> String {
    match kind {
        ResourceKind::Misc => format!("{}-{}-misc", app, name),
        _ => format!("{}-{}", app, kind),
    }
}

/// Full path of a declared resource.
pub fn resource_path(res: &ResourceOption, app: &str) -> PathBuf {
    Path::new(&res.path).join(file_name(app, res.kind, &res.name))
}

/// Read the resource file.
pub async fn read(path: &Path) -> Result<Vec<u8>, AcquireError> {
    tokio::fs::read(path).await.map_err(|source| AcquireError::Io {
        path: path.to_path_buf(),
        source,
    })
}
