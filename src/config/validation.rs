//! Declaration validation.
//!
//! # Responsibilities
//! - Reject connections with missing identity fields, reporting the first
//!   missing field in a fixed precedence: address, namespace, app, access
//!   key, secret key
//! - Reject empty resource lists and misc resources without a name
//! - Reject a kind (and misc name) declared twice; both would share one
//!   snapshot slot and one watched file name
//!
//! # Design Decisions
//! - Returns the first error only, so callers can match on a specific variant
//! - Runs before any resource is acquired

use std::collections::HashSet;

use crate::config::schema::{ConnectionOptions, FetchStrategy, ResourceKind, ResourceOption};
use crate::error::{Result, SailorError};

/// Check that every identity field of the connection is present.
pub fn validate_connection(conn: &ConnectionOptions) -> Result<()> {
    if conn.addr.is_empty() {
        return Err(SailorError::MissingAddress);
    }
    if conn.namespace.is_empty() {
        return Err(SailorError::MissingNamespace);
    }
    if conn.app.is_empty() {
        return Err(SailorError::MissingApp);
    }
    if conn.access_key.is_empty() {
        return Err(SailorError::MissingAccessKey);
    }
    if conn.secret_key.is_empty() {
        return Err(SailorError::MissingSecretKey);
    }
    Ok(())
}

/// Check the declared resources.
pub fn validate_resources(resources: &[ResourceOption]) -> Result<()> {
    if resources.is_empty() {
        return Err(SailorError::EmptyResourceList);
    }

    let mut seen = HashSet::new();
    for res in resources {
        if res.kind == ResourceKind::Misc && res.name.is_empty() {
            return Err(SailorError::InvalidResource {
                kind: res.kind,
                reason: "misc resources need a name".into(),
            });
        }
        if res.fetch == FetchStrategy::Volume && res.path.is_empty() {
            return Err(SailorError::InvalidResource {
                kind: res.kind,
                reason: "volume resources need a mount path".into(),
            });
        }
        if !seen.insert((res.kind, res.label())) {
            return Err(SailorError::InvalidResource {
                kind: res.kind,
                reason: format!("'{}' is declared more than once", res.label()),
            });
        }
    }
    Ok(())
}
