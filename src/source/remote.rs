//! Remote-pull source.

use crate::config::{ConnectionOptions, ResourceKind};
use crate::error::AcquireError;
use crate::source::transport::Fetch;

/// API URL of a resource for the connection's namespace and app.
pub fn resource_url(conn: &ConnectionOptions, kind: ResourceKind, name: &str) -> String {
    let base = format!(
        "{}/api/v1/resource/{}/{}/{}",
        conn.base_address(),
        conn.namespace,
        conn.app,
        kind
    );
    match kind {
        ResourceKind::Misc => format!("{}/{}", base, name),
        _ => base,
    }
}

/// GET a URL; anything but a 200 is a failure.
pub async fn pull(fetcher: &dyn Fetch, url: &str) -> Result<Vec<u8>, AcquireError> {
    let response = fetcher.fetch(url).await?;
    if !response.is_ok() {
        return Err(AcquireError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }
    Ok(response.body)
}
