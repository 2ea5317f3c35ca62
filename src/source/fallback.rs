//! Fallback resolver.
//!
//! Used once per failed initial acquisition, never by background refreshes.

use crate::config::ResourceKind;
use crate::error::AcquireError;
use crate::source::remote::pull;
use crate::source::transport::Fetch;

/// Secondary origin configured from `SAILOR_FALLBACK_BASE_URL`.
#[derive(Debug, Clone, Default)]
pub struct FallbackResolver {
    base: Option<String>,
}

impl FallbackResolver {
    pub fn new(base: Option<String>) -> Self {
        let base = base
            .map(|b| b.trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());
        Self { base }
    }

    pub fn is_configured(&self) -> bool {
        self.base.is_some()
    }

    /// Fallback URL for an app's resource kind, if a base is configured.
    pub fn url(&self, app: &str, kind: ResourceKind) -> Option<String> {
        self.base
            .as_ref()
            .map(|base| format!("{}/{}-{}.sailor.fall", base, app, kind))
    }

    /// Fetch the fallback payload.
    pub async fn resolve(
        &self,
        fetcher: &dyn Fetch,
        app: &str,
        kind: ResourceKind,
    ) -> Result<Vec<u8>, AcquireError> {
        let url = self.url(app, kind).ok_or(AcquireError::NoFallbackBase)?;
        tracing::info!(kind = %kind, url = %url, "Fetching resource from fallback");
        pull(fetcher, &url).await
    }
}
