//! Poll loop for pull resources.
//!
//! Re-fetches the same URL every interval for the lifetime of the process.
//! Failures are logged and retried after the same interval; the fallback
//! is never consulted after startup.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::{FetchStrategy, ResourceOption};
use crate::consumer::{shape_for, Decodable, Shared};
use crate::error::AcquireError;
use crate::observability::metrics;
use crate::source::remote;

pub(crate) struct PollLoop<C, S> {
    shared: Arc<Shared<C, S>>,
    resource: ResourceOption,
    url: String,
}

impl<C: Decodable, S: Decodable> PollLoop<C, S> {
    pub(crate) fn new(shared: Arc<Shared<C, S>>, resource: ResourceOption, url: String) -> Self {
        Self { shared, resource, url }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The initial fetch already happened, so every round starts with a sleep.
    async fn run(self) {
        let interval = self.resource.pull_interval();
        tracing::info!(
            kind = %self.resource.kind,
            name = %self.resource.label(),
            interval_ms = interval.as_millis() as u64,
            "Starting resource poll loop"
        );

        loop {
            sleep(interval).await;

            match self.poll_once().await {
                Ok(revision) => {
                    tracing::debug!(kind = %self.resource.kind, name = %self.resource.label(), revision, "Resource refreshed");
                }
                Err(e) => {
                    metrics::record_acquire_failure(self.resource.kind, "poll");
                    tracing::warn!(
                        kind = %self.resource.kind,
                        name = %self.resource.label(),
                        error = %e,
                        retry_in = ?interval,
                        "Failed to refresh resource, keeping current snapshot"
                    );
                }
            }
        }
    }

    async fn poll_once(&self) -> Result<u64, AcquireError> {
        let bytes = remote::pull(self.shared.fetcher(), &self.url).await?;
        let shape = shape_for(self.resource.kind, FetchStrategy::Pull);
        Ok(self
            .shared
            .ingest(self.resource.kind, &self.resource.name, &bytes, shape)?)
    }
}
