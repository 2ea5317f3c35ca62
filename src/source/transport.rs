//! HTTP transport.
//!
//! The consumer only needs `fetch(url) -> (status, bytes)`. [`Fetch`] is
//! that seam; [`HttpFetcher`] is the reqwest implementation used in
//! production.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

/// Response of a single GET.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Only 200 counts as success.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Issues GET requests on behalf of the consumer.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, TransportError>;
}

/// reqwest-backed transport honouring the connection's socket timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent("sailor-rs");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, TransportError> {
        let transport_error = |e: reqwest::Error| TransportError {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;

        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}
