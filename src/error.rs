//! Error definitions.
//!
//! `SailorError` is what callers see. `AcquireError` and `DecodeError`
//! describe why a single acquisition attempt failed; they are folded into
//! `SailorError::FallbackExhausted` at startup and only logged afterwards.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ResourceKind;
use crate::vault::VaultError;

/// Errors surfaced by the consumer and its read facade.
#[derive(Debug, Error)]
pub enum SailorError {
    #[error("no resources to manage, pass resources inside InitOptions")]
    EmptyResourceList,

    #[error("cannot connect to sailor without address, either set SAILOR_URL or pass a connection")]
    MissingAddress,

    #[error("cannot connect to sailor without namespace, either set SAILOR_NS or pass a connection")]
    MissingNamespace,

    #[error("cannot connect to sailor without app, either set SAILOR_APP or pass a connection")]
    MissingApp,

    #[error("cannot connect to sailor without access key, either set SAILOR_ACCESS_KEY or pass a connection")]
    MissingAccessKey,

    #[error("cannot connect to sailor without secret key, either set SAILOR_SECRET_KEY or pass a connection")]
    MissingSecretKey,

    #[error("invalid {kind} resource declaration: {reason}")]
    InvalidResource { kind: ResourceKind, reason: String },

    /// Primary source and fallback both failed during initial acquisition.
    #[error("cannot find {kind} resource '{name}' to serve, fallback fetch also failed: {reason}")]
    FallbackExhausted {
        kind: ResourceKind,
        name: String,
        reason: String,
    },

    #[error("configs are not loaded")]
    ConfigsNotLoaded,

    #[error("secrets are not loaded")]
    SecretsNotLoaded,

    #[error("{kind} key '{key}' not found")]
    KeyNotFound { kind: ResourceKind, key: String },

    #[error("misc resource '{0}' not found")]
    MiscNotFound(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl SailorError {
    /// True while a category has never been committed; the caller may retry later.
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, SailorError::ConfigsNotLoaded | SailorError::SecretsNotLoaded)
    }
}

/// Result type for consumer operations.
pub type Result<T> = std::result::Result<T, SailorError>;

/// Failure of the opaque `fetch(url)` capability.
#[derive(Debug, Error)]
#[error("request to {url} failed: {reason}")]
pub struct TransportError {
    pub url: String,
    pub reason: String,
}

/// Why a payload could not be turned into a snapshot value.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope has no string `_content` field")]
    MissingContent,

    #[error("secret '{name}' could not be decrypted: {source}")]
    Secret { name: String, source: VaultError },

    #[error("secret key could not be derived: {0}")]
    KeyDerivation(VaultError),
}

/// Why one acquisition attempt (primary or fallback) failed.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no fallback base address configured")]
    NoFallbackBase,
}
