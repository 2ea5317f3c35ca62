//! Payload decoding.
//!
//! # Responsibilities
//! - Unwrap the `{"_content": "..."}` envelope of mounted config/misc files
//! - Decode config payloads into the caller's config type
//! - Decrypt secret records and decode them into the caller's secret type
//!
//! # Design Decisions
//! - Decoding is pure: bytes in, value out; committing is the caller's job
//! - Secrets are decoded from the same shape regardless of source

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::vault::{self, Kek, SecretRecord};

/// Shape of the bytes handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Wrapped in an envelope (mounted config and misc files).
    Enveloped,
    /// Decoded directly (API and fallback responses, all secrets).
    Raw,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "_content")]
    content: Option<String>,
}

/// Extract the inner text of an envelope.
pub fn unwrap_envelope(bytes: &[u8]) -> Result<String, DecodeError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    envelope.content.ok_or(DecodeError::MissingContent)
}

/// Decode a config payload into `C`.
pub fn decode_config<C: DeserializeOwned>(bytes: &[u8], shape: PayloadShape) -> Result<C, DecodeError> {
    match shape {
        PayloadShape::Enveloped => {
            let inner = unwrap_envelope(bytes)?;
            Ok(serde_json::from_str(&inner)?)
        }
        PayloadShape::Raw => Ok(serde_json::from_slice(bytes)?),
    }
}

/// Decode a misc payload; enveloped payloads yield their inner text verbatim.
pub fn decode_misc(bytes: &[u8], shape: PayloadShape) -> Result<Arc<[u8]>, DecodeError> {
    match shape {
        PayloadShape::Enveloped => Ok(Arc::from(unwrap_envelope(bytes)?.into_bytes())),
        PayloadShape::Raw => Ok(Arc::from(bytes)),
    }
}

/// Decrypt a name → record mapping and decode the plaintexts into `S`.
pub fn decode_secrets<S: DeserializeOwned>(bytes: &[u8], kek: &Kek) -> Result<S, DecodeError> {
    let records: HashMap<String, SecretRecord> = serde_json::from_slice(bytes)?;

    let mut plain = Map::with_capacity(records.len());
    for (name, record) in records {
        let value = vault::open_record(&record, kek).map_err(|source| DecodeError::Secret {
            name: name.clone(),
            source,
        })?;
        plain.insert(name, Value::String(value));
    }

    Ok(serde_json::from_value(Value::Object(plain))?)
}
