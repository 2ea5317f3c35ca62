//! Two-tier secret encryption.
//!
//! Each secret is encrypted with its own data-encryption-key (DEK). The DEK
//! is encrypted with a key-encryption-key (KEK) derived from the
//! connection's secret key, salted with its access key.
//!
//! # Format
//! Ciphertexts are base64 of `nonce (12 bytes) || AES-256-GCM ciphertext`.
//!
//! # Security
//! - Key material is never logged; `Debug` output is redacted
//! - Decrypted plaintext only lives in the in-memory snapshot

use std::fmt;

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of both key tiers in bytes.
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

/// Errors raised while deriving keys or opening ciphertexts.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid ciphertext encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("ciphertext shorter than its nonce")]
    Truncated,

    #[error("decryption failed, wrong key pair or tampered data")]
    Decrypt,

    #[error("encryption failed")]
    Encrypt,

    #[error("data key has length {0}, expected 32")]
    KeyLength(usize),

    #[error("decrypted secret is not valid UTF-8")]
    Utf8,
}

/// Encrypted secret as stored on disk and served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecretRecord {
    #[serde(rename = "encryptedSecret", alias = "encrypted_secret")]
    pub encrypted_secret: String,

    #[serde(rename = "encryptedDEK", alias = "encrypted_dek")]
    pub encrypted_dek: String,
}

/// Key-encryption-key derived from connection credentials.
#[derive(Clone)]
pub struct Kek([u8; KEY_LEN]);

/// Per-secret data-encryption-key.
pub struct Dek([u8; KEY_LEN]);

impl fmt::Debug for Kek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Kek(..)")
    }
}

impl fmt::Debug for Dek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dek(..)")
    }
}

/// Derive the KEK with Argon2id, using SHA-256 of the access key as salt.
pub fn derive_kek(secret_key: &str, access_key: &[u8]) -> Result<Kek, VaultError> {
    let salt = Sha256::digest(access_key);
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(secret_key.as_bytes(), &salt, &mut key)
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
    Ok(Kek(key))
}

/// Open an encrypted DEK with the KEK.
pub fn decrypt_dek(encrypted_dek: &str, kek: &Kek) -> Result<Dek, VaultError> {
    let raw = open(&kek.0, encrypted_dek)?;
    let key: [u8; KEY_LEN] = raw
        .as_slice()
        .try_into()
        .map_err(|_| VaultError::KeyLength(raw.len()))?;
    Ok(Dek(key))
}

/// Open a secret payload with its DEK.
pub fn decrypt_with_dek(encrypted_secret: &str, dek: &Dek) -> Result<String, VaultError> {
    let raw = open(&dek.0, encrypted_secret)?;
    String::from_utf8(raw).map_err(|_| VaultError::Utf8)
}

/// Open a full record: DEK first, then the payload.
pub fn open_record(record: &SecretRecord, kek: &Kek) -> Result<String, VaultError> {
    let dek = decrypt_dek(&record.encrypted_dek, kek)?;
    decrypt_with_dek(&record.encrypted_secret, &dek)
}

/// Encrypt a plaintext under a fresh DEK, sealing the DEK with the KEK.
pub fn seal_secret(plaintext: &str, kek: &Kek) -> Result<SecretRecord, VaultError> {
    let mut dek = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut dek);

    Ok(SecretRecord {
        encrypted_secret: seal(&dek, plaintext.as_bytes())?,
        encrypted_dek: seal(&kek.0, &dek)?,
    })
}

fn seal(key: &[u8], plaintext: &[u8]) -> Result<String, VaultError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::KeyLength(key.len()))?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), plaintext)
        .map_err(|_| VaultError::Encrypt)?;

    let mut data = nonce.to_vec();
    data.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(data))
}

fn open(key: &[u8], encoded: &str) -> Result<Vec<u8>, VaultError> {
    let data = STANDARD.decode(encoded)?;
    if data.len() < NONCE_LEN {
        return Err(VaultError::Truncated);
    }

    let (nonce, ciphertext) = data.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::KeyLength(key.len()))?;
    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::Decrypt)
}
