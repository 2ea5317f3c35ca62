//! Declaration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::InitOptions;
use crate::config::validation::{validate_connection, validate_resources};
use crate::error::SailorError;

/// Error type for declaration file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] SailorError),
}

/// Load and validate resource declarations from a TOML file.
///
/// The connection table is optional; when present it must be complete.
pub fn load_options(path: &Path) -> Result<InitOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_options(&content)
}

/// Parse and validate resource declarations from TOML text.
pub fn parse_options(content: &str) -> Result<InitOptions, ConfigError> {
    let options: InitOptions = toml::from_str(content)?;

    if let Some(conn) = &options.connection {
        validate_connection(conn)?;
    }
    validate_resources(&options.resources)?;

    Ok(options)
}
