//! Error types for loading and assembling configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Namespace;

pub type CoreResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML document: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate key {key:?} in {namespace}")]
    DuplicateKey { namespace: Namespace, key: String },
}
