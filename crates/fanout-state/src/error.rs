//! Error types for store access, encoding, and publishing.

use fanout_core::{ConfigError, Namespace};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;
pub type CodecResult<T> = Result<T, CodecError>;
pub type PublishResult<T> = Result<T, PublishError>;
pub type ReadResult<T> = Result<T, ReadError>;

/// Failures talking to a key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to {addr}: {message}")]
    Connect { addr: String, message: String },

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("failed to select database {db}: {message}")]
    SelectDb { db: u32, message: String },

    #[error("connection closed by peer")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    #[error("transaction aborted by server")]
    Aborted,

    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),
}

/// A table entry could not be turned into (or out of) its stored value.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode {namespace} entry {key:?}: {source}")]
    Encode {
        namespace: Namespace,
        key: String,
        source: serde_json::Error,
    },

    #[error("failed to decode {namespace} field {key:?}: {source}")]
    Decode {
        namespace: Namespace,
        key: String,
        source: serde_json::Error,
    },
}

impl CodecError {
    pub fn namespace(&self) -> Namespace {
        match self {
            CodecError::Encode { namespace, .. } | CodecError::Decode { namespace, .. } => {
                *namespace
            }
        }
    }
}

/// A table publish stopped part way. Tables published before it stay published.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error("failed to clear {namespace}: {source}")]
    Clear {
        namespace: Namespace,
        source: StoreError,
    },

    #[error("failed to write {namespace} field {field:?}: {source}")]
    Write {
        namespace: Namespace,
        field: String,
        source: StoreError,
    },

    #[error("failed to replace {namespace}: {source}")]
    Replace {
        namespace: Namespace,
        source: StoreError,
    },
}

impl PublishError {
    /// Namespace whose publish failed.
    pub fn namespace(&self) -> Namespace {
        match self {
            PublishError::Encode(err) => err.namespace(),
            PublishError::Clear { namespace, .. }
            | PublishError::Write { namespace, .. }
            | PublishError::Replace { namespace, .. } => *namespace,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {namespace}: {source}")]
    Store {
        namespace: Namespace,
        source: StoreError,
    },

    #[error(transparent)]
    Decode(#[from] CodecError),

    #[error(transparent)]
    Table(#[from] ConfigError),
}
