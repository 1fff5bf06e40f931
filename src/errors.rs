//! Error taxonomy for the ingestion and sync engine
//!
//! Ingestion-time failures roll back fully and surface as a single
//! `EngineError` with the underlying cause attached. Remote-sync failures
//! are reported but never roll back committed local state.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level failure surfaced to callers of the sync orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The source could not be parsed as tabular data at all.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] MalformedInputError),

    /// Reserved for a future strict mode; the lenient fill-missing policy
    /// leaves no reachable producer today.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Payload would exceed the remote document size ceiling.
    #[error("payload of {size} bytes exceeds the {limit}-byte document ceiling")]
    Capacity { size: usize, limit: usize },

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Unparseable source data.
#[derive(Debug, Error)]
pub enum MalformedInputError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Network or auth failure talking to the remote document store.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context} returned status {status}: {body}")]
    Status {
        context: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("no active session; call login first")]
    NotAuthenticated,

    #[error("remote document store is not configured")]
    NotConfigured,

    #[error("unexpected response shape from {context}")]
    Malformed { context: &'static str },
}

/// Local write/read/delete failure in the file-backed store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metadata in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
