//! Error types for the Tessera library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`TesseraError`] enum. Ingestion and malformed-query errors are surfaced to
//! the caller synchronously; query-log failures are contained by the engine
//! and never reach a search caller.

use std::io;

use thiserror::Error;

use crate::content::ContentKey;

/// The main error type for Tessera operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// A vector was supplied whose length does not match the index dimension.
    /// The offending upsert is rejected as a whole; prior state is preserved.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the index store was configured with.
        expected: usize,
        /// The dimension of the rejected vector.
        actual: usize,
    },

    /// A recommendation was requested for an item with no stored embedding.
    #[error("no embedding stored for {0}")]
    EmbeddingNotFound(ContentKey),

    /// A malformed filter predicate, rejected before any query executes.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid operation or argument.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Storage-related errors.
    #[error("storage error: {0}")]
    Storage(String),

    /// Analysis-related errors (tokenization, filtering).
    #[error("analysis error: {0}")]
    Analysis(String),

    /// Snapshot encoding/decoding errors.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Query-log failure. Contained by the engine, never propagated out of a
    /// search call.
    #[error("logging error: {0}")]
    Logging(String),

    /// I/O errors (file operations etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error.
    #[error("error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`TesseraError`].
pub type Result<T> = std::result::Result<T, TesseraError>;

impl TesseraError {
    /// Create a new invalid filter error.
    pub fn invalid_filter<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvalidFilter(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvalidOperation(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        TesseraError::Storage(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        TesseraError::Analysis(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        TesseraError::Serialization(msg.into())
    }

    /// Create a new logging error.
    pub fn logging<S: Into<String>>(msg: S) -> Self {
        TesseraError::Logging(msg.into())
    }
}
