//! Error types and result types for gateway operations.
//!
//! Every failure a backend can produce is mapped onto one of the variants of
//! [`DocumentStoreError`]. Use [`DocumentStoreResult<T>`] as the return type for
//! fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::time::Duration;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
///
/// Store-level failures are grouped by the kind of operation that produced them
/// (connect, write, read) so callers can decide retry or abort policy per kind.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The endpoint was unreachable, credentials were rejected, or connecting timed out.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A data operation was attempted while the gateway is disconnected.
    #[error("Not connected to a document store")]
    NotConnected,
    /// An insert, update, replace or delete was rejected by the store.
    #[error("Write error: {0}")]
    Write(String),
    /// A filter or sort expression was malformed, or a read failed.
    #[error("Query error: {0}")]
    Query(String),
    /// A single-record lookup matched zero records in the named collection.
    #[error("No matching document in collection {0}")]
    NotFound(String),
    /// The operation did not complete within its deadline and was abandoned.
    #[error("Operation {operation} timed out after {timeout:?}")]
    Timeout {
        /// Name of the abandoned operation.
        operation: &'static str,
        /// The deadline that was exceeded.
        timeout: Duration,
    },
    /// Serialization/deserialization error when converting between record formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The record or a stored document has an unexpected structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl DocumentStoreError {
    /// Returns `true` if this error signals that a lookup matched nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::NotFound(_))
    }
}

/// A specialized `Result` type for gateway operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
