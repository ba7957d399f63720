//! Storage backend abstraction for the gateway.
//!
//! This module defines the traits that abstract over document store drivers, so the
//! gateway works the same way against an in-memory store and a MongoDB deployment.
//!
//! # Traits
//!
//! - [`StoreBackend`]: a live connection to a store, exposing the raw document operations
//! - [`StoreConnector`]: describes an endpoint and opens [`StoreBackend`] connections to it
//!
//! # Examples
//!
//! ```ignore
//! use podstore::backend::{StoreBackend, StoreConnector};
//! use bson::doc;
//!
//! let backend = connector.connect().await?;
//! let id = backend.insert_document(doc! { "title": "Episode 1" }, "episodes").await?;
//! ```

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use futures::stream::BoxStream;
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Expr, Query},
    update::{Changes, UpdateOutcome},
};

/// A lazy, finite, single-pass sequence of stored documents.
///
/// The stream owns everything it needs, so it stays usable after the call that opened it
/// returns. Re-iterating requires issuing a fresh query.
pub type DocumentStream = BoxStream<'static, DocumentStoreResult<Document>>;

/// Abstract interface for document store connections.
///
/// # Identity
///
/// Backends generate an `ObjectId` for every inserted document that has no `_id`,
/// and reject changes to `_id` afterwards.
///
/// # Ordering
///
/// Unsorted reads return documents in the store's natural order, which for both bundled
/// backends is insertion order.
///
/// # Error Handling
///
/// Writes fail with [`DocumentStoreError::Write`](crate::error::DocumentStoreError::Write),
/// reads with [`DocumentStoreError::Query`](crate::error::DocumentStoreError::Query), and
/// [`ping`](StoreBackend::ping) with
/// [`DocumentStoreError::Connection`](crate::error::DocumentStoreError::Connection).
/// Filters are validated on every call.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Verifies that the store is reachable and accepts the configured credentials.
    async fn ping(&self) -> DocumentStoreResult<()>;

    /// Inserts a single document and returns its identity.
    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ObjectId>;

    /// Inserts documents in order and returns their identities in input order.
    ///
    /// Insertion stops at the first failure. Documents inserted before it remain stored.
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<ObjectId>>;

    /// Returns every document selected by the query, fully materialized.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Opens a lazy stream over the documents matching `filter`, in natural order.
    ///
    /// A malformed filter fails here, before any document is produced.
    async fn stream_documents(
        &self,
        filter: Expr,
        collection: &str,
    ) -> DocumentStoreResult<DocumentStream>;

    /// Returns the first document matching `filter` in natural order.
    async fn find_document(
        &self,
        filter: Expr,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Applies `changes` to the first document matching `filter`.
    async fn update_document(
        &self,
        filter: Expr,
        changes: Changes,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Replaces the contents of the first document matching `filter`, keeping its `_id`.
    async fn replace_document(
        &self,
        filter: Expr,
        replacement: Document,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Deletes the first document matching `filter` and returns the number deleted.
    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64>;

    /// Cleanly shuts down the connection, releasing all resources.
    ///
    /// The default implementation is a no-op. Backends holding network sessions should
    /// override it. Streams handed out earlier may still be alive, and shutting down
    /// must not wait for them.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory for [`StoreBackend`] connections.
///
/// A connector holds the endpoint description (connection string, database name,
/// driver options), so the gateway can reconnect after a disconnect.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Backend: StoreBackend + 'static;

    /// Opens a connection and verifies the endpoint is usable.
    async fn connect(&self) -> DocumentStoreResult<Self::Backend>;
}
