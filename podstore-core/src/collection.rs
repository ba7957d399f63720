//! Collection handles for gateway operations.
//!
//! - [`Collection`] works with raw BSON documents
//! - [`TypedCollection`] converts to and from a [`Record`] type
//!
//! Both borrow their [`StoreGateway`] and check its connection state on every call.
//!
//! # Example
//!
//! ```ignore
//! use podstore::query::{Filter, SortDirection};
//!
//! let episodes = gateway.typed_collection::<Episode>();
//! let ids = episodes.insert_many(&[first, second]).await?;
//!
//! let long = episodes
//!     .find_sorted(Filter::gt("duration", 22), "duration", SortDirection::Desc)
//!     .await?;
//! ```

use bson::{Document, oid::ObjectId};
use futures::{StreamExt, stream::BoxStream};
use std::marker::PhantomData;
use tracing::debug;

use crate::{
    backend::{DocumentStream, StoreBackend, StoreConnector},
    error::{DocumentStoreError, DocumentStoreResult},
    gateway::StoreGateway,
    query::{Expr, Filter, Query, SortDirection},
    record::{Record, RecordExt},
    update::{Changes, UpdateOutcome},
};

/// A lazy, single-pass sequence of typed records.
pub type RecordStream<R> = BoxStream<'static, DocumentStoreResult<R>>;

/// An untyped collection.
///
/// Documents are plain BSON, so optional fields can be added or left out freely.
pub struct Collection<'a, C: StoreConnector> {
    name: String,
    gateway: &'a StoreGateway<C>,
}

impl<'a, C: StoreConnector> Collection<'a, C> {
    /// Creates a new collection reference (internal use).
    pub(crate) fn new(name: String, gateway: &'a StoreGateway<C>) -> Self {
        Self { name, gateway }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a document and returns the identity the store assigned to it.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Write`] on constraint violation or connection loss.
    pub async fn insert_one(&self, document: Document) -> DocumentStoreResult<ObjectId> {
        let state = self.gateway.state.read().await;
        let backend = state.backend()?;

        let id = self
            .gateway
            .bounded("insert_one", backend.insert_document(document, &self.name))
            .await?;

        debug!(collection = %self.name, %id, "inserted document");
        Ok(id)
    }

    /// Inserts documents in order and returns their identities in the same order.
    ///
    /// If the store rejects a document, the ones before it stay inserted.
    pub async fn insert_many(&self, documents: Vec<Document>) -> DocumentStoreResult<Vec<ObjectId>> {
        let state = self.gateway.state.read().await;
        let backend = state.backend()?;

        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self
            .gateway
            .bounded("insert_many", backend.insert_documents(documents, &self.name))
            .await?;

        debug!(collection = %self.name, count = ids.len(), "inserted documents");
        Ok(ids)
    }

    /// Returns every document matching `filter`, materialized in natural order.
    ///
    /// Intended for small result sets. Use [`find_stream`](Self::find_stream) otherwise.
    pub async fn find_all(&self, filter: Expr) -> DocumentStoreResult<Vec<Document>> {
        self.query(Query::filtered(filter)).await
    }

    /// Opens a lazy stream over the documents matching `filter`.
    ///
    /// The stream is finite and single-pass. Iterating again needs a new call.
    /// Opening it and every later pull are each held to the operation deadline.
    pub async fn find_stream(&self, filter: Expr) -> DocumentStoreResult<DocumentStream> {
        let state = self.gateway.state.read().await;
        let backend = state.backend()?;

        let stream = self
            .gateway
            .bounded("find_stream", backend.stream_documents(filter, &self.name))
            .await?;

        debug!(collection = %self.name, "opened document stream");
        Ok(self.gateway.bounded_stream("find_stream", stream))
    }

    /// Returns the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NotFound`] if nothing matches.
    pub async fn find_one(&self, filter: Expr) -> DocumentStoreResult<Document> {
        let state = self.gateway.state.read().await;
        let backend = state.backend()?;

        self.gateway
            .bounded("find_one", backend.find_document(filter, &self.name))
            .await?
            .ok_or_else(|| DocumentStoreError::NotFound(self.name.clone()))
    }

    /// Returns the document with the given identity.
    pub async fn get(&self, id: ObjectId) -> DocumentStoreResult<Document> {
        self.find_one(Filter::id(id)).await
    }

    /// Returns the documents matching `filter`, ordered by `field`.
    ///
    /// Documents with equal keys come back in an order the store chooses.
    pub async fn find_sorted(
        &self,
        filter: Expr,
        field: &str,
        direction: SortDirection,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.query(
            Query::builder()
                .filter(filter)
                .sort(field, direction)
                .build(),
        )
        .await
    }

    /// Runs a structured query and returns the selected documents.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let state = self.gateway.state.read().await;
        let backend = state.backend()?;

        let documents = self
            .gateway
            .bounded("query", backend.query_documents(query, &self.name))
            .await?;

        debug!(collection = %self.name, count = documents.len(), "queried documents");
        Ok(documents)
    }

    /// Applies `changes` to the first document matching `filter`.
    ///
    /// Matching nothing is not an error: the outcome reports zero counts.
    pub async fn update_one(&self, filter: Expr, changes: Changes) -> DocumentStoreResult<UpdateOutcome> {
        let state = self.gateway.state.read().await;
        let backend = state.backend()?;

        let outcome = self
            .gateway
            .bounded("update_one", backend.update_document(filter, changes, &self.name))
            .await?;

        debug!(
            collection = %self.name,
            matched = outcome.matched_count,
            modified = outcome.modified_count,
            "updated document"
        );
        Ok(outcome)
    }

    /// Replaces the first document matching `filter` with `replacement`.
    ///
    /// Fields absent from `replacement` are dropped. The identity is kept.
    pub async fn replace_one(&self, filter: Expr, replacement: Document) -> DocumentStoreResult<UpdateOutcome> {
        let state = self.gateway.state.read().await;
        let backend = state.backend()?;

        let outcome = self
            .gateway
            .bounded("replace_one", backend.replace_document(filter, replacement, &self.name))
            .await?;

        debug!(
            collection = %self.name,
            matched = outcome.matched_count,
            modified = outcome.modified_count,
            "replaced document"
        );
        Ok(outcome)
    }

    /// Deletes the first document matching `filter` and returns how many were deleted.
    pub async fn delete_one(&self, filter: Expr) -> DocumentStoreResult<u64> {
        let state = self.gateway.state.read().await;
        let backend = state.backend()?;

        let deleted = self
            .gateway
            .bounded("delete_one", backend.delete_document(filter, &self.name))
            .await?;

        debug!(collection = %self.name, deleted, "deleted document");
        Ok(deleted)
    }
}

/// A collection bound to a [`Record`] type.
pub struct TypedCollection<'a, C: StoreConnector, R: Record> {
    inner: Collection<'a, C>,
    _marker: PhantomData<R>,
}

impl<'a, C: StoreConnector, R: Record> TypedCollection<'a, C, R> {
    pub(crate) fn new(inner: Collection<'a, C>) -> Self {
        Self { inner, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the untyped view of this collection.
    pub fn untyped(&self) -> &Collection<'a, C> {
        &self.inner
    }

    /// Inserts a record and returns the identity the store assigned to it.
    pub async fn insert_one(&self, record: &R) -> DocumentStoreResult<ObjectId> {
        self.inner.insert_one(record.to_document()?).await
    }

    /// Inserts records in order and returns their identities in the same order.
    pub async fn insert_many(&self, records: &[R]) -> DocumentStoreResult<Vec<ObjectId>> {
        self.inner
            .insert_many(
                records
                    .iter()
                    .map(RecordExt::to_document)
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            )
            .await
    }

    /// Returns every record matching `filter`, materialized in natural order.
    pub async fn find_all(&self, filter: Expr) -> DocumentStoreResult<Vec<R>> {
        decode_all(self.inner.find_all(filter).await?)
    }

    /// Opens a lazy stream over the records matching `filter`.
    pub async fn find_stream(&self, filter: Expr) -> DocumentStoreResult<RecordStream<R>> {
        Ok(self
            .inner
            .find_stream(filter)
            .await?
            .map(|document| document.and_then(R::from_document))
            .boxed())
    }

    /// Returns the first record matching `filter`, or [`DocumentStoreError::NotFound`].
    pub async fn find_one(&self, filter: Expr) -> DocumentStoreResult<R> {
        R::from_document(self.inner.find_one(filter).await?)
    }

    /// Returns the record with the given identity, or [`DocumentStoreError::NotFound`].
    pub async fn get(&self, id: ObjectId) -> DocumentStoreResult<R> {
        R::from_document(self.inner.get(id).await?)
    }

    /// Returns the records matching `filter`, ordered by `field`.
    pub async fn find_sorted(
        &self,
        filter: Expr,
        field: &str,
        direction: SortDirection,
    ) -> DocumentStoreResult<Vec<R>> {
        decode_all(self.inner.find_sorted(filter, field, direction).await?)
    }

    /// Runs a structured query and returns the selected records.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<R>> {
        decode_all(self.inner.query(query).await?)
    }

    /// Applies `changes` to the first record matching `filter`.
    pub async fn update_one(&self, filter: Expr, changes: Changes) -> DocumentStoreResult<UpdateOutcome> {
        self.inner.update_one(filter, changes).await
    }

    /// Replaces the first record matching `filter` with `record`.
    pub async fn replace_one(&self, filter: Expr, record: &R) -> DocumentStoreResult<UpdateOutcome> {
        self.inner.replace_one(filter, record.to_document()?).await
    }

    /// Deletes the first record matching `filter` and returns how many were deleted.
    pub async fn delete_one(&self, filter: Expr) -> DocumentStoreResult<u64> {
        self.inner.delete_one(filter).await
    }
}

fn decode_all<R: Record>(documents: Vec<Document>) -> DocumentStoreResult<Vec<R>> {
    documents
        .into_iter()
        .map(R::from_document)
        .collect()
}
