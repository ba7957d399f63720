//! In-memory storage implementation for document stores.
//!
//! Documents are kept per collection in insertion order, so unsorted reads behave like
//! a freshly populated MongoDB collection.

use std::{collections::{BTreeMap, HashMap}, sync::Arc};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};

use podstore_core::{
    backend::{DocumentStream, StoreBackend, StoreConnector},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, SortDirection},
    record::ID_FIELD,
    update::{Changes, UpdateOutcome},
};

use crate::evaluator::{Comparable, DocumentEvaluator};

/// Documents of one collection, keyed by insertion sequence.
#[derive(Debug, Default)]
struct CollectionData {
    next_seq: u64,
    documents: BTreeMap<u64, Document>,
}

impl CollectionData {
    fn contains_id(&self, id: &ObjectId) -> bool {
        self.documents
            .values()
            .any(|document| matches!(document.get(ID_FIELD), Some(Bson::ObjectId(existing)) if existing == id))
    }

    /// Sequence key of the first document matching `filter`.
    fn first_match(&self, filter: &Expr) -> DocumentStoreResult<Option<u64>> {
        for (seq, document) in &self.documents {
            if DocumentEvaluator::matches(document, filter)? {
                return Ok(Some(*seq));
            }
        }

        Ok(None)
    }

    fn push(&mut self, document: Document, collection: &str) -> DocumentStoreResult<ObjectId> {
        let (id, document) = match document.get(ID_FIELD) {
            Some(Bson::ObjectId(id)) => (*id, document),
            Some(other) => {
                return Err(DocumentStoreError::Write(format!("_id must be an ObjectId, got {other}")));
            }
            None => {
                let id = ObjectId::new();
                let document = std::iter::once((ID_FIELD.to_string(), Bson::ObjectId(id)))
                    .chain(document)
                    .collect::<Document>();

                (id, document)
            }
        };

        if self.contains_id(&id) {
            return Err(DocumentStoreError::Write(format!("duplicate _id {id} in collection {collection}")));
        }

        self.documents.insert(self.next_seq, document);
        self.next_seq += 1;

        Ok(id)
    }
}

type StoreMap = HashMap<String, CollectionData>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Clones share
/// the same data, which is how a gateway sees its documents again after reconnecting
/// through the same [`InMemoryConnector`].
///
/// Queries scan every document in a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use podstore_memory::InMemoryStore;
/// use podstore::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_document(doc! { "title": "Episode 1" }, "episodes").await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(StoreMap::new())) }
    }

    /// Creates a connector over a new, empty store.
    pub fn connector() -> InMemoryConnector {
        InMemoryConnector::default()
    }

    /// Returns the number of documents stored in `collection`.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, |data| data.documents.len())
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        Ok(())
    }

    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<ObjectId> {
        let mut store = self.store.write().await;

        store
            .entry(collection.to_string())
            .or_default()
            .push(document, collection)
    }

    async fn insert_documents(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<Vec<ObjectId>> {
        let mut store = self.store.write().await;
        let data = store
            .entry(collection.to_string())
            .or_default();

        let mut ids = Vec::with_capacity(documents.len());

        for document in documents {
            ids.push(data.push(document, collection)?);
        }

        Ok(ids)
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        query.validate()?;

        let store = self.store.read().await;
        let Some(data) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut documents = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(data.documents.values(), filter)?,
            None => data.documents.values().cloned().collect::<Vec<_>>(),
        };

        if let Some(sort) = &query.sort {
            // Stable, so equal keys keep their natural order.
            documents.sort_by(|a, b| {
                let left = Comparable::sort_key(a.get(&sort.field));
                let right = Comparable::sort_key(b.get(&sort.field));

                match sort.direction {
                    SortDirection::Asc => left.sort_cmp(&right),
                    SortDirection::Desc => right.sort_cmp(&left),
                }
            });
        }

        Ok(
            documents
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                // A zero limit means no limit, as with MongoDB.
                .take(query.limit.filter(|limit| *limit > 0).unwrap_or(usize::MAX))
                .collect()
        )
    }

    async fn stream_documents(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DocumentStream> {
        filter.validate()?;

        let store = Arc::clone(&self.store);
        let collection = collection.to_string();

        // Each step resumes after the last yielded sequence key, so writes made while
        // the stream is open never cause a document to be produced twice.
        let documents = stream::try_unfold(0u64, move |next_seq| {
            let store = Arc::clone(&store);
            let collection = collection.clone();
            let filter = filter.clone();

            async move {
                let guard = store.read().await;
                let Some(data) = guard.get(&collection) else {
                    return Ok(None);
                };

                for (seq, document) in data.documents.range(next_seq..) {
                    if DocumentEvaluator::matches(document, &filter)? {
                        return Ok(Some((document.clone(), seq + 1)));
                    }
                }

                Ok::<_, DocumentStoreError>(None)
            }
        });

        Ok(documents.boxed())
    }

    async fn find_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<Option<Document>> {
        filter.validate()?;

        let store = self.store.read().await;
        let Some(data) = store.get(collection) else {
            return Ok(None);
        };

        Ok(
            data.first_match(&filter)?
                .and_then(|seq| data.documents.get(&seq))
                .cloned()
        )
    }

    async fn update_document(&self, filter: Expr, changes: Changes, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        filter.validate()?;
        changes.validate()?;

        let mut store = self.store.write().await;
        let Some(data) = store.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };
        let Some(seq) = data.first_match(&filter)? else {
            return Ok(UpdateOutcome::default());
        };
        let Some(document) = data.documents.get_mut(&seq) else {
            return Ok(UpdateOutcome::default());
        };

        let mut modified = false;

        for (field, value) in changes.fields() {
            if document.get(field) != Some(value) {
                document.insert(field.clone(), value.clone());
                modified = true;
            }
        }

        Ok(UpdateOutcome { matched_count: 1, modified_count: modified as u64 })
    }

    async fn replace_document(&self, filter: Expr, replacement: Document, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        filter.validate()?;

        if let Some(field) = replacement.keys().find(|field| field.starts_with('$')) {
            return Err(DocumentStoreError::Write(format!("invalid field name in replacement: {field:?}")));
        }

        let mut store = self.store.write().await;
        let Some(data) = store.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };
        let Some(seq) = data.first_match(&filter)? else {
            return Ok(UpdateOutcome::default());
        };
        let Some(document) = data.documents.get_mut(&seq) else {
            return Ok(UpdateOutcome::default());
        };

        let id = document
            .get(ID_FIELD)
            .cloned()
            .ok_or_else(|| DocumentStoreError::InvalidDocument(format!("stored document in {collection} has no _id")))?;

        if let Some(new_id) = replacement.get(ID_FIELD) {
            if *new_id != id {
                return Err(DocumentStoreError::Write("the _id field is immutable".to_string()));
            }
        }

        let replaced = std::iter::once((ID_FIELD.to_string(), id))
            .chain(replacement.into_iter().filter(|(field, _)| field != ID_FIELD))
            .collect::<Document>();
        let modified = replaced != *document;

        *document = replaced;

        Ok(UpdateOutcome { matched_count: 1, modified_count: modified as u64 })
    }

    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        filter.validate()?;

        let mut store = self.store.write().await;
        let Some(data) = store.get_mut(collection) else {
            return Ok(0);
        };

        match data.first_match(&filter)? {
            Some(seq) => Ok(data.documents.remove(&seq).map_or(0, |_| 1)),
            None => Ok(0),
        }
    }
}


/// Opens connections to an [`InMemoryStore`].
///
/// Every connection shares the connector's store, so data survives a
/// disconnect and reconnect cycle.
///
/// # Example
///
/// ```ignore
/// use podstore_memory::InMemoryStore;
/// use podstore::gateway::StoreGateway;
///
/// let gateway = StoreGateway::new(InMemoryStore::connector());
/// gateway.connect().await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    store: InMemoryStore,
}

impl InMemoryConnector {
    /// Creates a connector over a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector over an existing store.
    pub fn with_store(store: InMemoryStore) -> Self {
        Self { store }
    }

    /// Returns the store connections are opened to.
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    type Backend = InMemoryStore;

    async fn connect(&self) -> DocumentStoreResult<Self::Backend> {
        Ok(self.store.clone())
    }
}
