use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use bson::{Bson, Document, doc, oid::ObjectId};
use mongodb::{
    Client, Collection as MongoCollection, Database,
    error::Error as MongoError,
    options::{ClientOptions, FindOptions},
};
use std::time::Duration;
use tracing::{debug, info};

use podstore_core::{
    backend::{DocumentStream, StoreBackend, StoreConnector},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
    record::ID_FIELD,
    update::{Changes, UpdateOutcome},
};

use crate::query::MongoQueryTranslator;


/// A live connection to one MongoDB database.
///
/// Identities are generated by the driver, so documents come back with an `ObjectId`
/// in `_id` unless the caller supplied one.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: Database,
}

impl MongoDbStore {
    pub fn new(client: Client, database: &str) -> Self {
        let database = client.database(database);

        Self { client, database }
    }

    pub fn connector(dsn: &str, database: &str) -> MongoDbConnector {
        MongoDbConnector::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.database.collection(collection_name)
    }
}

fn connection_error(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Connection(err.to_string())
}

fn write_error(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Write(err.to_string())
}

fn query_error(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Query(err.to_string())
}

fn object_id(id: Bson) -> DocumentStoreResult<ObjectId> {
    match id {
        Bson::ObjectId(id) => Ok(id),
        other => Err(DocumentStoreError::InvalidDocument(format!("expected an ObjectId identity, got {other}"))),
    }
}

/// Rejects a caller-supplied `_id` that is not an `ObjectId` before anything is written.
fn check_identity(document: &Document) -> DocumentStoreResult<()> {
    match document.get(ID_FIELD) {
        None | Some(Bson::ObjectId(_)) => Ok(()),
        Some(other) => Err(DocumentStoreError::Write(format!("_id must be an ObjectId, got {other}"))),
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        Ok(())
    }

    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<ObjectId> {
        check_identity(&document)?;

        let result = self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(write_error)?;

        object_id(result.inserted_id)
    }

    async fn insert_documents(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<Vec<ObjectId>> {
        documents.iter().try_for_each(check_identity)?;

        let count = documents.len();
        let mut result = self.get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(write_error)?;

        (0..count)
            .map(|index| {
                result.inserted_ids
                    .remove(&index)
                    .ok_or_else(|| DocumentStoreError::Write(format!("no identity reported for document {index}")))
                    .and_then(object_id)
            })
            .collect()
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        query.validate()?;

        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(MongoQueryTranslator::translate_sort(sort));
        }

        self.get_collection(collection)
            .find(MongoQueryTranslator::translate_optional(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(query_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(query_error)
    }

    async fn stream_documents(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DocumentStream> {
        let cursor = self.get_collection(collection)
            .find(MongoQueryTranslator::translate(&filter)?)
            .await
            .map_err(query_error)?;

        Ok(cursor.map_err(query_error).boxed())
    }

    async fn find_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(MongoQueryTranslator::translate(&filter)?)
            .await
            .map_err(query_error)
    }

    async fn update_document(&self, filter: Expr, changes: Changes, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        changes.validate()?;

        let result = self.get_collection(collection)
            .update_one(
                MongoQueryTranslator::translate(&filter)?,
                doc! { "$set": changes.fields().clone() },
            )
            .await
            .map_err(write_error)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn replace_document(&self, filter: Expr, replacement: Document, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        let result = self.get_collection(collection)
            .replace_one(MongoQueryTranslator::translate(&filter)?, replacement)
            .await
            .map_err(write_error)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        let result = self.get_collection(collection)
            .delete_one(MongoQueryTranslator::translate(&filter)?)
            .await
            .map_err(write_error)?;

        Ok(result.deleted_count)
    }

    /// Ends the client without waiting for cursors still held by open streams.
    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().immediate(true).await;
        debug!(database = self.database.name(), "MongoDB client shut down");

        Ok(())
    }
}

/// Describes a MongoDB endpoint and opens [`MongoDbStore`] connections to it.
///
/// ```ignore
/// use podstore_mongodb::MongoDbConnector;
/// use std::time::Duration;
///
/// let connector = MongoDbConnector::new("mongodb://localhost:27017", "quickstart")
///     .with_connect_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct MongoDbConnector {
    dsn: String,
    database: String,
    connect_timeout: Option<Duration>,
}

impl MongoDbConnector {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            connect_timeout: None,
        }
    }

    /// Bounds socket connects and server selection at the driver level.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl StoreConnector for MongoDbConnector {
    type Backend = MongoDbStore;

    /// Builds a client and pings the database, so bad credentials and unreachable
    /// servers fail here rather than on the first operation.
    async fn connect(&self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(connection_error)?;

        if let Some(timeout) = self.connect_timeout {
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);
        }

        let store = MongoDbStore::new(
            Client::with_options(options).map_err(connection_error)?,
            &self.database,
        );

        store.ping().await?;
        info!(database = %self.database, "connected to MongoDB");

        Ok(store)
    }
}
