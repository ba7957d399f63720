//! Core traits for typed records and their conversion to the store's native documents.
//!
//! A record is a plain serde type that lives in exactly one collection. Its identity
//! is assigned by the store on insert, so records carry it as an optional field that
//! is left unset before the first write.

use bson::{
    Document,
    de::deserialize_from_document,
    oid::ObjectId,
    ser::serialize_to_document,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::DocumentStoreResult;

/// Name of the identity field in every stored document.
pub const ID_FIELD: &str = "_id";

/// Core trait that all records stored through the gateway must implement.
///
/// The identity field must serialize as `_id` and be skipped when unset, so the store
/// can generate it:
///
/// ```ignore
/// use podstore::record::Record;
/// use bson::oid::ObjectId;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Show {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     pub id: Option<ObjectId>,
///     pub name: String,
/// }
///
/// impl Record for Show {
///     fn id(&self) -> Option<&ObjectId> {
///         self.id.as_ref()
///     }
///
///     fn collection_name() -> &'static str {
///         "shows"
///     }
/// }
/// ```
pub trait Record: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns the store-assigned identity, or `None` if the record was never stored.
    fn id(&self) -> Option<&ObjectId>;

    /// Returns the name of the collection this record belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait providing conversion utilities for records.
///
/// Automatically implemented for every [`Record`].
pub trait RecordExt: Record {
    /// Converts this record into a BSON document for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not serialize to a document.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Creates a record from a stored BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;

    /// Converts this record to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a record from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        Ok(serialize_to_document(self)?)
    }

    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_document(document)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}
