//! Field-level changes and write outcomes.

use bson::{Bson, Document};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    record::ID_FIELD,
};

/// A set of field assignments applied by an update.
///
/// Fields that are not listed keep their stored values. Updates never create a
/// document when nothing matches.
///
/// ```ignore
/// use podstore::update::Changes;
///
/// let changes = Changes::new().set("author", "Nicolas Roby");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    fields: Document,
}

impl Changes {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self { fields: Document::new() }
    }

    /// Assigns `value` to `field`. A later assignment to the same field wins.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Returns `true` if no field is assigned.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field assignments.
    pub fn fields(&self) -> &Document {
        &self.fields
    }

    /// Checks that the change set can be applied.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Write`] if nothing is assigned, a field name is
    /// empty or operator-like, or the identity field is targeted.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        if self.fields.is_empty() {
            return Err(DocumentStoreError::Write("update must assign at least one field".to_string()));
        }

        for field in self.fields.keys() {
            if field.is_empty() || field.starts_with('$') {
                return Err(DocumentStoreError::Write(format!("invalid field name in update: {field:?}")));
            }
            if field == ID_FIELD {
                return Err(DocumentStoreError::Write("the _id field is immutable".to_string()));
            }
        }

        Ok(())
    }
}

impl From<Document> for Changes {
    fn from(fields: Document) -> Self {
        Self { fields }
    }
}

/// Result of an update or replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of documents selected by the filter (0 or 1).
    pub matched_count: u64,
    /// Number of documents whose contents actually changed (0 or 1).
    pub modified_count: u64,
}
