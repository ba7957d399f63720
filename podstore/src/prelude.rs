//! Convenient re-exports of commonly used types from podstore.
//!
//! ```ignore
//! use podstore::prelude::*;
//! ```

pub use podstore_core::{
    backend::{DocumentStream, StoreBackend, StoreConnector},
    collection::{Collection, RecordStream, TypedCollection},
    config::{GatewayConfig, GatewayConfigBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    gateway::{ConnectionState, StoreGateway},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    record::{Record, RecordExt},
    update::{Changes, UpdateOutcome},
};

pub use crate::catalog::PodcastCatalog;
