//! Main podstore crate providing a typed CRUD gateway over document stores.
//!
//! This crate is the entry point for users of podstore. It re-exports the core types
//! from the sub-crates, defines the podcast data model and gives access to the
//! storage backends.
//!
//! # Features
//!
//! - **Typed records** - Define records with Serde and let the store assign identities
//! - **Explicit connection lifecycle** - Operations fail with `NotConnected` until connected
//! - **Two read modes** - Materialize results with `find_all` or stream them with `find_stream`
//! - **Field-level updates and whole-document replacement**
//!
//! # Quick Start
//!
//! ```ignore
//! use podstore::{prelude::*, memory::InMemoryStore, podcast::{Episode, Podcast}};
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let gateway = StoreGateway::new(InMemoryStore::connector());
//!     gateway.connect().await?;
//!
//!     let podcasts = gateway.typed_collection::<Podcast>();
//!     let id = podcasts
//!         .insert_one(&Podcast::new("The Polyglot Developer Podcast", "Nic Raboy"))
//!         .await?;
//!
//!     podcasts
//!         .update_one(Filter::id(id), Changes::new().set("author", "Nicolas Roby"))
//!         .await?;
//!
//!     gateway.disconnect().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - MongoDB backend (requires the `mongodb` feature)

pub mod catalog;
pub mod podcast;
pub mod prelude;

pub use podstore_core::{backend, collection, config, error, gateway, query, record, update};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use podstore_memory::{InMemoryConnector, InMemoryStore};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use podstore_mongodb::{MongoDbConnector, MongoDbStore};
}
