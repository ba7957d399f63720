//! In-memory document storage backend for podstore.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! tests and demos that should not need a running database.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion order** - Unsorted reads return documents in the order they were stored
//! - **Full filter support** - Every filter operator, sorting and windowing
//! - **Lazy streams** - Matching documents are produced one at a time
//!
//! # Quick Start
//!
//! ```ignore
//! use podstore::{gateway::StoreGateway, memory::InMemoryStore, query::Filter};
//!
//! let gateway = StoreGateway::new(InMemoryStore::connector());
//! gateway.connect().await?;
//!
//! let podcasts = gateway.typed_collection::<Podcast>();
//! let id = podcasts.insert_one(&podcast).await?;
//! let stored = podcasts.get(id).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as podstore_memory;

mod evaluator;
pub mod store;

pub use store::{InMemoryConnector, InMemoryStore};
