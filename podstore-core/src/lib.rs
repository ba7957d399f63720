//! A typed CRUD gateway over BSON document stores.
//!
//! This crate is the core of the podstore project and provides:
//!
//! - **Record traits** ([`record`]) - Typed records and their conversion to BSON documents
//! - **Store backend abstraction** ([`backend`]) - Traits for plugging in document store drivers
//! - **Filters and queries** ([`query`]) - Filter expressions, sorting and windowing
//! - **Field changes** ([`update`]) - Field-level updates and write outcomes
//! - **Gateway** ([`gateway`]) - Connection lifecycle and deadlines
//! - **Collections** ([`collection`]) - Insert, find, update, replace and delete operations
//! - **Configuration** ([`config`]) - Connect and operation deadlines
//! - **Error handling** ([`error`]) - The error taxonomy shared by all backends
//!
//! # Example
//!
//! ```ignore
//! use podstore::{gateway::StoreGateway, memory::InMemoryStore, query::Filter};
//!
//! let gateway = StoreGateway::new(InMemoryStore::connector());
//! gateway.connect().await?;
//!
//! let episodes = gateway.typed_collection::<Episode>();
//! let short = episodes.find_all(Filter::eq("duration", 25)).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as podstore_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod gateway;
pub mod query;
pub mod record;
pub mod update;
