//! MongoDB backend implementation for podstore.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait,
//! storing documents in a MongoDB database and running filters, sorts and windows in
//! MongoDB's query engine.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! podstore = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! A [`MongoDbConnector`] holds the connection string and database name. The gateway
//! uses it to open a [`MongoDbStore`], which pings the server before it is handed out.
//!
//! # Example
//!
//! ```ignore
//! use podstore::{gateway::StoreGateway, mongodb::MongoDbConnector};
//!
//! let gateway = StoreGateway::new(MongoDbConnector::new("mongodb://localhost:27017", "quickstart"));
//! gateway.connect().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as podstore_mongodb;

pub mod store;
mod query;

pub use store::{MongoDbConnector, MongoDbStore};
