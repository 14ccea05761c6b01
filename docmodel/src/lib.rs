//! Main docmodel crate providing typed models and a composable query builder for MongoDB.
//!
//! This crate is the primary entry point for users of the docmodel framework. It re-exports the
//! core types and functionality from the sub-crates and provides access to the drivers.
//!
//! # Features
//!
//! - **Typed models** - Derive a schema from a Serde struct with `#[derive(Schema)]`
//! - **Predicates, not booleans** - Field comparisons build filter trees that compile to native
//!   MongoDB filter documents
//! - **Chainable queries** - Filters merge across calls; skip, limit and sort overwrite
//! - **Projections** - Decode results into smaller or reshaped types
//! - **Custom codecs** - Per-field value conversion applied to both results and query operands
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryDriver};
//! use bson::oid::ObjectId;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Schema)]
//! #[docmodel(collection = "samples")]
//! pub struct Sample {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub string: String,
//!     pub integer: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> OdmResult<()> {
//!     let store = DocumentStore::new(InMemoryDriver::builder().build().await?);
//!     let samples = store.collection::<Sample>();
//!
//!     // Filters given to repeated calls are AND-ed together
//!     let query = samples
//!         .find_many([Sample::integer().gt(1)])
//!         .find_many([Sample::string().ne("test_3")])
//!         .sort(-Sample::integer())?
//!         .limit(10)?;
//!
//!     println!("filter: {}", query.get_filter_query()?);
//!
//!     for sample in query.to_list().await? {
//!         println!("{:?}", sample);
//!     }
//!
//!     // Single-result queries resolve to `None` when nothing matches
//!     let missing = samples.find_one([Sample::integer().gt(100)]).await?;
//!     assert!(missing.is_none());
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! The derive expands to `docmodel_core` paths, so crates using it depend on `docmodel-core`
//! alongside this crate.
//!
//! # Drivers
//!
//! - [`memory`] - In-process driver for development and testing
//! - [`mongodb`] - MongoDB driver (requires `mongodb` feature)

pub mod prelude;

pub use docmodel_core::{
    codec, collection, compile, driver, error, find, materialize, predicate, projection, schema,
    session, sort, store,
};
pub use docmodel_macros::Schema;

// Re-export BSON types for convenience
pub use bson;

/// In-memory driver implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryDriver, InMemoryDriverBuilder};
}

/// MongoDB driver implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbDriver, MongoDbDriverBuilder, MongoSession};
}
