//! Typed query building and result materialization for MongoDB document models.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Schemas** ([`schema`]) - Field descriptors, primary keys and typed field expressions
//! - **Predicates** ([`predicate`]) - Immutable filter trees built from field comparisons
//! - **Query compiler** ([`compile`]) - Translation of predicates into native filter documents
//! - **Sorting** ([`sort`]) - Sort keys parsed from strings, fields and dynamic values
//! - **Projections** ([`projection`]) - Projection documents derived from output types
//! - **Codecs** ([`codec`]) - Per-field value codecs and the registry that holds them
//! - **Materializer** ([`materialize`]) - Decoding raw documents into typed values
//! - **Drivers** ([`driver`]) - The trait implemented by database backends
//! - **Find queries** ([`find`]) - Chainable `FindMany` / `FindOne` builders
//! - **Collections and stores** ([`collection`], [`store`]) - Typed entry points
//! - **Error handling** ([`error`]) - The crate error type and result alias
//!
//! # Example
//!
//! ```ignore
//! use docmodel::prelude::*;
//! use bson::oid::ObjectId;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Schema)]
//! #[docmodel(collection = "samples", key = ObjectId)]
//! pub struct Sample {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub string: String,
//!     pub integer: i64,
//! }
//!
//! let samples = store.collection::<Sample>();
//! let found = samples
//!     .find_many([Sample::integer().gt(1)])
//!     .sort(-Sample::integer())?
//!     .to_list()
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub use bson;

pub mod codec;
pub mod collection;
pub mod compile;
pub mod driver;
pub mod error;
pub mod find;
pub mod materialize;
pub mod predicate;
pub mod projection;
pub mod schema;
pub mod session;
pub mod sort;
pub mod store;
