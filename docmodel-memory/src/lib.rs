//! In-memory driver for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `Driver` trait. It
//! evaluates compiled filter documents directly and is meant for development and tests.
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{DocumentStore, memory::InMemoryDriver};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = InMemoryDriver::builder()
//!         .collection("samples", vec![doc! { "string": "test_0", "integer": 0 }])
//!         .build()
//!         .await?;
//!
//!     let store = DocumentStore::new(driver);
//!     let samples = store.collection::<Sample>().find_all().to_list().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod driver;
mod evaluator;

pub use driver::{InMemoryDriver, InMemoryDriverBuilder};
