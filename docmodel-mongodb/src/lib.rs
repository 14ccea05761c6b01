//! MongoDB driver for docmodel.
//!
//! This crate implements the `Driver` trait on top of the official `mongodb` crate. Filters,
//! sort and projection documents compiled by the query layer are passed to the server as-is.
//!
//! To use this driver, enable the `mongodb` feature of the facade crate:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Sessions
//!
//! [`MongoDbDriver::start_session`] returns an opaque session handle that can be attached to
//! any query with `set_session`. Queries sharing a session fetch their batches one at a time.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{DocumentStore, driver::DriverBuilder, mongodb::MongoDbDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = MongoDbDriver::builder("mongodb://localhost:27017", "my_database")
//!         .app_name("my-service")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(driver);
//!
//!     let session = store.driver().start_session().await?;
//!     let samples = store
//!         .collection::<Sample>()
//!         .find_all()
//!         .set_session(session)
//!         .to_list()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod driver;

pub use driver::{MongoDbDriver, MongoDbDriverBuilder, MongoSession};
