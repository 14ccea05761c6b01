//! Main entry point binding a driver to a codec registry.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{DocumentStore, memory::InMemoryDriver};
//!
//! let store = DocumentStore::new(InMemoryDriver::new());
//! let samples = store.collection::<Sample>();
//! let first = samples.find_one([Sample::integer().gt(1)]).await?;
//! ```

use std::sync::Arc;

use crate::{
    codec::CodecRegistry,
    collection::TypedCollection,
    driver::Driver,
    error::OdmResult,
    materialize::Materializer,
    schema::Model,
};

/// A document store bound to a specific driver implementation.
///
/// The store owns the driver and the codec registry used to encode query operands and decode
/// results. Query builders borrow it, so it must outlive every query built from it.
#[derive(Debug)]
pub struct DocumentStore<D: Driver> {
    driver: D,
    materializer: Materializer,
}

impl<D: Driver> DocumentStore<D> {
    /// Creates a store with the default codecs.
    pub fn new(driver: D) -> Self {
        Self::builder(driver).build()
    }

    /// Starts configuring a store for the given driver.
    pub fn builder(driver: D) -> DocumentStoreBuilder<D> {
        DocumentStoreBuilder { driver, codecs: None }
    }

    /// Returns the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns the codecs used for operands and results.
    pub fn codecs(&self) -> &CodecRegistry {
        self.materializer.codecs()
    }

    pub(crate) fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    /// Gets the typed collection for `M`, named by [`Model::collection_name`].
    pub fn collection<M: Model>(&self) -> TypedCollection<'_, D, M> {
        TypedCollection::new(self)
    }

    /// Shuts down the store and releases driver resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to shut down.
    pub async fn shutdown(self) -> OdmResult<()> {
        self.driver.shutdown().await
    }
}

/// Builder for [`DocumentStore`].
#[derive(Debug)]
pub struct DocumentStoreBuilder<D: Driver> {
    driver: D,
    codecs: Option<CodecRegistry>,
}

impl<D: Driver> DocumentStoreBuilder<D> {
    /// Replaces the default codec registry.
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Some(codecs);
        self
    }

    /// Builds the store, using [`CodecRegistry::with_defaults`] when no registry was given.
    pub fn build(self) -> DocumentStore<D> {
        let codecs = self
            .codecs
            .unwrap_or_else(CodecRegistry::with_defaults);

        DocumentStore {
            driver: self.driver,
            materializer: Materializer::new(Arc::new(codecs)),
        }
    }
}
