//! In-memory driver implementation.
//!
//! Documents are kept per collection in insertion order, which is the natural order returned
//! when no sort is given. Every find scans the whole collection.

use async_trait::async_trait;
use bson::Document;
use futures::StreamExt;
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

use docmodel_core::{
    driver::{DocumentStream, Driver, DriverBuilder, FindSpec},
    error::OdmResult,
};

use crate::evaluator::{DocumentEvaluator, compare_documents, project};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory driver.
///
/// Clones share the same underlying data.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryDriver;
/// use bson::doc;
///
/// let driver = InMemoryDriver::new();
/// driver.insert("samples", vec![doc! { "integer": 1 }]).await;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryDriver {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryDriver {
    /// Creates an empty driver.
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(StoreMap::new())) }
    }

    /// Creates a builder that can seed collections before the driver is used.
    pub fn builder() -> InMemoryDriverBuilder {
        InMemoryDriverBuilder::default()
    }

    /// Appends raw documents to a collection.
    pub async fn insert(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Removes every document from a collection.
    pub async fn clear(&self, collection: &str) {
        self.store.write().await.remove(collection);
    }

    /// Returns the number of documents stored in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn run(documents: &[Document], spec: &FindSpec) -> OdmResult<Vec<Document>> {
        let mut matched = Vec::new();
        for document in documents {
            if DocumentEvaluator::new(document).evaluate(&spec.filter)? {
                matched.push(document);
            }
        }

        if let Some(sort) = &spec.sort {
            matched.sort_by(|a, b| compare_documents(a, b, sort));
        }

        let skip = spec.skip.map_or(0, |n| n as usize);
        // A zero limit means no limit, as on the server.
        let limit = spec
            .limit
            .filter(|n| *n > 0)
            .map_or(usize::MAX, |n| n as usize);

        matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|document| match &spec.projection {
                Some(projection) => project(document, projection),
                None => Ok(document.clone()),
            })
            .collect()
    }
}

#[async_trait]
impl Driver for InMemoryDriver {
    async fn execute_find(&self, collection: &str, spec: FindSpec) -> OdmResult<DocumentStream> {
        if spec.session.is_some() {
            warn!(collection, "in-memory driver ignores sessions");
        }

        let results = {
            let store = self.store.read().await;
            match store.get(collection) {
                Some(documents) => Self::run(documents, &spec)?,
                None => Vec::new(),
            }
        };

        debug!(collection, returned = results.len(), "in-memory find");

        Ok(futures::stream::iter(results.into_iter().map(Ok)).boxed())
    }
}

/// Builder for [`InMemoryDriver`] instances.
///
/// ```ignore
/// let driver = InMemoryDriver::builder()
///     .collection("samples", documents)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDriverBuilder {
    seed: StoreMap,
}

impl InMemoryDriverBuilder {
    /// Seeds a collection with raw documents.
    pub fn collection(mut self, name: &str, documents: impl IntoIterator<Item = Document>) -> Self {
        self.seed
            .entry(name.to_string())
            .or_default()
            .extend(documents);
        self
    }
}

#[async_trait]
impl DriverBuilder for InMemoryDriverBuilder {
    type Driver = InMemoryDriver;

    async fn build(self) -> OdmResult<Self::Driver> {
        Ok(InMemoryDriver { store: Arc::new(RwLock::new(self.seed)) })
    }
}
