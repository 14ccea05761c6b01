//! Driver abstraction for executing compiled find queries.
//!
//! The query layer never talks to a database directly. It compiles a [`FindSpec`] and hands it
//! to a [`Driver`], which returns raw documents. Drivers are built through a
//! [`DriverBuilder`] so connection settings stay with the backend crate.
//!
//! # Cursor lifetime
//!
//! [`Driver::execute_find`] returns a lazy [`DocumentStream`]. The backing cursor belongs to
//! the stream: dropping the stream before it is exhausted releases the cursor.

use async_trait::async_trait;
use bson::Document;
use futures::{StreamExt, stream::BoxStream};
use std::fmt::Debug;

use crate::{error::OdmResult, session::Session};

/// A lazy stream of raw documents.
pub type DocumentStream = BoxStream<'static, OdmResult<Document>>;

/// Everything a driver needs to run one find.
#[derive(Debug, Clone, Default)]
pub struct FindSpec {
    /// Compiled filter document.
    pub filter: Document,
    /// Native sort document, `None` for natural order.
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    /// Projection document, `None` to fetch whole documents.
    pub projection: Option<Document>,
    pub session: Option<Session>,
}

/// Executes find operations against a collection.
///
/// Implementations must be thread-safe; the builders holding a driver reference may be moved
/// between tasks.
#[async_trait]
pub trait Driver: Send + Sync + Debug {
    /// Issues a find and returns a lazy stream over the matching documents.
    ///
    /// # Errors
    ///
    /// Returns a [`OdmError`](crate::error::OdmError) if the find could not be started. Errors
    /// while pulling later batches are yielded by the stream.
    async fn execute_find(&self, collection: &str, spec: FindSpec) -> OdmResult<DocumentStream>;

    /// Returns the first matching document, or `None`.
    ///
    /// The default implementation runs [`Driver::execute_find`] with a limit of one.
    async fn execute_find_one(
        &self,
        collection: &str,
        spec: FindSpec,
    ) -> OdmResult<Option<Document>> {
        let mut stream = self
            .execute_find(collection, FindSpec { limit: Some(1), ..spec })
            .await?;

        stream.next().await.transpose()
    }

    /// Releases driver resources.
    async fn shutdown(self) -> OdmResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<D> Driver for &D
where
    D: Driver,
{
    async fn execute_find(&self, collection: &str, spec: FindSpec) -> OdmResult<DocumentStream> {
        (*self)
            .execute_find(collection, spec)
            .await
    }

    async fn execute_find_one(
        &self,
        collection: &str,
        spec: FindSpec,
    ) -> OdmResult<Option<Document>> {
        (*self)
            .execute_find_one(collection, spec)
            .await
    }
}

/// Factory for driver instances.
#[async_trait]
pub trait DriverBuilder {
    type Driver: Driver;

    async fn build(self) -> OdmResult<Self::Driver>;
}
