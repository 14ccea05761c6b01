use async_trait::async_trait;
use bson::Document;
use futures::{StreamExt, TryStreamExt, stream};
use mea::mutex::Mutex;
use mongodb::{
    Client, ClientSession, Collection as MongoCollection, SessionCursor,
    options::{ClientOptions, FindOptions},
};
use std::{fmt, sync::Arc};
use tracing::debug;

use docmodel_core::{
    driver::{DocumentStream, Driver, DriverBuilder, FindSpec},
    error::{OdmError, OdmResult},
    session::Session,
};

/// Client session stored inside a [`Session`] handle created by [`MongoDbDriver::start_session`].
///
/// The lock serializes cursor batches of every query sharing the session.
pub struct MongoSession {
    inner: Mutex<ClientSession>,
}

impl MongoSession {
    /// Wraps a client session for sharing across queries.
    pub fn new(session: ClientSession) -> Self {
        Self { inner: Mutex::new(session) }
    }
}

impl fmt::Debug for MongoSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoSession").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct MongoDbDriver {
    client: Client,
    database: String,
    batch_size: Option<u32>,
}

impl MongoDbDriver {
    /// Creates a driver from an existing client.
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database, batch_size: None }
    }

    /// Creates a builder for the given connection string and database.
    pub fn builder(dsn: &str, database: &str) -> MongoDbDriverBuilder {
        MongoDbDriverBuilder::new(dsn, database)
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Starts a client session and wraps it in an opaque [`Session`] handle.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::Driver`] if the server refuses the session.
    pub async fn start_session(&self) -> OdmResult<Session> {
        let session = self
            .client
            .start_session()
            .await
            .map_err(|e| OdmError::Driver(e.to_string()))?;

        Ok(Session::new(MongoSession::new(session)))
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn find_options(&self, spec: &FindSpec) -> FindOptions {
        let mut options = FindOptions::default();

        options.sort = spec.sort.clone();
        options.skip = spec.skip;
        options.limit = spec
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
        options.projection = spec.projection.clone();
        options.batch_size = self.batch_size;

        options
    }
}

/// Drives a session cursor as a stream, locking the session for each batch fetch.
fn session_stream(cursor: SessionCursor<Document>, session: Arc<MongoSession>) -> DocumentStream {
    stream::unfold((cursor, session), |(mut cursor, session)| async move {
        let next = {
            let mut guard = session.inner.lock().await;
            cursor.next(&mut *guard).await
        };

        next.map(|result| {
            (result.map_err(|e| OdmError::Driver(e.to_string())), (cursor, session))
        })
    })
    .boxed()
}

#[async_trait]
impl Driver for MongoDbDriver {
    async fn execute_find(&self, collection: &str, spec: FindSpec) -> OdmResult<DocumentStream> {
        let options = self.find_options(&spec);
        let collection_handle = self.get_collection(collection);

        debug!(
            database = %self.database,
            collection,
            with_session = spec.session.is_some(),
            "issuing mongodb find",
        );

        match spec.session {
            None => Ok(collection_handle
                .find(spec.filter)
                .with_options(options)
                .await
                .map_err(|e| OdmError::Driver(e.to_string()))?
                .map_err(|e| OdmError::Driver(e.to_string()))
                .boxed()),
            Some(session) => {
                let session = session.downcast::<MongoSession>().ok_or_else(|| {
                    OdmError::InvalidArgument(
                        "session was not created by the mongodb driver".to_string(),
                    )
                })?;

                let cursor = {
                    let mut guard = session.inner.lock().await;
                    collection_handle
                        .find(spec.filter)
                        .with_options(options)
                        .session(&mut *guard)
                        .await
                        .map_err(|e| OdmError::Driver(e.to_string()))?
                };

                Ok(session_stream(cursor, session))
            }
        }
    }

    async fn shutdown(self) -> OdmResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Builder for [`MongoDbDriver`].
///
/// ```ignore
/// let driver = MongoDbDriver::builder("mongodb://localhost:27017", "app")
///     .app_name("docmodel")
///     .max_pool_size(20)
///     .batch_size(500)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MongoDbDriverBuilder {
    dsn: String,
    database: String,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    batch_size: Option<u32>,
}

impl MongoDbDriverBuilder {
    /// Creates a builder for the given connection string and database.
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            app_name: None,
            max_pool_size: None,
            batch_size: None,
        }
    }

    /// Sets the application name reported to the server.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sets the maximum number of pooled connections.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Sets the number of documents fetched per cursor batch.
    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = Some(size);
        self
    }
}

#[async_trait]
impl DriverBuilder for MongoDbDriverBuilder {
    type Driver = MongoDbDriver;

    async fn build(self) -> OdmResult<Self::Driver> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| OdmError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            options.app_name = Some(app_name);
        }
        if let Some(max_pool_size) = self.max_pool_size {
            options.max_pool_size = Some(max_pool_size);
        }

        let client = Client::with_options(options)
            .map_err(|e| OdmError::Initialization(e.to_string()))?;

        Ok(MongoDbDriver {
            client,
            database: self.database,
            batch_size: self.batch_size,
        })
    }
}
