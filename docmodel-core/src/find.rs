//! Chainable find query builders.
//!
//! [`FindMany`] and [`FindOne`] accumulate filter predicates, sort keys, skip, limit, a session
//! and a projection target, then compile them into a [`FindSpec`] when a terminal runs.
//!
//! Builders never lose state. Repeated `find_many` calls merge their predicates into the filter
//! list, while `skip`, `limit` and `sort` overwrite the previous value. Terminals borrow the
//! builder, so the same query can be executed again and always reflects its current state.
//!
//! # Example
//!
//! ```ignore
//! let query = samples
//!     .find_many_with([Sample::integer().gt(1)], FindArgs::new().skip(2))?
//!     .skip(5)?
//!     .sort(-Sample::integer())?;
//!
//! assert_eq!(query.skip_number(), Some(5));
//!
//! let mut stream = query.stream().await?;
//! while let Some(sample) = stream.try_next().await? {
//!     // ...
//! }
//! ```

use bson::Document;
use futures::{
    StreamExt, TryStreamExt,
    future::BoxFuture,
    stream::BoxStream,
};
use std::{
    future::IntoFuture,
    marker::PhantomData,
};
use tracing::debug;

use crate::{
    compile::FilterCompiler,
    driver::{Driver, FindSpec},
    error::{OdmError, OdmResult},
    predicate::Predicate,
    projection::build_projection,
    schema::{Model, Schema},
    session::Session,
    sort::{SortArg, SortKey, sort_document},
    store::DocumentStore,
};

/// Keyword-style configuration accepted by `find_many_with` and `find_one_with`.
///
/// ```ignore
/// let args = FindArgs::new().skip(2).limit(3).sort("-integer");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FindArgs {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<SortArg>,
    pub session: Option<Session>,
}

impl FindArgs {
    /// Creates empty arguments that leave the query unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents to skip; validated when applied.
    pub fn skip(mut self, n: i64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Maximum number of documents; validated when applied. Ignored by single-result queries.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sort order, replacing any previous one.
    pub fn sort(mut self, spec: impl Into<SortArg>) -> Self {
        self.sort = Some(spec.into());
        self
    }

    /// Driver session passed through to execution.
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }
}

fn non_negative(name: &str, n: i64) -> OdmResult<u64> {
    u64::try_from(n).map_err(|_| {
        OdmError::InvalidArgument(format!("{} must be a non-negative integer, got {}", name, n))
    })
}

#[derive(Debug, Clone, Default)]
struct QueryState {
    filters: Vec<Predicate>,
    sort: Vec<SortKey>,
    skip: Option<u64>,
    limit: Option<u64>,
    session: Option<Session>,
}

impl QueryState {
    fn merge(&mut self, predicates: impl IntoIterator<Item = Predicate>) {
        self.filters.extend(predicates);
    }

    fn set_sort(&mut self, spec: impl Into<SortArg>) -> OdmResult<()> {
        self.sort = spec.into().resolve()?;
        Ok(())
    }

    fn apply(&mut self, args: FindArgs, with_limit: bool) -> OdmResult<()> {
        if let Some(n) = args.skip {
            self.skip = Some(non_negative("skip", n)?);
        }
        if let Some(n) = args.limit.filter(|_| with_limit) {
            self.limit = Some(non_negative("limit", n)?);
        }
        if let Some(spec) = args.sort {
            self.set_sort(spec)?;
        }
        if let Some(session) = args.session {
            self.session = Some(session);
        }

        Ok(())
    }

    fn compile<D: Driver>(&self, store: &DocumentStore<D>) -> OdmResult<Document> {
        FilterCompiler::new(store.codecs()).compile(&self.filters)
    }

    fn to_spec<D: Driver>(
        &self,
        store: &DocumentStore<D>,
        projection: Option<Document>,
    ) -> OdmResult<FindSpec> {
        Ok(FindSpec {
            filter: self.compile(store)?,
            sort: sort_document(&self.sort),
            skip: self.skip,
            limit: self.limit,
            projection,
            session: self.session.clone(),
        })
    }
}

/// Multi-result find query over model `M`, decoding results into `P`.
#[derive(Debug)]
pub struct FindMany<'a, D: Driver, M: Model, P: Schema = M> {
    store: &'a DocumentStore<D>,
    state: QueryState,
    _marker: PhantomData<fn() -> (M, P)>,
}

impl<'a, D: Driver, M: Model> FindMany<'a, D, M> {
    pub(crate) fn new(store: &'a DocumentStore<D>) -> Self {
        Self { store, state: QueryState::default(), _marker: PhantomData }
    }
}

impl<'a, D: Driver, M: Model, P: Schema> FindMany<'a, D, M, P> {
    /// Merges predicates into the filter list.
    pub fn find_many(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.state.merge(predicates);
        self
    }

    /// Alias of [`FindMany::find_many`].
    pub fn find(self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.find_many(predicates)
    }

    /// Merges predicates and applies keyword-style configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`] for negative skip or limit values, and the errors
    /// of [`SortArg::resolve`] for the sort argument.
    pub fn find_many_with(
        mut self,
        predicates: impl IntoIterator<Item = Predicate>,
        args: FindArgs,
    ) -> OdmResult<Self> {
        self.state.merge(predicates);
        self.state.apply(args, true)?;
        Ok(self)
    }

    /// Sets the number of documents to skip, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`] if `n` is negative.
    pub fn skip(mut self, n: i64) -> OdmResult<Self> {
        self.state.skip = Some(non_negative("skip", n)?);
        Ok(self)
    }

    /// Sets the maximum number of documents to return, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`] if `n` is negative.
    pub fn limit(mut self, n: i64) -> OdmResult<Self> {
        self.state.limit = Some(non_negative("limit", n)?);
        Ok(self)
    }

    /// Replaces the sort order.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::TypeMismatch`] for dynamic values that are not sort specifications and
    /// [`OdmError::InvalidArgument`] for strings that do not name a field.
    pub fn sort(mut self, spec: impl Into<SortArg>) -> OdmResult<Self> {
        self.state.set_sort(spec)?;
        Ok(self)
    }

    /// Attaches a driver session.
    pub fn set_session(mut self, session: Session) -> Self {
        self.state.session = Some(session);
        self
    }

    /// Decodes results into `Q` instead, restricting the fetched fields to what `Q` declares.
    pub fn project<Q: Schema>(self) -> FindMany<'a, D, M, Q> {
        FindMany { store: self.store, state: self.state, _marker: PhantomData }
    }

    /// Returns the accumulated filter predicates, in insertion order.
    pub fn filters(&self) -> &[Predicate] {
        &self.state.filters
    }

    /// Returns the current sort keys, in priority order.
    pub fn sort_expressions(&self) -> &[SortKey] {
        &self.state.sort
    }

    /// Returns the number of documents to skip, if set.
    pub fn skip_number(&self) -> Option<u64> {
        self.state.skip
    }

    /// Returns the result limit, if set. Zero means no limit.
    pub fn limit_number(&self) -> Option<u64> {
        self.state.limit
    }

    /// Returns the attached session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.state.session.as_ref()
    }

    /// Compiles the current filters without executing the query.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`] for malformed predicate operands.
    pub fn get_filter_query(&self) -> OdmResult<Document> {
        self.state.compile(self.store)
    }

    /// Returns the projection document sent to the driver, if any.
    pub fn get_projection(&self) -> Option<Document> {
        build_projection::<P, M>()
    }

    /// Executes the query and returns a lazy stream of decoded results.
    ///
    /// Each call issues a new driver find. Dropping the stream releases the driver cursor.
    ///
    /// # Errors
    ///
    /// Returns compilation or driver errors. Decode failures are yielded by the stream.
    pub async fn stream(&self) -> OdmResult<BoxStream<'static, OdmResult<P>>> {
        let spec = self.state.to_spec(self.store, self.get_projection())?;

        debug!(
            collection = M::collection_name(),
            filter = %spec.filter,
            sort = ?spec.sort,
            skip = ?spec.skip,
            limit = ?spec.limit,
            projection = ?spec.projection,
            "executing find",
        );

        let raw = self
            .store
            .driver()
            .execute_find(M::collection_name(), spec)
            .await?;

        let materializer = self.store.materializer().clone();
        Ok(raw
            .map(move |document| document.and_then(|document| materializer.decode::<P>(document)))
            .boxed())
    }

    /// Executes the query and collects every decoded result in order.
    ///
    /// # Errors
    ///
    /// Fails as a whole on the first document that cannot be decoded.
    pub async fn to_list(&self) -> OdmResult<Vec<P>> {
        self.stream()
            .await?
            .try_collect()
            .await
    }
}

/// Single-result find query over model `M`, decoding the result into `P`.
///
/// Awaiting the builder runs it; a query that matches nothing resolves to `Ok(None)`.
#[derive(Debug)]
pub struct FindOne<'a, D: Driver, M: Model, P: Schema = M> {
    store: &'a DocumentStore<D>,
    state: QueryState,
    _marker: PhantomData<fn() -> (M, P)>,
}

impl<'a, D: Driver, M: Model> FindOne<'a, D, M> {
    pub(crate) fn new(store: &'a DocumentStore<D>) -> Self {
        Self { store, state: QueryState::default(), _marker: PhantomData }
    }
}

impl<'a, D: Driver, M: Model, P: Schema> FindOne<'a, D, M, P> {
    /// Merges predicates into the filter list.
    pub fn find_one(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.state.merge(predicates);
        self
    }

    /// Merges predicates and applies keyword-style configuration; `limit` is ignored.
    pub fn find_one_with(
        mut self,
        predicates: impl IntoIterator<Item = Predicate>,
        args: FindArgs,
    ) -> OdmResult<Self> {
        self.state.merge(predicates);
        self.state.apply(args, false)?;
        Ok(self)
    }

    /// Skips `n` matches before taking the first one, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`] if `n` is negative.
    pub fn skip(mut self, n: i64) -> OdmResult<Self> {
        self.state.skip = Some(non_negative("skip", n)?);
        Ok(self)
    }

    /// Replaces the order that decides which match comes first.
    ///
    /// # Errors
    ///
    /// See [`FindMany::sort`].
    pub fn sort(mut self, spec: impl Into<SortArg>) -> OdmResult<Self> {
        self.state.set_sort(spec)?;
        Ok(self)
    }

    /// Attaches a driver session.
    pub fn set_session(mut self, session: Session) -> Self {
        self.state.session = Some(session);
        self
    }

    /// Decodes the result into `Q` instead, restricting the fetched fields to what `Q` declares.
    pub fn project<Q: Schema>(self) -> FindOne<'a, D, M, Q> {
        FindOne { store: self.store, state: self.state, _marker: PhantomData }
    }

    /// Returns the accumulated filter predicates, in insertion order.
    pub fn filters(&self) -> &[Predicate] {
        &self.state.filters
    }

    /// Returns the current sort keys, in priority order.
    pub fn sort_expressions(&self) -> &[SortKey] {
        &self.state.sort
    }

    /// Returns the number of matches to skip, if set.
    pub fn skip_number(&self) -> Option<u64> {
        self.state.skip
    }

    /// Returns the attached session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.state.session.as_ref()
    }

    /// Compiles the current filters without executing the query.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`] for malformed predicate operands.
    pub fn get_filter_query(&self) -> OdmResult<Document> {
        self.state.compile(self.store)
    }

    /// Returns the projection document sent to the driver, if any.
    pub fn get_projection(&self) -> Option<Document> {
        build_projection::<P, M>()
    }

    /// Executes the query and decodes the first match.
    ///
    /// # Errors
    ///
    /// Returns compilation, driver or decode errors. No match is `Ok(None)`, never an error.
    pub async fn run(&self) -> OdmResult<Option<P>> {
        let spec = self.state.to_spec(self.store, self.get_projection())?;

        debug!(
            collection = M::collection_name(),
            filter = %spec.filter,
            sort = ?spec.sort,
            skip = ?spec.skip,
            projection = ?spec.projection,
            "executing find_one",
        );

        self.store
            .driver()
            .execute_find_one(M::collection_name(), spec)
            .await?
            .map(|document| self.store.materializer().decode::<P>(document))
            .transpose()
    }
}

impl<'a, D: Driver, M: Model, P: Schema> IntoFuture for FindOne<'a, D, M, P> {
    type Output = OdmResult<Option<P>>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.run().await })
    }
}
