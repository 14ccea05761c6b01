//! Typed collection handles.
//!
//! A [`TypedCollection`] is the starting point of every query. It borrows the store and hands
//! out [`FindMany`] and [`FindOne`] builders:
//!
//! ```ignore
//! let samples = store.collection::<Sample>();
//!
//! let recent = samples
//!     .find_many([Sample::integer().gt(1)])
//!     .find_many([Sample::nested().child("optional").is_null()])
//!     .sort("-integer")?
//!     .to_list()
//!     .await?;
//!
//! let one = samples.get(id.to_hex()).await?;
//! ```

use bson::Bson;
use std::marker::PhantomData;

use crate::{
    driver::Driver,
    error::OdmResult,
    find::{FindArgs, FindMany, FindOne},
    predicate::Predicate,
    schema::{Field, KEY_FIELD, Model, PrimaryKey, normalize_key},
    store::DocumentStore,
};

/// Type-safe collection of model `M` backed by driver `D`.
#[derive(Debug)]
pub struct TypedCollection<'a, D: Driver, M: Model> {
    store: &'a DocumentStore<D>,
    _marker: PhantomData<fn() -> M>,
}

impl<'a, D: Driver, M: Model> TypedCollection<'a, D, M> {
    pub(crate) fn new(store: &'a DocumentStore<D>) -> Self {
        Self { store, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &'static str {
        M::collection_name()
    }

    /// Starts a multi-result query with the given predicates.
    pub fn find_many(
        &self,
        predicates: impl IntoIterator<Item = Predicate>,
    ) -> FindMany<'a, D, M> {
        FindMany::new(self.store).find_many(predicates)
    }

    /// Alias of [`TypedCollection::find_many`].
    pub fn find(&self, predicates: impl IntoIterator<Item = Predicate>) -> FindMany<'a, D, M> {
        self.find_many(predicates)
    }

    /// Starts a multi-result query with predicates and keyword-style configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`](crate::error::OdmError::InvalidArgument) for negative
    /// skip or limit values and the errors of [`FindMany::sort`] for the sort argument.
    pub fn find_many_with(
        &self,
        predicates: impl IntoIterator<Item = Predicate>,
        args: FindArgs,
    ) -> OdmResult<FindMany<'a, D, M>> {
        FindMany::new(self.store).find_many_with(predicates, args)
    }

    /// Starts a query matching every document.
    pub fn find_all(&self) -> FindMany<'a, D, M> {
        FindMany::new(self.store)
    }

    /// Starts a single-result query with the given predicates.
    ///
    /// The returned builder can be awaited directly.
    pub fn find_one(&self, predicates: impl IntoIterator<Item = Predicate>) -> FindOne<'a, D, M> {
        FindOne::new(self.store).find_one(predicates)
    }

    /// Starts a single-result query with predicates and keyword-style configuration.
    ///
    /// `limit` in `args` is ignored.
    pub fn find_one_with(
        &self,
        predicates: impl IntoIterator<Item = Predicate>,
        args: FindArgs,
    ) -> OdmResult<FindOne<'a, D, M>> {
        FindOne::new(self.store).find_one_with(predicates, args)
    }

    /// Fetches a document by primary key.
    ///
    /// The key may be given natively or in its string encoding, so `get(id)` and
    /// `get(id.to_hex())` return the same document.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::TypeMismatch`](crate::error::OdmError::TypeMismatch) if the id cannot be
    /// normalized to `M::Key`.
    pub async fn get(&self, id: impl Into<Bson>) -> OdmResult<Option<M>> {
        let key: M::Key = normalize_key(id.into())?;

        self.find_one([Field::<M>::new(KEY_FIELD).eq(key.to_bson())])
            .run()
            .await
    }
}
