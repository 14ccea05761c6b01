//! Schema descriptors, primary keys and field expressions.
//!
//! Every type that can be decoded from the store implements [`Schema`], which exposes a static
//! list of [`FieldDef`] descriptors. Stored documents additionally implement [`Model`], which names
//! the collection and the primary key type.
//!
//! A [`Field`] is a typed dotted path into a schema. Its comparison methods build a
//! [`Predicate`](crate::predicate::Predicate) instead of evaluating to a boolean:
//!
//! ```ignore
//! let older = Sample::integer().gt(1);
//! let unset = Sample::nested().child("optional").is_null();
//! let filter = older & unset;
//! ```
//!
//! Negating a field (`-Sample::integer()`) produces a descending [`SortKey`].

use bson::{Bson, Document, Uuid, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, marker::PhantomData, ops::Neg};

use crate::{
    error::{OdmError, OdmResult},
    predicate::{CompareOp, Predicate},
    sort::{SortArg, SortDirection, SortKey},
};

/// Name of the primary key field in every stored document.
pub const KEY_FIELD: &str = "_id";

/// Store-level type of a declared field, used for structural validation on decode.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// Accepts any value.
    Any,
    Bool,
    /// 32 or 64 bit integer.
    Integer,
    /// Floating point; integers are accepted as well.
    Double,
    String,
    DateTime,
    ObjectId,
    Binary,
    Array,
    /// Embedded document described by another schema.
    Document(fn() -> &'static [FieldDef]),
}

impl FieldType {
    /// Returns a short name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Any => "any",
            FieldType::Bool => "bool",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::DateTime => "datetime",
            FieldType::ObjectId => "objectid",
            FieldType::Binary => "binary",
            FieldType::Array => "array",
            FieldType::Document(_) => "document",
        }
    }

    /// Checks whether a raw value structurally matches this type.
    pub fn accepts(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::Bool, Bson::Boolean(_)) => true,
            (FieldType::Integer, Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldType::Double, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldType::String, Bson::String(_)) => true,
            (FieldType::DateTime, Bson::DateTime(_)) => true,
            (FieldType::ObjectId, Bson::ObjectId(_)) => true,
            (FieldType::Binary, Bson::Binary(_)) => true,
            (FieldType::Array, Bson::Array(_)) => true,
            (FieldType::Document(_), Bson::Document(_)) => true,
            _ => false,
        }
    }
}

/// Descriptor of one declared field.
///
/// Descriptors are `const`-constructible so schemas can live in statics and are resolved once
/// per type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Stored field name.
    pub name: &'static str,
    /// Store-level type.
    pub ty: FieldType,
    /// Whether the field may be missing or null.
    pub optional: bool,
    /// Name of the custom codec registered for this field's values.
    pub codec: Option<&'static str>,
}

impl FieldDef {
    /// Creates a required field without a codec.
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        FieldDef { name, ty, optional: false, codec: None }
    }

    /// Marks this field as optional.
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Routes this field's values through the named codec.
    pub const fn with_codec(mut self, codec: &'static str) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Returns the descriptors of an embedded document, or an empty slice.
    pub fn children(&self) -> &'static [FieldDef] {
        match self.ty {
            FieldType::Document(fields) => fields(),
            _ => &[],
        }
    }
}

/// Looks up a dotted path in a list of field descriptors, descending into embedded documents.
pub fn resolve_path(fields: &'static [FieldDef], path: &str) -> Option<&'static FieldDef> {
    let mut current = fields;
    let mut found = None;

    for segment in path.split('.') {
        let def = current.iter().find(|def| def.name == segment)?;
        current = def.children();
        found = Some(def);
    }

    found
}

/// A type that can be decoded from a store document.
///
/// Implemented by stored models and by projection targets. `#[derive(Schema)]` generates
/// `fields()` from the struct definition.
pub trait Schema: DeserializeOwned + Send + Unpin + 'static {
    /// Declared fields, in declaration order.
    fn fields() -> &'static [FieldDef];

    /// Explicit projection document used verbatim when this type is a projection target.
    ///
    /// Values may be `1` (include) or `"$path"` expressions that rename or compute fields.
    fn projection() -> Option<Document> {
        None
    }

    /// Returns the declared field names, in declaration order.
    fn field_names() -> Vec<&'static str> {
        Self::fields()
            .iter()
            .map(|def| def.name)
            .collect()
    }
}

/// A document type stored in a collection.
pub trait Model: Schema + Serialize + Sync {
    /// Primary key type stored under [`KEY_FIELD`].
    type Key: PrimaryKey;

    /// Returns the name of the collection this model is stored in.
    fn collection_name() -> &'static str;
}

/// A primary key representation that can be normalized from native or string form.
pub trait PrimaryKey: Clone + Send + Sync + 'static {
    /// Converts a native BSON value into the key, if it has the right type.
    fn from_bson(value: &Bson) -> Option<Self>;

    /// Parses the string encoding of the key.
    fn parse_key(text: &str) -> Option<Self>;

    /// Converts the key into its stored BSON value.
    fn to_bson(&self) -> Bson;
}

impl PrimaryKey for ObjectId {
    fn from_bson(value: &Bson) -> Option<Self> {
        value.as_object_id()
    }

    fn parse_key(text: &str) -> Option<Self> {
        ObjectId::parse_str(text).ok()
    }

    fn to_bson(&self) -> Bson {
        Bson::ObjectId(*self)
    }
}

impl PrimaryKey for Uuid {
    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Binary(_) => bson::de::deserialize_from_bson(value.clone()).ok(),
            _ => None,
        }
    }

    fn parse_key(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok()
    }

    fn to_bson(&self) -> Bson {
        Bson::from(*self)
    }
}

impl PrimaryKey for String {
    fn from_bson(value: &Bson) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn parse_key(text: &str) -> Option<Self> {
        Some(text.to_string())
    }

    fn to_bson(&self) -> Bson {
        Bson::String(self.clone())
    }
}

impl PrimaryKey for i64 {
    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Int32(v) => Some(*v as i64),
            Bson::Int64(v) => Some(*v),
            _ => None,
        }
    }

    fn parse_key(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    fn to_bson(&self) -> Bson {
        Bson::Int64(*self)
    }
}

/// Normalizes an id given in native or string-encoded form into the key type `K`.
///
/// # Errors
///
/// Returns [`OdmError::TypeMismatch`] if the value cannot be converted.
pub fn normalize_key<K: PrimaryKey>(value: Bson) -> OdmResult<K> {
    let key = match &value {
        Bson::String(text) => K::parse_key(text),
        other => K::from_bson(other),
    };

    key.ok_or_else(|| {
        OdmError::TypeMismatch(format!(
            "cannot use {:?} value `{}` as a primary key",
            value.element_type(),
            value
        ))
    })
}

/// A typed dotted path into the schema of `M`.
///
/// Comparison methods return a [`Predicate`], not a boolean.
pub struct Field<M> {
    path: String,
    codec: Option<&'static str>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Schema> Field<M> {
    /// Creates a field expression for a dotted path.
    ///
    /// The codec declared for the path, if any, is attached so that comparison operands are
    /// encoded the same way stored values are.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let codec = resolve_path(M::fields(), &path).and_then(|def| def.codec);

        Field { path, codec, _marker: PhantomData }
    }

    /// Returns the field expression for a sub-field of an embedded document.
    pub fn child(&self, name: &str) -> Self {
        Field::new(format!("{}.{}", self.path, name))
    }
}

impl<M> Field<M> {
    /// Returns the dotted path of this field.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the codec attached to this field.
    pub fn codec(&self) -> Option<&'static str> {
        self.codec
    }

    fn compare(&self, op: CompareOp, value: Bson) -> Predicate {
        Predicate::comparison(self.path.clone(), op, value, self.codec)
    }

    /// Field equals value. Comparing with `Bson::Null` matches null or missing fields.
    pub fn eq(&self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Eq, value.into())
    }

    /// Field differs from value. Missing fields match unless value is null.
    pub fn ne(&self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Ne, value.into())
    }

    /// Field is greater than value.
    pub fn gt(&self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Gt, value.into())
    }

    /// Field is greater than or equal to value.
    pub fn gte(&self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Gte, value.into())
    }

    /// Field is less than value.
    pub fn lt(&self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Lt, value.into())
    }

    /// Field is less than or equal to value.
    pub fn lte(&self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Lte, value.into())
    }

    /// Field value is one of `values`.
    pub fn is_in<V: Into<Bson>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        self.compare(
            CompareOp::In,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Field value is none of `values`.
    pub fn not_in<V: Into<Bson>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        self.compare(
            CompareOp::NotIn,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Field is present (`true`) or absent (`false`).
    pub fn exists(&self, should_exist: bool) -> Predicate {
        self.compare(CompareOp::Exists, Bson::Boolean(should_exist))
    }

    /// Field is null or missing.
    pub fn is_null(&self) -> Predicate {
        self.eq(Bson::Null)
    }

    /// Ascending sort key on this field.
    pub fn asc(&self) -> SortKey {
        SortKey::new(self.path.clone(), SortDirection::Ascending)
    }

    /// Descending sort key on this field, same as `-field`.
    pub fn desc(&self) -> SortKey {
        SortKey::new(self.path.clone(), SortDirection::Descending)
    }
}

impl<M> Clone for Field<M> {
    fn clone(&self) -> Self {
        Field { path: self.path.clone(), codec: self.codec, _marker: PhantomData }
    }
}

impl<M> fmt::Debug for Field<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("path", &self.path)
            .field("codec", &self.codec)
            .finish()
    }
}

impl<M> Neg for Field<M> {
    type Output = SortKey;

    fn neg(self) -> SortKey {
        self.desc()
    }
}

impl<M> Neg for &Field<M> {
    type Output = SortKey;

    fn neg(self) -> SortKey {
        self.desc()
    }
}

impl<M> From<Field<M>> for SortArg {
    fn from(field: Field<M>) -> Self {
        SortArg::Key(field.asc())
    }
}

impl<M> From<&Field<M>> for SortArg {
    fn from(field: &Field<M>) -> Self {
        SortArg::Key(field.asc())
    }
}
