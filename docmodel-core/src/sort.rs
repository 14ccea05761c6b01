//! Sort specifications.
//!
//! A sort is an ordered list of [`SortKey`]s. Callers pass anything convertible into
//! [`SortArg`]: a field name (optionally prefixed with `+` or `-`), a field expression, a negated
//! field expression, a list of these, or a dynamic [`Bson`] value.

use bson::{Bson, Document};
use std::ops::Neg;

use crate::error::{OdmError, OdmResult};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Returns the native sort value (`1` or `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// A single sort key: a dotted field path and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// Creates a sort key for a dotted path.
    pub fn new(path: impl Into<String>, direction: SortDirection) -> Self {
        SortKey { path: path.into(), direction }
    }

    /// Parses `"field"`, `"+field"` or `"-field"`.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`] if no field name remains after the prefix.
    pub fn parse(text: &str) -> OdmResult<Self> {
        let text = text.trim();
        let (path, direction) = if let Some(rest) = text.strip_prefix('-') {
            (rest.trim_start(), SortDirection::Descending)
        } else if let Some(rest) = text.strip_prefix('+') {
            (rest.trim_start(), SortDirection::Ascending)
        } else {
            (text, SortDirection::Ascending)
        };

        if path.is_empty() {
            return Err(OdmError::InvalidArgument(format!(
                "sort key `{}` does not name a field",
                text
            )));
        }

        Ok(SortKey::new(path, direction))
    }
}

impl Neg for SortKey {
    type Output = SortKey;

    fn neg(self) -> SortKey {
        let direction = match self.direction {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        };
        SortKey { path: self.path, direction }
    }
}

/// Anything accepted by `.sort(...)`.
#[derive(Debug, Clone)]
pub enum SortArg {
    Key(SortKey),
    Text(String),
    /// Keys applied in listed order.
    Many(Vec<SortArg>),
    /// Dynamically typed input; strings, arrays and `{path: 1 | -1}` documents are accepted.
    Value(Bson),
}

impl SortArg {
    /// Resolves this argument into an ordered list of sort keys.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::TypeMismatch`] for dynamic values that are not sort specifications
    /// and [`OdmError::InvalidArgument`] for malformed field names.
    pub fn resolve(self) -> OdmResult<Vec<SortKey>> {
        match self {
            SortArg::Key(key) => Ok(vec![key]),
            SortArg::Text(text) => Ok(vec![SortKey::parse(&text)?]),
            SortArg::Many(args) => {
                let mut keys = Vec::with_capacity(args.len());
                for arg in args {
                    keys.extend(arg.resolve()?);
                }
                Ok(keys)
            }
            SortArg::Value(value) => resolve_value(value),
        }
    }
}

fn resolve_value(value: Bson) -> OdmResult<Vec<SortKey>> {
    match value {
        Bson::String(text) => Ok(vec![SortKey::parse(&text)?]),
        Bson::Array(items) => SortArg::Many(items.into_iter().map(SortArg::Value).collect()).resolve(),
        Bson::Document(doc) => doc
            .into_iter()
            .map(|(path, direction)| match direction {
                Bson::Int32(1) | Bson::Int64(1) => Ok(SortKey::new(path, SortDirection::Ascending)),
                Bson::Int32(-1) | Bson::Int64(-1) => Ok(SortKey::new(path, SortDirection::Descending)),
                other => Err(OdmError::InvalidArgument(format!(
                    "sort direction for `{}` must be 1 or -1, got {}",
                    path, other
                ))),
            })
            .collect(),
        other => Err(OdmError::TypeMismatch(format!(
            "sort expects a field name, a field expression or a negated field expression, got {:?}",
            other.element_type()
        ))),
    }
}

impl From<SortKey> for SortArg {
    fn from(key: SortKey) -> Self {
        SortArg::Key(key)
    }
}

impl From<&str> for SortArg {
    fn from(text: &str) -> Self {
        SortArg::Text(text.to_string())
    }
}

impl From<String> for SortArg {
    fn from(text: String) -> Self {
        SortArg::Text(text)
    }
}

impl From<Bson> for SortArg {
    fn from(value: Bson) -> Self {
        SortArg::Value(value)
    }
}

impl<T: Into<SortArg>> From<Vec<T>> for SortArg {
    fn from(args: Vec<T>) -> Self {
        SortArg::Many(args.into_iter().map(Into::into).collect())
    }
}

/// Builds the native sort document, or `None` for an empty sort.
pub fn sort_document(keys: &[SortKey]) -> Option<Document> {
    if keys.is_empty() {
        return None;
    }

    Some(
        keys.iter()
            .map(|key| (key.path.clone(), Bson::Int32(key.direction.as_i32())))
            .collect(),
    )
}
