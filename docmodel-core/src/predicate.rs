//! Immutable predicate trees.
//!
//! A [`Predicate`] is either a single field [`Comparison`] or a logical combination of
//! predicates. Predicates are built from [`Field`](crate::schema::Field) comparison methods and
//! combined with [`Predicate::and`] / [`Predicate::or`] or the `&` / `|` operators:
//!
//! ```ignore
//! let p = Sample::integer().gt(1) & Sample::nested().child("optional").is_null();
//! ```
//!
//! `AND` of `AND` is always flattened into a single node, so `(a & b) & c` is a three-child
//! `AND`. The same holds for `OR`. The two operators never merge with each other.

use bson::Bson;
use std::ops::{BitAnd, BitOr};

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal to. Equality with null also matches missing fields.
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Value is one of an array of candidates.
    In,
    /// Value is none of an array of candidates.
    NotIn,
    /// Field presence, operand is a boolean.
    Exists,
}

impl CompareOp {
    /// Returns the native query operator code.
    pub fn opcode(&self) -> &'static str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
            CompareOp::In => "$in",
            CompareOp::NotIn => "$nin",
            CompareOp::Exists => "$exists",
        }
    }

    /// Whether the operator orders values rather than matching them.
    pub fn is_ordering(&self) -> bool {
        matches!(self, CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte)
    }
}

/// One comparison of a field path against a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Dotted field path.
    pub path: String,
    pub op: CompareOp,
    /// Operand in its serde representation, before codec encoding.
    pub value: Bson,
    /// Codec used to encode the operand at compile time.
    pub codec: Option<&'static str>,
}

/// A filter predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison(Comparison),
    /// All children must match.
    And(Vec<Predicate>),
    /// Any child must match.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Creates a comparison predicate.
    pub fn comparison(
        path: impl Into<String>,
        op: CompareOp,
        value: Bson,
        codec: Option<&'static str>,
    ) -> Self {
        Predicate::Comparison(Comparison { path: path.into(), op, value, codec })
    }

    /// Combines this predicate with another using logical AND, flattening nested ANDs.
    pub fn and(self, other: Predicate) -> Self {
        let mut children = self.into_and_children();
        children.extend(other.into_and_children());
        Predicate::And(children)
    }

    /// Combines this predicate with another using logical OR, flattening nested ORs.
    pub fn or(self, other: Predicate) -> Self {
        let mut children = self.into_or_children();
        children.extend(other.into_or_children());
        Predicate::Or(children)
    }

    /// Combines all predicates using logical AND.
    ///
    /// A single predicate is returned as is. An empty AND matches every document.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut children: Vec<Predicate> = predicates
            .into_iter()
            .flat_map(Predicate::into_and_children)
            .collect();

        match children.len() {
            1 => children.remove(0),
            _ => Predicate::And(children),
        }
    }

    /// Combines all predicates using logical OR.
    ///
    /// A single predicate is returned as is. An empty OR cannot be compiled.
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut children: Vec<Predicate> = predicates
            .into_iter()
            .flat_map(Predicate::into_or_children)
            .collect();

        match children.len() {
            1 => children.remove(0),
            _ => Predicate::Or(children),
        }
    }

    fn into_and_children(self) -> Vec<Predicate> {
        match self {
            Predicate::And(children) => children,
            other => vec![other],
        }
    }

    fn into_or_children(self) -> Vec<Predicate> {
        match self {
            Predicate::Or(children) => children,
            other => vec![other],
        }
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        self.and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        self.or(rhs)
    }
}
