//! Compilation of predicate lists into native MongoDB filter documents.
//!
//! Compilation is pure: the same predicate list always yields the same document.
//!
//! - No predicates compile to `{}`.
//! - A single predicate compiles to its own fragment.
//! - Two or more predicates compile to `{"$and": [...]}` in insertion order.
//! - Logical groups with one child compile to that child. An empty AND compiles to `{}` and an
//!   empty OR is rejected.
//! - Equality compiles to `{path: value}`, every other operator to `{path: {opcode: value}}`.

use bson::{Bson, Document, doc};

use crate::{
    codec::CodecRegistry,
    error::{OdmError, OdmResult},
    predicate::{CompareOp, Comparison, Predicate},
};

/// Visitor over predicate trees.
pub trait PredicateVisitor {
    type Output;
    type Error: Into<OdmError>;

    fn visit_comparison(&mut self, comparison: &Comparison) -> Result<Self::Output, Self::Error>;
    fn visit_and(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error>;

    fn visit_predicate(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        match predicate {
            Predicate::Comparison(comparison) => self.visit_comparison(comparison),
            Predicate::And(predicates) => self.visit_and(predicates),
            Predicate::Or(predicates) => self.visit_or(predicates),
        }
    }
}

/// Translates predicates into MongoDB filter documents, encoding operands through the codecs
/// attached to their fields.
pub struct FilterCompiler<'a> {
    codecs: &'a CodecRegistry,
}

impl<'a> FilterCompiler<'a> {
    /// Creates a compiler that encodes operands with `codecs`.
    pub fn new(codecs: &'a CodecRegistry) -> Self {
        Self { codecs }
    }

    /// Compiles a list of top-level predicates, AND-ing them in order.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::InvalidArgument`] for malformed operands, such as an ordering
    /// comparison against null or a non-array `$in` operand.
    pub fn compile(&mut self, predicates: &[Predicate]) -> OdmResult<Document> {
        match predicates {
            [] => Ok(Document::new()),
            [single] => self.visit_predicate(single),
            many => self.visit_and(many),
        }
    }

    fn encode_operand(&self, comparison: &Comparison) -> OdmResult<Bson> {
        let Some(codec) = comparison.codec else {
            return Ok(comparison.value.clone());
        };

        let encode = |value: &Bson| {
            self.codecs
                .encode(codec, value)
                .map_err(|e| OdmError::InvalidArgument(format!("operand for `{}`: {}", comparison.path, e)))
        };

        match (&comparison.op, &comparison.value) {
            (CompareOp::Exists, value) => Ok(value.clone()),
            (CompareOp::In | CompareOp::NotIn, Bson::Array(items)) => Ok(Bson::Array(
                items
                    .iter()
                    .map(encode)
                    .collect::<OdmResult<Vec<_>>>()?,
            )),
            (_, value) => encode(value),
        }
    }
}

fn validate_operand(comparison: &Comparison) -> OdmResult<()> {
    let malformed = match (&comparison.op, &comparison.value) {
        (op, Bson::Null | Bson::Undefined) if op.is_ordering() => Some("requires a non-null operand"),
        (op, Bson::Double(v)) if op.is_ordering() && v.is_nan() => Some("cannot order against NaN"),
        (CompareOp::In | CompareOp::NotIn, value) if !matches!(value, Bson::Array(_)) => {
            Some("requires an array operand")
        }
        (CompareOp::Exists, value) if !matches!(value, Bson::Boolean(_)) => {
            Some("requires a boolean operand")
        }
        _ => None,
    };

    match malformed {
        Some(reason) => Err(OdmError::InvalidArgument(format!(
            "`{}` on `{}` {}",
            comparison.op.opcode(),
            comparison.path,
            reason
        ))),
        None => Ok(()),
    }
}

impl PredicateVisitor for FilterCompiler<'_> {
    type Output = Document;
    type Error = OdmError;

    fn visit_comparison(&mut self, comparison: &Comparison) -> OdmResult<Document> {
        validate_operand(comparison)?;
        let value = self.encode_operand(comparison)?;

        let mut fragment = Document::new();
        match comparison.op {
            CompareOp::Eq => fragment.insert(comparison.path.clone(), value),
            op => {
                let mut operator = Document::new();
                operator.insert(op.opcode(), value);
                fragment.insert(comparison.path.clone(), operator)
            }
        };

        Ok(fragment)
    }

    fn visit_and(&mut self, predicates: &[Predicate]) -> OdmResult<Document> {
        match predicates {
            [] => Ok(Document::new()),
            [single] => self.visit_predicate(single),
            many => Ok(doc! {
                "$and": many
                    .iter()
                    .map(|predicate| self.visit_predicate(predicate))
                    .collect::<OdmResult<Vec<_>>>()?,
            }),
        }
    }

    fn visit_or(&mut self, predicates: &[Predicate]) -> OdmResult<Document> {
        match predicates {
            [] => Err(OdmError::InvalidArgument(
                "`$or` requires at least one predicate".to_string(),
            )),
            [single] => self.visit_predicate(single),
            many => Ok(doc! {
                "$or": many
                    .iter()
                    .map(|predicate| self.visit_predicate(predicate))
                    .collect::<OdmResult<Vec<_>>>()?,
            }),
        }
    }
}

/// Compiles predicates without any codecs.
pub fn compile(predicates: &[Predicate]) -> OdmResult<Document> {
    FilterCompiler::new(&CodecRegistry::default()).compile(predicates)
}
