//! Evaluation of compiled filter, sort and projection documents against stored documents.
//!
//! Only the subset of the MongoDB query language produced by the query compiler is understood:
//! implicit equality, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`,
//! `$and` and `$or` over dotted field paths.

use bson::{Bson, DateTime, Document, oid::ObjectId};
use std::cmp::Ordering;

use docmodel_core::error::{OdmError, OdmResult};

/// Comparable view of a BSON value.
///
/// Integers compare exactly with each other. Comparisons involving a `Double` go through `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    /// Embedded document; equality is field-order sensitive.
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Values without a natural order, compared by raw equality only.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position in the cross-type sort order used by MongoDB.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Int(_) | Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Other(_) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
        }
    }

    /// Total order used for sorting: same-type values by value, others by type rank.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other)
            .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank()))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::Int(a), Comparable::Number(b)) => (*a as f64) == *b,
            (Comparable::Number(a), Comparable::Int(b)) => *a == (*b as f64),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path inside a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Sets a dotted path inside a document, creating intermediate documents as needed.
fn assign(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                assign(inner, rest, value);
            }
        }
    }
}

fn unsupported(operator: &str) -> OdmError {
    OdmError::Driver(format!("unsupported query operator `{}`", operator))
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Checks the document against a compiled filter. All top-level entries must match.
    pub fn evaluate(&self, filter: &Document) -> OdmResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => self.visit_and(condition)?,
                "$or" => self.visit_or(condition)?,
                operator if operator.starts_with('$') => return Err(unsupported(operator)),
                path => self.visit_field(path, condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn clauses<'b>(condition: &'b Bson, operator: &str) -> OdmResult<Vec<&'b Document>> {
        let Bson::Array(items) = condition else {
            return Err(OdmError::Driver(format!("`{}` expects an array", operator)));
        };

        items
            .iter()
            .map(|item| {
                item.as_document()
                    .ok_or_else(|| OdmError::Driver(format!("`{}` expects documents", operator)))
            })
            .collect()
    }

    fn visit_and(&self, condition: &Bson) -> OdmResult<bool> {
        for clause in Self::clauses(condition, "$and")? {
            if !self.evaluate(clause)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&self, condition: &Bson) -> OdmResult<bool> {
        for clause in Self::clauses(condition, "$or")? {
            if self.evaluate(clause)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_field(&self, path: &str, condition: &Bson) -> OdmResult<bool> {
        let value = lookup(self.document, path);

        match condition {
            Bson::Document(operators)
                if !operators.is_empty() && operators.keys().all(|k| k.starts_with('$')) =>
            {
                for (operator, operand) in operators {
                    if !Self::visit_operator(value, operator, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            operand => Ok(Self::equals(value, operand)),
        }
    }

    fn visit_operator(value: Option<&Bson>, operator: &str, operand: &Bson) -> OdmResult<bool> {
        Ok(match operator {
            "$eq" => Self::equals(value, operand),
            "$ne" => !Self::equals(value, operand),
            "$gt" | "$gte" | "$lt" | "$lte" => {
                let Some(value) = value else {
                    return Ok(false);
                };
                let right = Comparable::from(operand);
                let matches = |left: &Comparable| match left.partial_cmp(&right) {
                    Some(ordering) => match operator {
                        "$gt" => ordering == Ordering::Greater,
                        "$gte" => ordering != Ordering::Less,
                        "$lt" => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                };

                match Comparable::from(value) {
                    Comparable::Array(items) => items.iter().any(matches),
                    left => matches(&left),
                }
            }
            "$in" | "$nin" => {
                let Bson::Array(candidates) = operand else {
                    return Err(OdmError::Driver(format!("`{}` expects an array", operator)));
                };
                let found = candidates
                    .iter()
                    .any(|candidate| Self::equals(value, candidate));

                if operator == "$in" { found } else { !found }
            }
            "$exists" => match operand {
                Bson::Boolean(should_exist) => value.is_some() == *should_exist,
                _ => return Err(OdmError::Driver("`$exists` expects a boolean".to_string())),
            },
            other => return Err(unsupported(other)),
        })
    }

    /// Equality as MongoDB defines it: null matches null or missing, arrays match any element.
    fn equals(value: Option<&Bson>, operand: &Bson) -> bool {
        let right = Comparable::from(operand);

        match value {
            None => right == Comparable::Null,
            Some(value) => {
                let left = Comparable::from(value);
                if left == right {
                    return true;
                }
                match left {
                    Comparable::Array(items) => items.iter().any(|item| item == &right),
                    _ => false,
                }
            }
        }
    }
}

/// Orders documents by a native sort document; missing fields sort as null.
pub(crate) fn compare_documents(left: &Document, right: &Document, sort: &Document) -> Ordering {
    for (path, direction) in sort {
        let a = lookup(left, path).map(Comparable::from).unwrap_or(Comparable::Null);
        let b = lookup(right, path).map(Comparable::from).unwrap_or(Comparable::Null);

        let ordering = match direction {
            Bson::Int32(d) if *d < 0 => b.sort_cmp(&a),
            Bson::Int64(d) if *d < 0 => b.sort_cmp(&a),
            _ => a.sort_cmp(&b),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn is_truthy(spec: &Bson) -> Option<bool> {
    match spec {
        Bson::Int32(v) => Some(*v != 0),
        Bson::Int64(v) => Some(*v != 0),
        Bson::Double(v) => Some(*v != 0.0),
        Bson::Boolean(v) => Some(*v),
        _ => None,
    }
}

/// Applies an inclusion projection, with `"$path"` values copying or renaming fields.
///
/// `_id` is kept unless excluded explicitly with `_id: 0`.
pub(crate) fn project(document: &Document, projection: &Document) -> OdmResult<Document> {
    let mut out = Document::new();

    let keep_id = projection
        .get("_id")
        .and_then(is_truthy)
        .unwrap_or(true);
    if keep_id {
        if let Some(id) = document.get("_id") {
            out.insert("_id", id.clone());
        }
    }

    for (key, spec) in projection {
        if key == "_id" {
            continue;
        }

        match spec {
            Bson::String(expression) if expression.starts_with('$') => {
                if let Some(value) = lookup(document, &expression[1..]) {
                    assign(&mut out, key, value.clone());
                }
            }
            spec => match is_truthy(spec) {
                Some(true) => {
                    if let Some(value) = lookup(document, key) {
                        assign(&mut out, key, value.clone());
                    }
                }
                _ => {
                    return Err(OdmError::Driver(format!(
                        "unsupported projection for `{}`: {}",
                        key, spec
                    )));
                }
            },
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        doc! {
            "_id": 7,
            "integer": 3,
            "tags": ["a", "b"],
            "nested": { "integer": 5, "optional": Bson::Null },
        }
    }

    fn matches(filter: Document) -> bool {
        DocumentEvaluator::new(&sample())
            .evaluate(&filter)
            .unwrap()
    }

    #[test]
    fn test_implicit_equality_and_null() {
        assert!(matches(doc! { "integer": 3 }));
        assert!(matches(doc! { "integer": 3.0 }));
        assert!(!matches(doc! { "integer": 4 }));
        assert!(matches(doc! { "nested.optional": Bson::Null }));
        assert!(matches(doc! { "missing": Bson::Null }));
        assert!(matches(doc! { "tags": "b" }));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let document = doc! { "_id": 9_007_199_254_740_993_i64 };
        let evaluate = |filter: Document| DocumentEvaluator::new(&document).evaluate(&filter).unwrap();

        assert!(evaluate(doc! { "_id": 9_007_199_254_740_993_i64 }));
        assert!(!evaluate(doc! { "_id": 9_007_199_254_740_992_i64 }));
        assert!(evaluate(doc! { "_id": { "$gt": 9_007_199_254_740_992_i64 } }));
        assert!(evaluate(doc! { "_id": { "$in": [1, 9_007_199_254_740_993_i64] } }));
    }

    #[test]
    fn test_embedded_document_equality_is_order_sensitive() {
        let document = doc! { "point": { "x": 1, "y": 2 } };
        let evaluate = |filter: Document| DocumentEvaluator::new(&document).evaluate(&filter).unwrap();

        assert!(evaluate(doc! { "point": { "x": 1, "y": 2 } }));
        assert!(!evaluate(doc! { "point": { "y": 2, "x": 1 } }));
        assert!(!evaluate(doc! { "point": { "x": 1 } }));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(matches(doc! { "integer": { "$gt": 2, "$lte": 3 } }));
        assert!(!matches(doc! { "integer": { "$lt": 3 } }));
        assert!(matches(doc! { "nested.integer": { "$gte": 5 } }));
        assert!(!matches(doc! { "missing": { "$gt": 0 } }));
        assert!(matches(doc! { "integer": { "$ne": 4 } }));
        assert!(matches(doc! { "integer": { "$in": [1, 3] } }));
        assert!(matches(doc! { "integer": { "$nin": [1, 2] } }));
        assert!(matches(doc! { "missing": { "$exists": false } }));
        assert!(matches(doc! { "nested.optional": { "$exists": true } }));
    }

    #[test]
    fn test_logical_operators() {
        assert!(matches(doc! { "$and": [{ "integer": 3 }, { "nested.integer": { "$gt": 1 } }] }));
        assert!(matches(doc! { "$or": [{ "integer": 1 }, { "nested.integer": 5 }] }));
        assert!(!matches(doc! { "$or": [{ "integer": 1 }, { "nested.integer": 1 }] }));
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        let result = DocumentEvaluator::new(&sample()).evaluate(&doc! { "integer": { "$regex": "a" } });
        assert!(matches!(result, Err(OdmError::Driver(_))));
    }

    #[test]
    fn test_sort_by_multiple_keys() {
        let a = doc! { "x": 1, "y": 2 };
        let b = doc! { "x": 1, "y": 1 };
        let c = doc! { "y": 5 };

        assert_eq!(compare_documents(&a, &b, &doc! { "x": 1, "y": -1 }), Ordering::Less);
        assert_eq!(compare_documents(&a, &b, &doc! { "x": 1, "y": 1 }), Ordering::Greater);
        assert_eq!(compare_documents(&c, &a, &doc! { "x": 1 }), Ordering::Less);
    }

    #[test]
    fn test_inclusion_and_computed_projection() {
        assert_eq!(
            project(&sample(), &doc! { "integer": 1, "i": "$nested.integer" }).unwrap(),
            doc! { "_id": 7, "integer": 3, "i": 5 }
        );
        assert_eq!(
            project(&sample(), &doc! { "_id": 0, "nested.integer": 1 }).unwrap(),
            doc! { "nested": { "integer": 5 } }
        );
    }
}
