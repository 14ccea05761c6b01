//! Projection documents for output types.

use bson::{Bson, Document};
use std::collections::BTreeSet;

use crate::schema::Schema;

/// Builds the projection document for decoding documents of `S` into `P`.
///
/// An explicit [`Schema::projection`] on `P` is used verbatim. Otherwise every declared field
/// of `P` is included; when that set equals the declared fields of `S` no projection is needed
/// and `None` is returned.
pub fn build_projection<P: Schema, S: Schema>() -> Option<Document> {
    if let Some(projection) = P::projection() {
        return Some(projection);
    }

    let target = P::field_names();
    let source: BTreeSet<&str> = S::field_names().into_iter().collect();

    if target.iter().copied().collect::<BTreeSet<_>>() == source {
        return None;
    }

    Some(
        target
            .into_iter()
            .map(|name| (name.to_string(), Bson::Int32(1)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType};
    use bson::doc;
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Full {
        string: String,
        integer: i64,
        flag: bool,
    }

    impl Schema for Full {
        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef::new("string", FieldType::String),
                FieldDef::new("integer", FieldType::Integer),
                FieldDef::new("flag", FieldType::Bool),
            ];
            FIELDS
        }
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Partial {
        string: String,
        integer: i64,
    }

    impl Schema for Partial {
        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef::new("string", FieldType::String),
                FieldDef::new("integer", FieldType::Integer),
            ];
            FIELDS
        }
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Renamed {
        string: String,
        i: i64,
    }

    impl Schema for Renamed {
        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef::new("string", FieldType::String),
                FieldDef::new("i", FieldType::Integer),
            ];
            FIELDS
        }

        fn projection() -> Option<Document> {
            Some(doc! { "string": 1, "i": "$nested.integer" })
        }
    }

    #[test]
    fn test_same_fields_need_no_projection() {
        assert_eq!(build_projection::<Full, Full>(), None);
    }

    #[test]
    fn test_subset_is_included_in_declaration_order() {
        assert_eq!(
            build_projection::<Partial, Full>(),
            Some(doc! { "string": 1, "integer": 1 })
        );
    }

    #[test]
    fn test_explicit_projection_is_used_verbatim() {
        assert_eq!(
            build_projection::<Renamed, Full>(),
            Some(doc! { "string": 1, "i": "$nested.integer" })
        );
    }
}
