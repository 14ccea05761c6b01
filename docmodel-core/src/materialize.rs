//! Decoding raw store documents into typed instances.
//!
//! Decoding runs in three steps:
//!
//! 1. Custom codecs declared on fields convert stored values back to their serde form.
//! 2. The document is validated against the target's [`FieldDef`]s so failures name the
//!    offending dotted path.
//! 3. `serde` builds the typed value.
//!
//! Encoding runs the same codecs in the opposite direction.

use bson::{
    Bson, Document,
    de::deserialize_from_bson,
    ser::serialize_to_bson,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

use crate::{
    codec::CodecRegistry,
    error::{OdmError, OdmResult},
    schema::{FieldDef, FieldType, Schema},
};

/// Converts between raw documents and typed values using a codec registry.
#[derive(Debug, Clone, Default)]
pub struct Materializer {
    codecs: Arc<CodecRegistry>,
}

impl Materializer {
    /// Creates a materializer backed by `codecs`.
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self { codecs }
    }

    /// Returns the codec registry.
    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Decodes a raw document into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`OdmError::Decode`] naming the field that failed codec decoding or structural
    /// validation. Serde failures that cannot be attributed to a declared field carry an empty
    /// path.
    pub fn decode<T: Schema>(&self, mut raw: Document) -> OdmResult<T> {
        decode_fields(&self.codecs, T::fields(), &mut raw, "")?;
        trace!(document = %raw, "materializing document");

        deserialize_from_bson(Bson::Document(raw)).map_err(|e| OdmError::decode("", e.to_string()))
    }

    /// Encodes a typed value into the document stored for it.
    pub fn encode<T: Schema + Serialize>(&self, value: &T) -> OdmResult<Document> {
        let mut document = match serialize_to_bson(value)? {
            Bson::Document(document) => document,
            other => {
                return Err(OdmError::Serialization(format!(
                    "expected a document, got {:?}",
                    other.element_type()
                )));
            }
        };

        encode_fields(&self.codecs, T::fields(), &mut document, "")?;
        Ok(document)
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn decode_fields(
    codecs: &CodecRegistry,
    fields: &[FieldDef],
    document: &mut Document,
    prefix: &str,
) -> OdmResult<()> {
    for def in fields {
        let path = join(prefix, def.name);

        let Some(value) = document.get_mut(def.name) else {
            if def.optional {
                continue;
            }
            return Err(OdmError::decode(path, "missing required field"));
        };

        if let Some(codec) = def.codec {
            *value = codecs
                .decode(codec, value)
                .map_err(|e| OdmError::decode(path.clone(), e))?;
        }

        if matches!(value, Bson::Null) {
            if def.optional {
                continue;
            }
            return Err(OdmError::decode(path, "null value for required field"));
        }

        // Codec output is the serde form, which need not match the stored type.
        if def.codec.is_none() && !def.ty.accepts(value) {
            return Err(OdmError::decode(
                path,
                format!("expected {}, got {:?}", def.ty.name(), value.element_type()),
            ));
        }

        if let (FieldType::Document(children), Bson::Document(inner)) = (def.ty, value) {
            decode_fields(codecs, children(), inner, &path)?;
        }
    }

    Ok(())
}

fn encode_fields(
    codecs: &CodecRegistry,
    fields: &[FieldDef],
    document: &mut Document,
    prefix: &str,
) -> OdmResult<()> {
    for def in fields {
        let Some(value) = document.get_mut(def.name) else {
            continue;
        };

        if let Some(codec) = def.codec {
            *value = codecs
                .encode(codec, value)
                .map_err(|e| OdmError::Serialization(format!("{}: {}", join(prefix, def.name), e)))?;
        }

        if let (FieldType::Document(children), Bson::Document(inner)) = (def.ty, value) {
            encode_fields(codecs, children(), inner, &join(prefix, def.name))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Color;
    use bson::doc;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Inner {
        integer: i64,
        optional: Option<String>,
    }

    impl Schema for Inner {
        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef::new("integer", FieldType::Integer),
                FieldDef::new("optional", FieldType::String).optional(),
            ];
            FIELDS
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Painted {
        color: Color,
        timestamp: DateTime<Utc>,
        inner: Inner,
    }

    impl Schema for Painted {
        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef::new("color", FieldType::String).with_codec("color"),
                FieldDef::new("timestamp", FieldType::DateTime).with_codec("timestamp"),
                FieldDef::new("inner", FieldType::Document(Inner::fields)),
            ];
            FIELDS
        }
    }

    fn materializer() -> Materializer {
        Materializer::new(Arc::new(CodecRegistry::with_defaults()))
    }

    fn painted() -> Painted {
        Painted {
            color: Color::new(0x7f, 0xff, 0xd4),
            timestamp: Utc.timestamp_millis_opt(1_714_566_645_123).unwrap(),
            inner: Inner { integer: 3, optional: None },
        }
    }

    #[test]
    fn test_encode_applies_codecs() {
        let stored = materializer().encode(&painted()).unwrap();

        assert_eq!(stored.get_str("color").unwrap(), "#7fffd4");
        assert!(matches!(stored.get("timestamp"), Some(Bson::DateTime(_))));
        assert_eq!(stored.get_document("inner").unwrap().get_i64("integer").unwrap(), 3);
    }

    #[test]
    fn test_round_trip_through_codecs() {
        let materializer = materializer();
        let stored = materializer.encode(&painted()).unwrap();
        let decoded: Painted = materializer.decode(stored).unwrap();

        assert_eq!(decoded, painted());
    }

    #[test]
    fn test_decode_error_names_nested_path() {
        let raw = doc! {
            "color": "#000000",
            "timestamp": bson::DateTime::now(),
            "inner": { "integer": "three" },
        };

        let err = materializer().decode::<Painted>(raw).unwrap_err();
        assert_eq!(err.path(), Some("inner.integer"));
    }

    #[test]
    fn test_decode_error_names_codec_field() {
        let raw = doc! {
            "color": "not a color",
            "timestamp": bson::DateTime::now(),
            "inner": { "integer": 1 },
        };

        let err = materializer().decode::<Painted>(raw).unwrap_err();
        assert_eq!(err.path(), Some("color"));
    }

    #[test]
    fn test_missing_required_field() {
        let raw = doc! { "color": "#000000", "timestamp": bson::DateTime::now() };

        let err = materializer().decode::<Painted>(raw).unwrap_err();
        assert_eq!(err.path(), Some("inner"));
    }
}
