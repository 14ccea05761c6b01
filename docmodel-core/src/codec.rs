//! Custom value codecs.
//!
//! A [`FieldCodec`] converts between the serde representation of a field value and the value
//! actually stored. Fields opt into a codec by name through their
//! [`FieldDef`](crate::schema::FieldDef); the codecs themselves live in an explicit
//! [`CodecRegistry`] owned by the store, so there is no process-wide mutable state.
//!
//! Two codecs are provided:
//!
//! - [`ColorCodec`] (`"color"`) stores a [`Color`] as a `#rrggbb` hex string.
//! - [`TimestampCodec`] (`"timestamp"`) stores RFC 3339 text (how `chrono` serializes
//!   date-times) as a native BSON date-time.

use bson::{Bson, DateTime, doc};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use crate::error::OdmError;

/// Bidirectional conversion of a single field value.
///
/// Implementations must pass `Bson::Null` through unchanged.
pub trait FieldCodec: Send + Sync + fmt::Debug {
    /// Converts a serde-produced value into its stored form.
    fn encode(&self, value: &Bson) -> Result<Bson, String>;

    /// Converts a stored value back into the form serde expects.
    fn decode(&self, value: &Bson) -> Result<Bson, String>;
}

/// A set of named codecs.
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<&'static str, Arc<dyn FieldCodec>>,
}

impl CodecRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder::default()
    }

    /// Returns a registry with the built-in `color` and `timestamp` codecs.
    pub fn with_defaults() -> Self {
        CodecRegistry::builder()
            .register("color", ColorCodec)
            .register("timestamp", TimestampCodec)
            .build()
    }

    /// Looks up a codec by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn FieldCodec>> {
        self.codecs.get(name)
    }

    /// Encodes a value through the named codec; unknown codecs leave the value unchanged.
    pub fn encode(&self, name: &str, value: &Bson) -> Result<Bson, String> {
        match self.get(name) {
            Some(codec) => codec.encode(value),
            None => Ok(value.clone()),
        }
    }

    /// Decodes a value through the named codec; unknown codecs leave the value unchanged.
    pub fn decode(&self, name: &str, value: &Bson) -> Result<Bson, String> {
        match self.get(name) {
            Some(codec) => codec.decode(value),
            None => Ok(value.clone()),
        }
    }
}

/// Builder for [`CodecRegistry`].
#[derive(Default)]
pub struct CodecRegistryBuilder {
    codecs: HashMap<&'static str, Arc<dyn FieldCodec>>,
}

impl CodecRegistryBuilder {
    /// Registers a codec under `name`, replacing any previous codec with that name.
    pub fn register(mut self, name: &'static str, codec: impl FieldCodec + 'static) -> Self {
        self.codecs.insert(name, Arc::new(codec));
        self
    }

    /// Builds the registry.
    pub fn build(self) -> CodecRegistry {
        CodecRegistry { codecs: self.codecs }
    }
}

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Creates a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Returns the `#rrggbb` representation.
    pub fn as_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = OdmError;

    /// Parses `rrggbb`, `#rrggbb`, `rgb` or `#rgb`, case-insensitive.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || OdmError::InvalidArgument(format!("`{}` is not a hex color", text));
        let hex = text.trim().trim_start_matches('#');

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match hex.len() {
            6 => Ok(Color::new(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let double = |i: usize| channel(hex[i..i + 1].repeat(2).as_str());
                Ok(Color::new(double(0)?, double(1)?, double(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

impl From<Color> for Bson {
    fn from(color: Color) -> Self {
        Bson::Document(doc! {
            "r": color.r as i32,
            "g": color.g as i32,
            "b": color.b as i32,
        })
    }
}

/// Stores [`Color`] values as `#rrggbb` strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorCodec;

impl ColorCodec {
    fn channel(doc: &bson::Document, key: &str) -> Result<u8, String> {
        let value = match doc.get(key) {
            Some(Bson::Int32(v)) => *v as i64,
            Some(Bson::Int64(v)) => *v,
            _ => return Err(format!("color channel `{}` is missing or not an integer", key)),
        };
        u8::try_from(value).map_err(|_| format!("color channel `{}` out of range: {}", key, value))
    }
}

impl FieldCodec for ColorCodec {
    fn encode(&self, value: &Bson) -> Result<Bson, String> {
        match value {
            Bson::Null => Ok(Bson::Null),
            Bson::Document(doc) => Ok(Bson::String(
                Color::new(
                    Self::channel(doc, "r")?,
                    Self::channel(doc, "g")?,
                    Self::channel(doc, "b")?,
                )
                .as_hex(),
            )),
            Bson::String(text) => Color::from_str(text)
                .map(|color| Bson::String(color.as_hex()))
                .map_err(|e| e.to_string()),
            other => Err(format!("cannot encode {:?} as a color", other.element_type())),
        }
    }

    fn decode(&self, value: &Bson) -> Result<Bson, String> {
        match value {
            Bson::Null => Ok(Bson::Null),
            Bson::String(text) => Color::from_str(text)
                .map(Bson::from)
                .map_err(|e| e.to_string()),
            other => Err(format!("expected a hex color string, got {:?}", other.element_type())),
        }
    }
}

/// Stores RFC 3339 timestamps as native BSON date-times (millisecond precision).
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCodec;

impl FieldCodec for TimestampCodec {
    fn encode(&self, value: &Bson) -> Result<Bson, String> {
        match value {
            Bson::Null | Bson::DateTime(_) => Ok(value.clone()),
            Bson::String(text) => chrono::DateTime::parse_from_rfc3339(text)
                .map(|parsed| Bson::DateTime(DateTime::from_chrono(parsed.with_timezone(&Utc))))
                .map_err(|e| format!("invalid timestamp `{}`: {}", text, e)),
            other => Err(format!("cannot encode {:?} as a timestamp", other.element_type())),
        }
    }

    fn decode(&self, value: &Bson) -> Result<Bson, String> {
        match value {
            Bson::Null | Bson::String(_) => Ok(value.clone()),
            Bson::DateTime(dt) => Ok(Bson::String(
                dt.to_chrono()
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            )),
            other => Err(format!("expected a datetime, got {:?}", other.element_type())),
        }
    }
}
