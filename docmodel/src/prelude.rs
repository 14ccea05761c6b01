//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```

pub use docmodel_core::{
    codec::{CodecRegistry, Color, ColorCodec, FieldCodec, TimestampCodec},
    collection::TypedCollection,
    driver::{Driver, DriverBuilder, FindSpec},
    error::{OdmError, OdmResult},
    find::{FindArgs, FindMany, FindOne},
    predicate::{CompareOp, Predicate},
    schema::{Field, FieldDef, FieldType, Model, PrimaryKey, Schema},
    session::Session,
    sort::{SortArg, SortDirection, SortKey},
    store::DocumentStore,
};
pub use docmodel_macros::Schema;
