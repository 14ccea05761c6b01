//! Procedural macros for the docmodel project.
//!
//! `#[derive(Schema)]` implements `docmodel_core::schema::Schema` for a struct with named fields
//! and generates one field accessor per field:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Schema)]
//! #[docmodel(collection = "samples", key = ObjectId)]
//! struct Sample {
//!     #[serde(rename = "_id")]
//!     id: ObjectId,
//!     #[docmodel(codec = "color")]
//!     color: Color,
//!     #[docmodel(nested)]
//!     nested: Nested,
//! }
//!
//! let filter = Sample::nested().child("integer").gte(2);
//! ```
//!
//! With `collection` the struct also implements `Model`; the key type defaults to `ObjectId`.

#[allow(unused_extern_crates)]
extern crate self as docmodel_macros;

mod decode_field;
mod decode_schema;

use decode_schema::decode_schema;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

#[proc_macro_derive(Schema, attributes(docmodel))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let metadata = decode_schema(item);
    let name = &metadata.item.ident;
    let vis = &metadata.item.vis;

    let field_defs = metadata.fields.iter().map(|f| f.field_def());
    let accessors = metadata.fields.iter().map(|f| {
        let ident = &f.ident;
        let path = &f.name;
        let doc = format!("Field expression for `{}`.", path);
        quote! {
            #[doc = #doc]
            #vis fn #ident() -> ::docmodel_core::schema::Field<Self> {
                ::docmodel_core::schema::Field::new(#path)
            }
        }
    });

    let model = metadata.collection.as_ref().map(|collection| {
        let key = metadata
            .key
            .as_ref()
            .map(|key| quote!(#key))
            .unwrap_or_else(|| quote!(::docmodel_core::bson::oid::ObjectId));
        quote! {
            impl ::docmodel_core::schema::Model for #name {
                type Key = #key;

                fn collection_name() -> &'static str {
                    #collection
                }
            }
        }
    });

    quote! {
        impl ::docmodel_core::schema::Schema for #name {
            fn fields() -> &'static [::docmodel_core::schema::FieldDef] {
                const FIELDS: &[::docmodel_core::schema::FieldDef] = &[#(#field_defs),*];
                FIELDS
            }
        }

        #model

        impl #name {
            #(#accessors)*
        }
    }
    .into()
}
