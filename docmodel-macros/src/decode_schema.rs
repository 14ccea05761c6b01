use crate::decode_field::{FieldMetadata, decode_field};
use quote::ToTokens;
use syn::{Fields, ItemStruct, LitStr, Type, parse::ParseBuffer};

pub(crate) struct SchemaMetadata {
    pub(crate) item: ItemStruct,
    pub(crate) fields: Vec<FieldMetadata>,
    pub(crate) collection: Option<String>,
    pub(crate) key: Option<Type>,
}

pub(crate) fn decode_schema(item: ItemStruct) -> SchemaMetadata {
    if !item.generics.params.is_empty() {
        panic!("Schema cannot be derived for generic structs");
    }
    let Fields::Named(named) = &item.fields else {
        panic!("Schema can only be derived for structs with named fields");
    };
    let fields = named
        .named
        .iter()
        .map(decode_field)
        .filter(|f| !f.skipped)
        .collect();
    let mut collection = None;
    let mut key = None;
    for attr in &item.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("docmodel") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `docmodel`, use it like: `#[docmodel(attribute = value, ..)]`");
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident("collection") {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!("Error while parsing `collection`, use it like: `#[docmodel(collection = \"samples\")]`");
                    };
                    collection = Some(v.value());
                } else if arg.path.is_ident("key") {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<Type>) else {
                        panic!("Error while parsing `key`, use it like: `#[docmodel(key = ObjectId)]`");
                    };
                    key = Some(v);
                } else {
                    panic!(
                        "Unknown attribute `{}` inside docmodel macro",
                        arg.path.to_token_stream()
                    );
                }
                Ok(())
            });
        }
    }
    if key.is_some() && collection.is_none() {
        panic!("`key` requires a collection, use it like: `#[docmodel(collection = \"samples\", key = ObjectId)]`");
    }
    SchemaMetadata { item, fields, collection, key }
}
