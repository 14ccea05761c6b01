use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{
    Field, GenericArgument, Ident, LitStr, PathArguments, Type, ext::IdentExt, parse::ParseBuffer,
    token::Paren,
};

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) name: String,
    pub(crate) field_type: TokenStream,
    pub(crate) optional: bool,
    pub(crate) codec: Option<String>,
    pub(crate) skipped: bool,
}

/// Returns the last path segment of a type together with its angle-bracketed type arguments.
fn last_segment(ty: &Type) -> Option<(String, Vec<&Type>)> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let args = match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Some((segment.ident.to_string(), args))
}

/// Strips `Option<..>` and reports whether it was present.
fn unwrap_option(ty: &Type) -> (&Type, bool) {
    match last_segment(ty) {
        Some((name, args)) if name == "Option" && args.len() == 1 => (args[0], true),
        _ => (ty, false),
    }
}

fn infer_field_type(ty: &Type) -> TokenStream {
    let Some((name, args)) = last_segment(ty) else {
        return quote!(::docmodel_core::schema::FieldType::Any);
    };
    match name.as_str() {
        "bool" => quote!(::docmodel_core::schema::FieldType::Bool),
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "isize" | "usize" => {
            quote!(::docmodel_core::schema::FieldType::Integer)
        }
        "f32" | "f64" => quote!(::docmodel_core::schema::FieldType::Double),
        "String" => quote!(::docmodel_core::schema::FieldType::String),
        "ObjectId" => quote!(::docmodel_core::schema::FieldType::ObjectId),
        // bson::DateTime; chrono's DateTime<Tz> is serialized as a string.
        "DateTime" if args.is_empty() => quote!(::docmodel_core::schema::FieldType::DateTime),
        "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => {
            quote!(::docmodel_core::schema::FieldType::Array)
        }
        _ => quote!(::docmodel_core::schema::FieldType::Any),
    }
}

/// Reads `#[serde(..)]` arguments that change how a field is stored.
fn decode_serde(field: &Field, metadata: &mut FieldMetadata) {
    for attr in &field.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let Ok(list) = attr.meta.require_list() else {
            continue;
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("rename") && arg.input.peek(syn::Token![=]) {
                let v = arg.value()?.parse::<LitStr>()?;
                metadata.name = v.value();
            } else if arg.path.is_ident("skip") || arg.path.is_ident("skip_deserializing") {
                metadata.skipped = true;
            } else if arg.path.is_ident("default") {
                metadata.optional = true;
                if arg.input.peek(syn::Token![=]) {
                    arg.value()?.parse::<LitStr>()?;
                }
            } else if arg.input.peek(syn::Token![=]) {
                arg.value()?.parse::<syn::Expr>()?;
            } else if arg.input.peek(Paren) {
                let content;
                syn::parenthesized!(content in arg.input);
                content.parse::<TokenStream>()?;
            }
            Ok(())
        });
    }
}

pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Schema can only be derived for structs with named fields");
    let (inner, optional) = unwrap_option(&field.ty);
    let mut metadata = FieldMetadata {
        name: ident.unraw().to_string(),
        ident,
        field_type: infer_field_type(inner),
        optional,
        codec: None,
        skipped: false,
    };
    decode_serde(field, &mut metadata);
    for attr in &field.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("docmodel") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `docmodel`, use it like: `#[docmodel(attribute = value, ..)]`");
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident("codec") {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!("Error while parsing `codec`, use it like: `#[docmodel(codec = \"color\")]`");
                    };
                    metadata.codec = Some(v.value());
                } else if arg.path.is_ident("nested") {
                    let Err(..) = arg.value() else {
                        panic!("Error while parsing `nested`, use it like: `#[docmodel(nested)]`");
                    };
                    metadata.field_type = quote! {
                        ::docmodel_core::schema::FieldType::Document(
                            <#inner as ::docmodel_core::schema::Schema>::fields
                        )
                    };
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
    metadata
}

impl FieldMetadata {
    /// Tokens of the `FieldDef` constant describing this field.
    pub(crate) fn field_def(&self) -> TokenStream {
        let name = &self.name;
        let ty = &self.field_type;
        let mut def = quote!(::docmodel_core::schema::FieldDef::new(#name, #ty));
        if self.optional {
            def = quote!(#def.optional());
        }
        if let Some(codec) = &self.codec {
            def = quote!(#def.with_codec(#codec));
        }
        def
    }
}
