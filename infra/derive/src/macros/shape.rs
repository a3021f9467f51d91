use crate::macros::error::single_generic;
use proc_macro2::TokenStream;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{
    Attribute, Data, DataEnum, DeriveInput, Fields, FieldsNamed, GenericParam, Ident, LitStr, Token,
    parse_quote,
};

/// Container-level serde settings that influence the shape.
#[derive(Default)]
struct Container {
    rename_all: Option<String>,
    default: bool,
    transparent: bool,
}

/// Field-level serde settings that influence the shape.
#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    optional: bool,
    flatten: bool,
}

pub fn expand(mut input: DeriveInput) -> TokenStream {
    match shape_body(&input) {
        Ok(body) => {
            add_shape_bounds(&mut input);
            let name = &input.ident;
            let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
            quote! {
                #[automatically_derived]
                impl #impl_generics ::dynconf_schema::Shape for #name #ty_generics #where_clause {
                    fn shape() -> ::dynconf_schema::ShapeKind {
                        #body
                    }
                }
            }
        },
        Err(err) => err.to_compile_error(),
    }
}

fn add_shape_bounds(input: &mut DeriveInput) {
    for param in &mut input.generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(::dynconf_schema::Shape));
        }
    }
}

fn shape_body(input: &DeriveInput) -> syn::Result<TokenStream> {
    let container = parse_container(&input.attrs)?;
    let title = input.ident.to_string();

    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) if container.transparent => transparent(fields),
            Fields::Named(fields) => object(&title, fields, &container),
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                let ty = &fields.unnamed[0].ty;
                Ok(quote! { <#ty as ::dynconf_schema::Shape>::shape() })
            },
            Fields::Unnamed(fields) => Err(syn::Error::new_spanned(
                fields,
                "Shape cannot describe tuple structs with more than one field",
            )),
            Fields::Unit => Ok(quote! { ::dynconf_schema::ShapeKind::Null }),
        },
        Data::Enum(data) => unit_enum(data, &container),
        Data::Union(_) => Err(syn::Error::new_spanned(&input.ident, "Shape cannot describe unions")),
    }
}

fn transparent(fields: &FieldsNamed) -> syn::Result<TokenStream> {
    let mut kept = Vec::new();
    for field in &fields.named {
        if !parse_field(&field.attrs)?.skip {
            kept.push(&field.ty);
        }
    }
    match kept.as_slice() {
        [ty] => Ok(quote! { <#ty as ::dynconf_schema::Shape>::shape() }),
        _ => Err(syn::Error::new_spanned(fields, "transparent structs need exactly one field")),
    }
}

fn object(title: &str, fields: &FieldsNamed, container: &Container) -> syn::Result<TokenStream> {
    let mut entries = Vec::with_capacity(fields.named.len());

    for field in &fields.named {
        let attrs = parse_field(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        if attrs.flatten {
            return Err(syn::Error::new_spanned(
                field,
                "Shape does not support #[serde(flatten)] fields",
            ));
        }
        let Some(ident) = &field.ident else { continue };

        let wire = attrs.rename.unwrap_or_else(|| {
            let raw = unraw(ident);
            container.rename_all.as_deref().map_or_else(|| raw.clone(), |rule| rename_field(&raw, rule))
        });
        let optional = attrs.optional || container.default || single_generic(&field.ty, "Option").is_some();
        let ty = &field.ty;

        entries.push(quote! {
            ::dynconf_schema::FieldShape {
                name: #wire,
                optional: #optional,
                shape: <#ty as ::dynconf_schema::Shape>::shape(),
            }
        });
    }

    Ok(quote! {
        ::dynconf_schema::ShapeKind::Object(::dynconf_schema::ObjectShape {
            title: #title,
            fields: vec![#(#entries),*],
        })
    })
}

fn unit_enum(data: &DataEnum, container: &Container) -> syn::Result<TokenStream> {
    let mut names = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Shape can only describe enums whose variants are all unit variants",
            ));
        }
        let attrs = parse_field(&variant.attrs)?;
        if attrs.skip {
            continue;
        }
        let wire = attrs.rename.unwrap_or_else(|| {
            let raw = variant.ident.to_string();
            container.rename_all.as_deref().map_or_else(|| raw.clone(), |rule| rename_variant(&raw, rule))
        });
        names.push(wire);
    }

    Ok(quote! { ::dynconf_schema::ShapeKind::Enum(vec![#(#names),*]) })
}

fn parse_container(attrs: &[Attribute]) -> syn::Result<Container> {
    let mut container = Container::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                container.rename_all = deserialize_name(&meta)?;
            } else if meta.path.is_ident("default") {
                container.default = true;
                skip_value(&meta)?;
            } else if meta.path.is_ident("transparent") {
                container.transparent = true;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(container)
}

fn parse_field(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut field = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("rename") {
                field.rename = deserialize_name(&meta)?;
            } else if path.is_ident("skip") || path.is_ident("skip_deserializing") {
                field.skip = true;
            } else if path.is_ident("default") || path.is_ident("skip_serializing_if") {
                field.optional = true;
                skip_value(&meta)?;
            } else if path.is_ident("flatten") {
                field.flatten = true;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(field)
}

/// Reads `key = "x"` or `key(deserialize = "x", ..)`.
fn deserialize_name(meta: &ParseNestedMeta<'_>) -> syn::Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        let lit: LitStr = meta.value()?.parse()?;
        return Ok(Some(lit.value()));
    }
    let mut found = None;
    meta.parse_nested_meta(|inner| {
        let lit: LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("deserialize") {
            found = Some(lit.value());
        }
        Ok(())
    })?;
    Ok(found)
}

/// Consumes whatever follows an attribute key we do not interpret.
fn skip_value(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream = content.parse()?;
    }
    Ok(())
}

fn unraw(ident: &Ident) -> String {
    let text = ident.to_string();
    text.strip_prefix("r#").map_or_else(|| text.clone(), str::to_owned)
}

/// Applies a serde `rename_all` rule to a `snake_case` field name.
fn rename_field(field: &str, rule: &str) -> String {
    match rule {
        "lowercase" | "snake_case" => field.to_owned(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_ascii_uppercase(),
        "PascalCase" => pascal(field),
        "camelCase" => {
            let pascal = pascal(field);
            lower_first(&pascal)
        },
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.replace('_', "-").to_ascii_uppercase(),
        _ => field.to_owned(),
    }
}

/// Applies a serde `rename_all` rule to a `PascalCase` variant name.
fn rename_variant(variant: &str, rule: &str) -> String {
    match rule {
        "lowercase" => variant.to_ascii_lowercase(),
        "UPPERCASE" => variant.to_ascii_uppercase(),
        "camelCase" => lower_first(variant),
        "snake_case" => snake(variant),
        "SCREAMING_SNAKE_CASE" => snake(variant).to_ascii_uppercase(),
        "kebab-case" => snake(variant).replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => snake(variant).replace('_', "-").to_ascii_uppercase(),
        _ => variant.to_owned(),
    }
}

fn pascal(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = true;
    for ch in snake.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.push(ch.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn snake(pascal: &str) -> String {
    let mut out = String::with_capacity(pascal.len() + 4);
    for (i, ch) in pascal.char_indices() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_ascii_lowercase().to_string() + chars.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_rules_follow_serde() {
        assert_eq!(rename_field("max_conns", "camelCase"), "maxConns");
        assert_eq!(rename_field("max_conns", "PascalCase"), "MaxConns");
        assert_eq!(rename_field("a", "PascalCase"), "A");
        assert_eq!(rename_field("max_conns", "kebab-case"), "max-conns");
        assert_eq!(rename_field("max_conns", "SCREAMING_SNAKE_CASE"), "MAX_CONNS");
        assert_eq!(rename_field("max_conns", "SCREAMING-KEBAB-CASE"), "MAX-CONNS");
    }

    #[test]
    fn variant_rules_follow_serde() {
        assert_eq!(rename_variant("FailOpen", "snake_case"), "fail_open");
        assert_eq!(rename_variant("FailOpen", "camelCase"), "failOpen");
        assert_eq!(rename_variant("FailOpen", "kebab-case"), "fail-open");
        assert_eq!(rename_variant("FailOpen", "lowercase"), "failopen");
        assert_eq!(rename_variant("FailOpen", "SCREAMING_SNAKE_CASE"), "FAIL_OPEN");
    }

    #[test]
    fn optional_markers_are_detected() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(default, rename = "x")])];
        let parsed = parse_field(&attrs).expect("attributes parse");
        assert!(parsed.optional);
        assert_eq!(parsed.rename.as_deref(), Some("x"));

        let attrs: Vec<Attribute> =
            vec![parse_quote!(#[serde(skip_serializing_if = "String::is_empty")])];
        assert!(parse_field(&attrs).expect("attributes parse").optional);

        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(with = "humantime", alias = "y")])];
        let parsed = parse_field(&attrs).expect("attributes parse");
        assert!(!parsed.optional && !parsed.skip);
    }

    #[test]
    fn split_rename_prefers_deserialize_side() {
        let attrs: Vec<Attribute> =
            vec![parse_quote!(#[serde(rename(serialize = "out", deserialize = "in"))])];
        assert_eq!(parse_field(&attrs).expect("attributes parse").rename.as_deref(), Some("in"));
    }
}
