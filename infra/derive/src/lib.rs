#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the dynconf crates.
//!
//! * [`macro@dynconf_error`] turns an enum into a context-aware error type.
//! * [`macro@Shape`] describes a type's wire shape so a validation schema
//!   can be derived from it at runtime.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining domain error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context()`
///   to `Result<T, Name>` and to results of every wrapped source error.
/// * **Standard Conversions**: Implements `From<Source>` for variants with a `source` field
///   (or a field marked `#[from]`), so `?` works on upstream errors. Marking the field
///   `#[source]` skips the conversion, which lets several variants wrap the same type.
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an `Internal`
///   variant is present.
///
/// # Requirements
///
/// 1. Must be applied to an **enum** with named-field variants only.
/// 2. Variants that carry a source must also carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use dynconf_derive::dynconf_error;
/// use std::borrow::Cow;
///
/// #[dynconf_error]
/// pub enum LoadError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn dynconf_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}

/// Derives `dynconf_schema::Shape` from a struct or unit-only enum.
///
/// The derive reads the `#[serde(...)]` attributes that change the wire form:
///
/// * `rename` / container `rename_all` pick the field (or variant) name.
/// * `skip` / `skip_deserializing` drop a field from the shape.
/// * `default` (field or container), `skip_serializing_if` and `Option<_>` fields
///   are declared *optional*.
/// * `flatten` is rejected, since flattened fields have no stable path.
///
/// # Example
///
/// ```rust,ignore
/// use dynconf_derive::Shape;
///
/// #[derive(Shape, serde::Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Limits {
///     #[serde(default)]
///     max_conns: u32,
///     burst: Option<u32>,
/// }
/// ```
#[proc_macro_derive(Shape, attributes(serde))]
pub fn derive_shape(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::shape::expand(input).into()
}
