use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Wire form of a type as seen by the schema deriver.
///
/// Implemented by hand for primitives and containers, and by
/// `#[derive(Shape)]` for user structs and unit-only enums.
pub trait Shape {
    fn shape() -> ShapeKind;
}

/// Structural description of a JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    /// Accepts any JSON value.
    Any,
    Null,
    Boolean,
    Integer { unsigned: bool },
    Number,
    String,
    Array(Box<ShapeKind>),
    /// Object with arbitrary keys and uniform values.
    Map(Box<ShapeKind>),
    /// The inner shape or `null`.
    Nullable(Box<ShapeKind>),
    /// One of a fixed set of strings.
    Enum(Vec<&'static str>),
    Object(ObjectShape),
}

/// A struct with named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectShape {
    pub title: &'static str,
    pub fields: Vec<FieldShape>,
}

/// One field of an [`ObjectShape`], named as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub name: &'static str,
    /// Declared optionality: `Option<T>`, `#[serde(default)]` or `skip_serializing_if`.
    pub optional: bool,
    pub shape: ShapeKind,
}

macro_rules! impl_shape {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Shape for $ty {
                #[inline]
                fn shape() -> ShapeKind {
                    $kind
                }
            }
        )+
    };
}

impl_shape!(ShapeKind::Boolean => bool);
impl_shape!(ShapeKind::Integer { unsigned: true } => u8, u16, u32, u64, u128, usize);
impl_shape!(ShapeKind::Integer { unsigned: false } => i8, i16, i32, i64, i128, isize);
impl_shape!(ShapeKind::Number => f32, f64);
impl_shape!(ShapeKind::String => String, str, char, Cow<'_, str>);
impl_shape!(ShapeKind::Null => ());
impl_shape!(ShapeKind::Any => serde_json::Value);

impl<T: Shape> Shape for Option<T> {
    fn shape() -> ShapeKind {
        ShapeKind::Nullable(Box::new(T::shape()))
    }
}

macro_rules! impl_shape_seq {
    ($($ty:ident),+) => {
        $(
            impl<T: Shape> Shape for $ty<T> {
                fn shape() -> ShapeKind {
                    ShapeKind::Array(Box::new(T::shape()))
                }
            }
        )+
    };
}

impl_shape_seq!(Vec, VecDeque, BTreeSet);

impl<T: Shape, S> Shape for HashSet<T, S> {
    fn shape() -> ShapeKind {
        ShapeKind::Array(Box::new(T::shape()))
    }
}

impl<T: Shape> Shape for [T] {
    fn shape() -> ShapeKind {
        ShapeKind::Array(Box::new(T::shape()))
    }
}

impl<T: Shape, const N: usize> Shape for [T; N] {
    fn shape() -> ShapeKind {
        ShapeKind::Array(Box::new(T::shape()))
    }
}

impl<T: Shape, S> Shape for HashMap<String, T, S> {
    fn shape() -> ShapeKind {
        ShapeKind::Map(Box::new(T::shape()))
    }
}

impl<T: Shape> Shape for BTreeMap<String, T> {
    fn shape() -> ShapeKind {
        ShapeKind::Map(Box::new(T::shape()))
    }
}

macro_rules! impl_shape_pointer {
    ($($ty:ident),+) => {
        $(
            impl<T: Shape + ?Sized> Shape for $ty<T> {
                fn shape() -> ShapeKind {
                    T::shape()
                }
            }
        )+
    };
}

impl_shape_pointer!(Box, Arc);

impl<T: Shape + ?Sized> Shape for &T {
    fn shape() -> ShapeKind {
        T::shape()
    }
}
