use crate::shape::{FieldShape, Shape, ShapeKind};
use crate::violation::{Rule, Violation, Violations};
use serde_json::{Map, Value, json};
use std::fmt;

/// Decides whether an object field must be present in a payload.
///
/// `depth` counts the objects between the root and the field's owner: fields
/// of the root object are at depth 0, fields of an object nested in one of
/// them at depth 1, and so on. Arrays, maps and nullables do not add depth.
pub trait RequirednessRule: fmt::Debug + Send + Sync {
    fn is_required(&self, field: &FieldShape, depth: usize) -> bool;
}

/// Keeps the declared optionality of the root object's fields and marks every
/// field below it as required.
///
/// The root is the envelope that carries the slot name; everything under it is
/// the value, where a missing field usually means a typo upstream.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictRule;

impl RequirednessRule for StrictRule {
    fn is_required(&self, field: &FieldShape, depth: usize) -> bool {
        depth > 0 || !field.optional
    }
}

/// Uses declared optionality everywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredRule;

impl RequirednessRule for DeclaredRule {
    fn is_required(&self, field: &FieldShape, _depth: usize) -> bool {
        !field.optional
    }
}

/// A schema node with requiredness already decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Any,
    Null,
    Boolean,
    Integer { unsigned: bool },
    Number,
    String,
    Array(Box<Node>),
    Map(Box<Node>),
    Nullable(Box<Node>),
    Enum(Vec<&'static str>),
    Object(ObjectNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNode {
    pub title: &'static str,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: &'static str,
    pub required: bool,
    pub node: Node,
}

/// A derived, immutable validation schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    root: Node,
}

impl Schema {
    /// Derives the schema of `T` under `rule`.
    ///
    /// Recursive types are not supported and will not terminate.
    pub fn derive<T: Shape + ?Sized>(rule: &dyn RequirednessRule) -> Self {
        Self { root: build(T::shape(), rule, 0) }
    }

    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// Checks `instance` and collects every violation.
    ///
    /// Violations are ordered by a depth-first walk: missing fields and type
    /// errors in declared field order, then unknown fields of the same object.
    ///
    /// # Errors
    /// Returns the full list when at least one violation was found.
    pub fn validate(&self, instance: &Value) -> Result<(), Violations> {
        let mut found = Vec::new();
        check(&self.root, instance, "", &mut found);
        if found.is_empty() { Ok(()) } else { Err(Violations::new(found)) }
    }

    /// JSON Schema rendering with objects closed to unknown fields.
    ///
    /// Properties are sorted by name and `required` keeps declaration order,
    /// so the output is byte-identical across runs.
    #[must_use]
    pub fn to_json(&self) -> Value {
        render(&self.root)
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }
}

fn build(kind: ShapeKind, rule: &dyn RequirednessRule, depth: usize) -> Node {
    match kind {
        ShapeKind::Any => Node::Any,
        ShapeKind::Null => Node::Null,
        ShapeKind::Boolean => Node::Boolean,
        ShapeKind::Integer { unsigned } => Node::Integer { unsigned },
        ShapeKind::Number => Node::Number,
        ShapeKind::String => Node::String,
        ShapeKind::Array(inner) => Node::Array(Box::new(build(*inner, rule, depth))),
        ShapeKind::Map(inner) => Node::Map(Box::new(build(*inner, rule, depth))),
        ShapeKind::Nullable(inner) => Node::Nullable(Box::new(build(*inner, rule, depth))),
        ShapeKind::Enum(variants) => Node::Enum(variants),
        ShapeKind::Object(object) => Node::Object(ObjectNode {
            title: object.title,
            properties: object
                .fields
                .into_iter()
                .map(|field| Property {
                    name: field.name,
                    required: rule.is_required(&field, depth),
                    node: build(field.shape, rule, depth + 1),
                })
                .collect(),
        }),
    }
}

fn child(path: &str, name: &str) -> String {
    if path.is_empty() { name.to_owned() } else { format!("{path}.{name}") }
}

fn check(node: &Node, value: &Value, path: &str, found: &mut Vec<Violation>) {
    let mismatch = |expected: &'static str| Violation::new(path, Rule::InvalidType {
        expected,
        found: kind_of(value),
    });

    match node {
        Node::Any => {},
        Node::Null if !value.is_null() => found.push(mismatch("null")),
        Node::Boolean if !value.is_boolean() => found.push(mismatch("boolean")),
        Node::Integer { unsigned: true } if value.as_u64().is_none() => {
            found.push(mismatch("non-negative integer"));
        },
        Node::Integer { unsigned: false } if value.as_i64().is_none() && value.as_u64().is_none() => {
            found.push(mismatch("integer"));
        },
        Node::Number if !value.is_number() => found.push(mismatch("number")),
        Node::String if !value.is_string() => found.push(mismatch("string")),
        Node::Array(inner) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    check(inner, item, &format!("{path}[{i}]"), found);
                }
            },
            None => found.push(mismatch("array")),
        },
        Node::Map(inner) => match value.as_object() {
            Some(entries) => {
                for (key, entry) in entries {
                    check(inner, entry, &child(path, key), found);
                }
            },
            None => found.push(mismatch("object")),
        },
        Node::Nullable(inner) => {
            if !value.is_null() {
                check(inner, value, path, found);
            }
        },
        Node::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => {},
            Some(_) => found.push(Violation::new(path, Rule::NotInEnum { allowed: allowed.clone() })),
            None => found.push(mismatch("string")),
        },
        Node::Object(object) => match value.as_object() {
            Some(fields) => check_object(object, fields, path, found),
            None => found.push(mismatch("object")),
        },
        _ => {},
    }
}

fn check_object(object: &ObjectNode, fields: &Map<String, Value>, path: &str, found: &mut Vec<Violation>) {
    for property in &object.properties {
        let at = child(path, property.name);
        match fields.get(property.name) {
            Some(value) => check(&property.node, value, &at, found),
            None if property.required => found.push(Violation::new(&at, Rule::Required)),
            None => {},
        }
    }

    for key in fields.keys() {
        if !object.properties.iter().any(|p| p.name == key) {
            found.push(Violation::new(&child(path, key), Rule::NotAllowed));
        }
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn render(node: &Node) -> Value {
    match node {
        Node::Any => json!({}),
        Node::Null => json!({ "type": "null" }),
        Node::Boolean => json!({ "type": "boolean" }),
        Node::Integer { unsigned: true } => json!({ "type": "integer", "minimum": 0 }),
        Node::Integer { unsigned: false } => json!({ "type": "integer" }),
        Node::Number => json!({ "type": "number" }),
        Node::String => json!({ "type": "string" }),
        Node::Array(inner) => json!({ "type": "array", "items": render(inner) }),
        Node::Map(inner) => json!({ "type": "object", "additionalProperties": render(inner) }),
        Node::Nullable(inner) => json!({ "anyOf": [render(inner), { "type": "null" }] }),
        Node::Enum(variants) => json!({ "type": "string", "enum": variants }),
        Node::Object(object) => {
            let properties: Map<String, Value> = object
                .properties
                .iter()
                .map(|p| (p.name.to_owned(), render(&p.node)))
                .collect();
            let required: Vec<&str> =
                object.properties.iter().filter(|p| p.required).map(|p| p.name).collect();
            json!({
                "type": "object",
                "title": object.title,
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            })
        },
    }
}
