//! Declarative value shapes and the validator that checks JSON values against them.
//!
//! A [`Shape`] describes what a tool argument, flow input or model answer must look
//! like. Descriptions attached to shapes are only used when the shape is rendered for
//! the model (see [`Shape::to_wire`]); they never affect validation.

use std::{collections::BTreeMap, fmt};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::{Schema, SchemaType};

/// The kind of value a [`Shape`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// A JSON string.
    String {
        /// Reject the empty string.
        non_empty: bool,
    },
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// A JSON boolean.
    Boolean,
    /// One of a fixed set of string literals.
    Enum(Vec<String>),
    /// A JSON array whose items all match the inner shape.
    Array(Box<Shape>),
    /// A JSON object with declared fields.
    Object(Vec<Field>),
    /// The inner shape or `null`.
    Nullable(Box<Shape>),
}

/// A field of an object shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Property name.
    pub name: String,
    /// Shape of the property value.
    pub shape: Shape,
    /// Whether the property must be present.
    pub required: bool,
}

impl Field {
    /// A required field.
    pub fn required(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            required: true,
        }
    }

    /// An optional field; absence (or `null`) is accepted.
    pub fn optional(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            required: false,
        }
    }
}

/// An immutable description of an expected structured value.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    kind: ShapeKind,
    description: Option<String>,
}

impl Shape {
    fn of(kind: ShapeKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    /// Any string.
    pub fn string() -> Self {
        Self::of(ShapeKind::String { non_empty: false })
    }

    /// A string that must not be empty.
    pub fn non_empty_string() -> Self {
        Self::of(ShapeKind::String { non_empty: true })
    }

    /// Any number.
    pub fn number() -> Self {
        Self::of(ShapeKind::Number)
    }

    /// An integral number.
    pub fn integer() -> Self {
        Self::of(ShapeKind::Integer)
    }

    /// A boolean.
    pub fn boolean() -> Self {
        Self::of(ShapeKind::Boolean)
    }

    /// One of the given string literals.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(ShapeKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    /// An array of `item`.
    pub fn array(item: Shape) -> Self {
        Self::of(ShapeKind::Array(Box::new(item)))
    }

    /// An object with the given fields.
    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::of(ShapeKind::Object(fields.into_iter().collect()))
    }

    /// Wraps this shape so that `null` is accepted as well.
    pub fn nullable(self) -> Self {
        if self.is_nullable() {
            return self;
        }
        Self::of(ShapeKind::Nullable(Box::new(self)))
    }

    /// Attaches a description used for model guidance.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The kind of value this shape accepts.
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// The description attached to this shape, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether `null` is an accepted value.
    pub fn is_nullable(&self) -> bool {
        matches!(self.kind, ShapeKind::Nullable(_))
    }

    /// Validates `value`, returning the value restricted to declared fields.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<Violation>> {
        validate(self, value)
    }

    /// Converts the shape into the Gemini wire schema.
    pub fn to_wire(&self) -> Schema {
        let (inner, nullable) = match &self.kind {
            ShapeKind::Nullable(inner) => (inner.as_ref(), true),
            _ => (self, false),
        };

        let mut schema = match &inner.kind {
            ShapeKind::String { .. } => Schema::of(SchemaType::String),
            ShapeKind::Number => Schema::of(SchemaType::Number),
            ShapeKind::Integer => Schema::of(SchemaType::Integer),
            ShapeKind::Boolean => Schema::of(SchemaType::Boolean),
            ShapeKind::Enum(values) => Schema {
                r#enum: Some(values.clone()),
                ..Schema::of(SchemaType::String)
            },
            ShapeKind::Array(item) => Schema {
                items: Some(Box::new(item.to_wire())),
                ..Schema::of(SchemaType::Array)
            },
            ShapeKind::Object(fields) => {
                let properties: BTreeMap<_, _> = fields
                    .iter()
                    .map(|field| (field.name.clone(), field.shape.to_wire()))
                    .collect();
                let required: Vec<_> = fields
                    .iter()
                    .filter(|field| field.required)
                    .map(|field| field.name.clone())
                    .collect();
                Schema {
                    property_ordering: Some(fields.iter().map(|f| f.name.clone()).collect()),
                    properties: Some(properties),
                    required: (!required.is_empty()).then_some(required),
                    ..Schema::of(SchemaType::Object)
                }
            }
            ShapeKind::Nullable(_) => inner.to_wire(),
        };

        schema.description = self
            .description
            .clone()
            .or_else(|| inner.description.clone());
        if nullable {
            schema.nullable = Some(true);
        }
        schema
    }

    /// Renders the wire schema as JSON, for format instructions embedded in prompts.
    pub fn to_json_schema(&self) -> Value {
        serde_json::to_value(self.to_wire()).unwrap_or(Value::Null)
    }
}

/// What went wrong at a given location.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    /// A required property is absent.
    MissingField,
    /// The value has the wrong JSON type.
    TypeMismatch {
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        found: &'static str,
    },
    /// A string is not one of the allowed literals.
    NotInEnum {
        /// The rejected value
        value: String,
        /// Allowed literals
        allowed: Vec<String>,
    },
    /// A non-empty string was required.
    EmptyString,
    /// The text could not be parsed as JSON.
    NotJson,
}

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Location of the offending value, e.g. `$.videos[0].url`.
    pub path: String,
    /// What was wrong.
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::MissingField => write!(f, "{}: required field is missing", self.path),
            ViolationKind::TypeMismatch { expected, found } => {
                write!(f, "{}: expected {}, found {}", self.path, expected, found)
            }
            ViolationKind::NotInEnum { value, allowed } => write!(
                f,
                "{}: '{}' is not one of [{}]",
                self.path,
                value,
                allowed.join(", ")
            ),
            ViolationKind::EmptyString => write!(f, "{}: must not be empty", self.path),
            ViolationKind::NotJson => write!(f, "{}: response is not valid JSON", self.path),
        }
    }
}

/// Validates `value` against `shape`.
///
/// Returns the validated value, with undeclared object properties removed, or every
/// violation found. The function is pure: the same inputs always give the same result.
pub fn validate(shape: &Shape, value: &Value) -> Result<Value, Vec<Violation>> {
    let mut violations = Vec::new();
    let checked = check(shape, value, "$", &mut violations);
    if violations.is_empty() {
        Ok(checked)
    } else {
        Err(violations)
    }
}

/// Validates `value` and deserializes the result into `T`.
pub fn validate_as<T: DeserializeOwned>(shape: &Shape, value: &Value) -> Result<T, Vec<Violation>> {
    let checked = validate(shape, value)?;
    serde_json::from_value(checked).map_err(|e| {
        vec![Violation {
            path: "$".to_string(),
            kind: ViolationKind::TypeMismatch {
                expected: "deserializable value",
                found: if e.is_data() { "incompatible data" } else { "malformed value" },
            },
        }]
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &str, expected: &'static str, value: &Value, out: &mut Vec<Violation>) -> Value {
    out.push(Violation {
        path: path.to_string(),
        kind: ViolationKind::TypeMismatch {
            expected,
            found: type_name(value),
        },
    });
    Value::Null
}

fn check(shape: &Shape, value: &Value, path: &str, out: &mut Vec<Violation>) -> Value {
    match (&shape.kind, value) {
        (ShapeKind::Nullable(_), Value::Null) => Value::Null,
        (ShapeKind::Nullable(inner), _) => check(inner, value, path, out),

        (ShapeKind::String { non_empty }, Value::String(s)) => {
            if *non_empty && s.trim().is_empty() {
                out.push(Violation {
                    path: path.to_string(),
                    kind: ViolationKind::EmptyString,
                });
            }
            value.clone()
        }
        (ShapeKind::String { .. }, _) => mismatch(path, "string", value, out),

        (ShapeKind::Number, Value::Number(_)) => value.clone(),
        (ShapeKind::Number, _) => mismatch(path, "number", value, out),

        (ShapeKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => value.clone(),
        (ShapeKind::Integer, _) => mismatch(path, "integer", value, out),

        (ShapeKind::Boolean, Value::Bool(_)) => value.clone(),
        (ShapeKind::Boolean, _) => mismatch(path, "boolean", value, out),

        (ShapeKind::Enum(allowed), Value::String(s)) => {
            if !allowed.iter().any(|a| a == s) {
                out.push(Violation {
                    path: path.to_string(),
                    kind: ViolationKind::NotInEnum {
                        value: s.clone(),
                        allowed: allowed.clone(),
                    },
                });
            }
            value.clone()
        }
        (ShapeKind::Enum(_), _) => mismatch(path, "string", value, out),

        (ShapeKind::Array(item), Value::Array(items)) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| check(item, v, &format!("{path}[{i}]"), out))
                .collect(),
        ),
        (ShapeKind::Array(_), _) => mismatch(path, "array", value, out),

        (ShapeKind::Object(fields), Value::Object(map)) => {
            let mut checked = Map::new();
            for field in fields {
                let field_path = format!("{path}.{}", field.name);
                match map.get(&field.name) {
                    Some(Value::Null) | None if !field.required => {}
                    None => out.push(Violation {
                        path: field_path,
                        kind: ViolationKind::MissingField,
                    }),
                    Some(v) => {
                        let v = check(&field.shape, v, &field_path, out);
                        checked.insert(field.name.clone(), v);
                    }
                }
            }
            Value::Object(checked)
        }
        (ShapeKind::Object(_), _) => mismatch(path, "object", value, out),
    }
}
