//! Wire representation of response and parameter schemas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The type of a property in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String type.
    String,
    /// Number type.
    Number,
    /// Integer type.
    Integer,
    /// Boolean type.
    Boolean,
    /// Array type.
    Array,
    /// Object type.
    Object,
}

/// A schema in the OpenAPI subset understood by the Gemini API.
///
/// Used both for `responseSchema` in the generation config and for the parameters of
/// function declarations. Build it from a [`crate::schema::Shape`] with
/// [`crate::schema::Shape::to_wire`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// The type of the property.
    pub r#type: SchemaType,

    /// Optional. The format of the property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Optional. The description of the property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional. Whether the property is nullable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    /// Optional. The items of an array property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Optional. Allowed values of a string property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#enum: Option<Vec<String>>,

    /// Optional. Properties of an object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,

    /// Optional. The required properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    /// Optional. The order in which the model should emit object properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_ordering: Option<Vec<String>>,
}

impl Schema {
    /// An otherwise empty schema of the given type.
    pub fn of(r#type: SchemaType) -> Self {
        Self {
            r#type,
            format: None,
            description: None,
            nullable: None,
            items: None,
            r#enum: None,
            properties: None,
            required: None,
            property_ordering: None,
        }
    }
}
