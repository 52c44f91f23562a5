//! Typed view over the schema section of an OpenAPI document.
//!
//! Only the keywords the enum harvester walks are modelled; everything else
//! in the document is ignored during deserialization.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{MergeError, Result};
use crate::loader::SpecDocument;

/// Schema containers of OpenAPI 3 (`components.schemas`) and Swagger 2
/// (`definitions`).
#[derive(Debug, Default, Deserialize)]
struct SchemaRoot {
    components: Option<Components>,
    definitions: Option<BTreeMap<String, Schema>>,
}

#[derive(Debug, Default, Deserialize)]
struct Components {
    schemas: Option<BTreeMap<String, Schema>>,
}

/// The slice of a JSON Schema object the harvester needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    /// `type`
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// Object members by name.
    pub properties: Option<BTreeMap<String, Schema>>,
    /// Array element schema.
    pub items: Option<Box<Schema>>,
    /// `enum`
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<EnumValue>>,
    /// `allOf`
    #[serde(rename = "allOf")]
    pub all_of: Option<Vec<Schema>>,
    /// `anyOf`
    #[serde(rename = "anyOf")]
    pub any_of: Option<Vec<Schema>>,
    /// `oneOf`
    #[serde(rename = "oneOf")]
    pub one_of: Option<Vec<Schema>>,
}

/// Raw `enum` member; only strings end up in the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    /// String member.
    String(String),
    /// Integral member.
    Integer(i64),
    /// Fractional member.
    Float(f64),
    /// Boolean member.
    Bool(bool),
    /// `null`
    Null,
}

/// `type: string` or, in OpenAPI 3.1, `type: [string, "null"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    /// One type name.
    Single(String),
    /// A type list.
    Multiple(Vec<String>),
}

impl Schema {
    /// True when `name` is the type or one of the listed types.
    pub fn has_type(&self, name: &str) -> bool {
        match &self.schema_type {
            Some(SchemaType::Single(t)) => t == name,
            Some(SchemaType::Multiple(types)) => types.iter().any(|t| t == name),
            None => false,
        }
    }

    /// Values of a `type: string` enum. `null` members are skipped; any other
    /// non-string member disqualifies the enum.
    pub fn string_enum(&self) -> Option<Vec<String>> {
        if !self.has_type("string") {
            return None;
        }
        let values = self.enum_values.as_ref()?;
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            match value {
                EnumValue::String(s) => out.push(s.clone()),
                EnumValue::Null => {}
                _ => return None,
            }
        }
        (!out.is_empty()).then_some(out)
    }

    /// Composed sub-schemas (`allOf`, `anyOf`, `oneOf`).
    pub fn composed(&self) -> impl Iterator<Item = &Schema> {
        self.all_of
            .iter()
            .chain(self.any_of.iter())
            .chain(self.one_of.iter())
            .flatten()
    }
}

/// Named schemas of a document, sorted by name.
pub fn named_schemas(doc: &SpecDocument) -> Result<BTreeMap<String, Schema>> {
    let root = SchemaRoot::deserialize(&doc.root).map_err(|err| MergeError::Parse {
        origin: format!("{} schemas", doc.service_id),
        reason: err.to_string(),
    })?;
    let mut schemas = root.definitions.unwrap_or_default();
    if let Some(components) = root.components.and_then(|c| c.schemas) {
        schemas.extend(components);
    }
    Ok(schemas)
}

/// Document title, used only for log context.
pub fn title(doc: &SpecDocument) -> Option<&str> {
    doc.root.get("info")?.get("title").and_then(Value::as_str)
}
