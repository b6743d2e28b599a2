use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::schema::{FieldKind, FieldSpec, RecordSchema};

/// One fetched entity: ordered fixed fields plus a free-form attribute map.
///
/// Records are always decoded through a [`RecordSchema`], so every record of
/// one schema carries the same fixed fields in the same order. The attribute
/// map is whatever the tenant configured and may differ record to record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: IndexMap<String, Value>,
    attributes_key: Option<&'static str>,
    attributes: BTreeMap<String, String>,
}

impl Record {
    /// Decode a raw JSON object using the given schema.
    pub fn from_value(schema: &RecordSchema, value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            CoreError::invalid_record(format!(
                "expected an object in '{}', found {}",
                schema.collection,
                json_type(value)
            ))
        })?;

        let mut fields = IndexMap::with_capacity(schema.fields.len());
        for spec in schema.fields {
            fields.insert(spec.key.to_string(), decode_field(spec, obj.get(spec.key))?);
        }

        let attributes = match schema.attributes_key {
            Some(key) => decode_attributes(key, obj.get(key))?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            fields,
            attributes_key: schema.attributes_key,
            attributes,
        })
    }

    /// Decode every element of a JSON array.
    pub fn from_values(schema: &RecordSchema, values: &[Value]) -> Result<Vec<Self>> {
        values.iter().map(|v| Self::from_value(schema, v)).collect()
    }

    pub fn id(&self) -> Option<&str> {
        self.text("id").filter(|id| !id.is_empty())
    }

    /// Text value of a fixed field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.lookup(key).and_then(Value::as_str)
    }

    /// Flag value of a fixed field; absent flags read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.lookup(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Fixed fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Render a fixed field as a CSV cell.
    pub fn cell(&self, key: &str) -> String {
        match self.fields.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = self.fields.len() + usize::from(self.attributes_key.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        if let Some(key) = self.attributes_key {
            map.serialize_entry(key, &self.attributes)?;
        }
        map.end()
    }
}

fn decode_field(spec: &FieldSpec, value: Option<&Value>) -> Result<Value> {
    match (spec.kind, value) {
        (FieldKind::Text, None | Some(Value::Null)) => Ok(Value::String(String::new())),
        (FieldKind::Text, Some(Value::String(s))) => Ok(Value::String(s.clone())),
        (FieldKind::Flag, None | Some(Value::Null)) => Ok(Value::Bool(false)),
        (FieldKind::Flag, Some(Value::Bool(b))) => Ok(Value::Bool(*b)),
        (kind, Some(other)) => Err(CoreError::invalid_record(format!(
            "field '{}' must be {}, found {}",
            spec.key,
            match kind {
                FieldKind::Text => "a string",
                FieldKind::Flag => "a boolean",
            },
            json_type(other)
        ))),
    }
}

fn decode_attributes(key: &str, value: Option<&Value>) -> Result<BTreeMap<String, String>> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => decode_attribute_map(key, map),
        Some(other) => Err(CoreError::invalid_record(format!(
            "'{key}' must be an object, found {}",
            json_type(other)
        ))),
    }
}

fn decode_attribute_map(key: &str, map: &Map<String, Value>) -> Result<BTreeMap<String, String>> {
    map.iter()
        .map(|(name, value)| match value {
            Value::String(s) => Ok((name.clone(), s.clone())),
            Value::Null => Ok((name.clone(), String::new())),
            other => Err(CoreError::invalid_record(format!(
                "'{key}.{name}' must be a string, found {}",
                json_type(other)
            ))),
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
