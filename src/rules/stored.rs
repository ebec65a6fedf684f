//! Loose view over stored `{name, parameters}` objects read back from ARM

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::CdnError;

#[derive(Debug, Deserialize)]
pub struct StoredItem {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl StoredItem {
    pub fn from_value(value: &Value) -> Result<Self, CdnError> {
        StoredItem::deserialize(value)
            .map_err(|e| CdnError::InvalidArgument(format!("malformed rule item: {}", e)))
    }

    pub fn str(&self, key: &str) -> Option<String> {
        str_field(&self.parameters, key)
    }

    pub fn strings(&self, key: &str) -> Option<Vec<String>> {
        string_list(&self.parameters, key)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.parameters.get(key).and_then(Value::as_bool)
    }

    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.parameters.get(key).and_then(Value::as_object)
    }
}

pub fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Accepts either a JSON array of strings or a comma separated string
pub fn string_list(map: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    match map.get(key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
        ),
        Value::String(s) => Some(s.split(',').map(|p| p.trim().to_string()).collect()),
        _ => None,
    }
}
