use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;
use crate::form_field::FormField;

/// Field name -> last written value, stored as one JSON object under a single key.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct AggregateRecord {
    fields: BTreeMap<String, Value>,
}

impl AggregateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored value. Only JSON objects are aggregates.
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        match value {
            Value::Object(map) => Ok(Self { fields: map.into_iter().collect() }),
            other => Err(ModelError::UnsupportedShape(format!(
                "expected an object aggregate, found {}",
                shape_name(&other)
            ))),
        }
    }

    /// Overwrite the entry for `field.name`; returns the previous value if any.
    pub fn merge(&mut self, field: FormField) -> Option<Value> {
        self.fields.insert(field.name, field.value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields.into_iter().collect())
    }
}

pub(crate) fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_keeps_last_value_per_field() {
        let mut record = AggregateRecord::new();
        assert!(record.merge(FormField::new("email", "a@b.com")).is_none());
        record.merge(FormField::new("phone", "123"));
        let prev = record.merge(FormField::new("email", "c@d.com"));

        assert_eq!(prev, Some(json!("a@b.com")));
        assert_eq!(record.len(), 2);
        assert_eq!(record.into_value(), json!({"email": "c@d.com", "phone": "123"}));
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(AggregateRecord::from_value(json!(["x"])).is_err());
        assert!(AggregateRecord::from_value(json!(true)).is_err());
        let record = AggregateRecord::from_value(json!({"a": 1})).unwrap();
        assert_eq!(record.get("a"), Some(&json!(1)));
    }
}
