use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;

/// A single captured input: the field's name (or id) and its current value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: Value,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    /// Values must be primitives. Any name is accepted, including an empty
    /// one for inputs that carry neither a name nor an id.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.value.is_object() || self.value.is_array() {
            return Err(ModelError::Validation(format!(
                "field `{}` value must be a string or primitive",
                self.name
            )));
        }
        Ok(())
    }
}
