use serde_json::Value;

use crate::aggregate::shape_name;
use crate::errors::ModelError;
use crate::form_field::FormField;

/// A value handed over by the capture engine, classified by shape.
///
/// - `Snapshot`: an ordered list written as a whole, replacing whatever was there.
/// - `Flag`: a boolean written as a whole.
/// - `Field`: one field merged into the aggregate stored under the key.
#[derive(Clone, Debug, PartialEq)]
pub enum Capture {
    Snapshot(Vec<Value>),
    Flag(bool),
    Field(FormField),
}

impl Capture {
    /// Classify an untyped value. Objects must carry a string `name` and a `value`.
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        match value {
            Value::Array(items) => Ok(Capture::Snapshot(items)),
            Value::Bool(flag) => Ok(Capture::Flag(flag)),
            Value::Object(mut map) => {
                let name = match map.remove("name") {
                    Some(Value::String(name)) => name,
                    Some(other) => {
                        return Err(ModelError::UnsupportedShape(format!(
                            "field name must be a string, found {}",
                            shape_name(&other)
                        )))
                    }
                    None => {
                        return Err(ModelError::UnsupportedShape("object without `name`".into()))
                    }
                };
                let value = map
                    .remove("value")
                    .ok_or_else(|| {
                        ModelError::UnsupportedShape(format!("field `{name}` has no `value`"))
                    })?;
                let field = FormField { name, value };
                field.validate()?;
                Ok(Capture::Field(field))
            }
            other => Err(ModelError::UnsupportedShape(shape_name(&other).to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Capture::Snapshot(_) => "snapshot",
            Capture::Flag(_) => "flag",
            Capture::Field(_) => "field",
        }
    }
}

impl From<FormField> for Capture {
    fn from(field: FormField) -> Self {
        Capture::Field(field)
    }
}

impl From<bool> for Capture {
    fn from(flag: bool) -> Self {
        Capture::Flag(flag)
    }
}

impl From<Vec<Value>> for Capture {
    fn from(items: Vec<Value>) -> Self {
        Capture::Snapshot(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_by_shape() {
        assert_eq!(
            Capture::from_value(json!(["x", "y"])).unwrap(),
            Capture::Snapshot(vec![json!("x"), json!("y")])
        );
        assert_eq!(Capture::from_value(json!(false)).unwrap(), Capture::Flag(false));
        assert_eq!(
            Capture::from_value(json!({"name": "email", "value": "a@b.com"})).unwrap(),
            Capture::Field(FormField::new("email", "a@b.com"))
        );
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(Capture::from_value(json!("plain")).is_err());
        assert!(Capture::from_value(json!(3)).is_err());
        assert!(Capture::from_value(json!(null)).is_err());
        assert!(Capture::from_value(json!({"value": "x"})).is_err());
        assert!(Capture::from_value(json!({"name": 1, "value": "x"})).is_err());
        assert!(Capture::from_value(json!({"name": "a"})).is_err());
    }
}
