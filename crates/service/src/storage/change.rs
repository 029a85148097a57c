use std::collections::BTreeMap;

use serde_json::Value;

use crate::storage::area::AreaName;

#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// One committed mutation: the changed keys and the area they live in.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub area: AreaName,
    pub changes: BTreeMap<String, ValueChange>,
}

impl StorageChange {
    pub fn single(
        area: AreaName,
        key: &str,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        let mut changes = BTreeMap::new();
        changes.insert(key.to_string(), ValueChange { old_value, new_value });
        Self { area, changes }
    }

    pub fn touches(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }
}
