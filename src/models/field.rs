//! Field identifiers used to locate vertices.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::PropertyBag;
use crate::naming;

/// A `(name, value)` pair identifying one or more vertices.
///
/// Fields are not guaranteed to be unique; callers are responsible for
/// choosing a sufficiently selective property (usually the identifier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: JsonValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The store key this field matches against.
    pub fn key(&self) -> String {
        naming::key_for(&self.name)
    }

    /// Returns true when `properties` holds this field's value.
    ///
    /// Numbers compare by value, so `1` matches `1.0` coming back from a
    /// store that widens integers.
    pub fn matches(&self, properties: &PropertyBag) -> bool {
        match properties.get(&self.key()) {
            Some(stored) => values_equal(stored, &self.value),
            None => false,
        }
    }
}

fn values_equal(left: &JsonValue, right: &JsonValue) -> bool {
    match (left, right) {
        (JsonValue::Number(a), JsonValue::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}
