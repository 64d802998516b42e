//! Parameter values bound to rendered SQL at execution time.
//!
//! Builders only render `@name` markers; the values travel separately in a
//! [`Params`] map handed to the runner for each execution.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Marker stripped from parameter names before they are stored.
const MARKER: char = '@';

/// A backend-neutral parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Json(JsonValue),
    Uuid(Uuid),
}

impl Value {
    /// Serialize any value into a `Value::Json`.
    pub fn from_json<T: Serialize>(value: &T) -> DbResult<Self> {
        serde_json::to_value(value)
            .map(Value::Json)
            .map_err(|e| DbError::invalid_argument(format!("json parameter: {e}")))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in logs and conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
            Value::Uuid(_) => "uuid",
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Value::Json(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A named parameter produced by a connector's parameter factory.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: Value,
}

impl Parameter {
    pub(crate) fn new(name: &str, value: Value) -> Self {
        Self {
            name: normalize(name).to_string(),
            value,
        }
    }

    /// Name without the marker.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the bound value.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = value.into();
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.set_value(value);
        self
    }
}

/// Name → value map for one execution.
///
/// Names are stored without the `@` marker; every lookup accepts both forms.
#[derive(Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, replacing any earlier value under the same name.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.values.insert(normalize(name).to_string(), value.into());
        self
    }

    /// Consuming form of [`set`](Self::set).
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Bind a parameter created by a connector.
    pub fn push(&mut self, param: Parameter) -> &mut Self {
        self.values.insert(param.name, param.value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(normalize(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(normalize(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl FromIterator<Parameter> for Params {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut params = Params::new();
        for param in iter {
            params.push(param);
        }
        params
    }
}

impl<'a, V: Into<Value>> FromIterator<(&'a str, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (&'a str, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.set(name, value);
        }
        params
    }
}

fn normalize(name: &str) -> &str {
    name.strip_prefix(MARKER).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_accept_either_form() {
        let params = Params::new().with("@characterID", 7).with("cash", 1200i64);
        assert_eq!(params.get("characterID"), Some(&Value::Int(7)));
        assert_eq!(params.get("@cash"), Some(&Value::Int(1200)));
        assert!(params.contains("@characterID"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn later_binding_replaces_earlier() {
        let mut params = Params::new();
        params.set("id", 1).set("@id", 2);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn json_values() {
        #[derive(Serialize)]
        struct Slot {
            bag: u8,
            index: u16,
        }
        let value = Value::from_json(&Slot { bag: 1, index: 4 }).unwrap();
        assert_eq!(value, Value::Json(serde_json::json!({"bag": 1, "index": 4})));
    }

    #[test]
    fn collect_from_pairs() {
        let params: Params = [("a", 1), ("@b", 2)].into_iter().collect();
        assert_eq!(params.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
