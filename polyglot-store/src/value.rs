//! Field values and the live snapshot.

use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A read-only callable field. Compared by identity.
#[derive(Clone)]
pub struct Method(Arc<dyn Fn(&[Json]) -> Json + Send + Sync>);

impl Method {
    pub fn new(f: impl Fn(&[Json]) -> Json + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Json]) -> Json {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Method) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// The value of one field.
///
/// `Undefined` and `Method` exist so that callers can attempt to assign
/// them; the store refuses both.
#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Data(Json),
    Method(Method),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Value::Method(_))
    }

    pub fn as_data(&self) -> Option<&Json> {
        match self {
            Value::Data(json) => Some(json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(Json::as_str)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_data().and_then(Json::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(Json::as_bool)
    }

    pub fn as_method(&self) -> Option<&Method> {
        match self {
            Value::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Equality used to suppress redundant updates. Data compares by value
    /// (numbers numerically, so `1` and `1.0` are the same), methods by
    /// identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Method(a), Value::Method(b)) => a.ptr_eq(b),
            (Value::Data(Json::Number(a)), Value::Data(Json::Number(b))) => {
                if a.is_f64() || b.is_f64() {
                    a.as_f64() == b.as_f64()
                } else {
                    a == b
                }
            }
            (Value::Data(a), Value::Data(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::Data(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Data(Json::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Data(Json::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Data(Json::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Data(Json::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Data(Json::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Data(Json::from(n))
    }
}

/// Non-finite floats have no JSON form and become [`Value::Undefined`].
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Value::Undefined, |n| Value::Data(Json::Number(n)))
    }
}

impl From<Method> for Value {
    fn from(method: Method) -> Self {
        Value::Method(method)
    }
}

/// All fields of one language.
pub type ValueRecord = HashMap<String, Value>;

/// The live record of the active language.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    fields: ValueRecord,
}

impl Snapshot {
    pub(crate) fn new(fields: ValueRecord) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String content of a field, if it holds a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn slot(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_compare_numerically() {
        assert!(Value::from(1).same(&Value::from(1.0)));
        assert!(!Value::from(1).same(&Value::from(2)));
        assert!(Value::from(json!({"a": [1, 2]})).same(&Value::from(json!({"a": [1, 2]}))));
    }

    #[test]
    fn test_methods_compare_by_identity() {
        let a = Method::new(|_| json!(1));
        let b = Method::new(|_| json!(1));

        assert!(Value::from(a.clone()).same(&Value::from(a.clone())));
        assert!(!Value::from(a).same(&Value::from(b)));
    }

    #[test]
    fn test_undefined_only_matches_itself() {
        assert!(Value::Undefined.same(&Value::Undefined));
        assert!(!Value::Undefined.same(&Value::from(json!(null))));
    }

    #[test]
    fn test_method_call() {
        let greet = Method::new(|args| json!(format!("hi {}", args[0].as_str().unwrap_or("?"))));
        assert_eq!(greet.call(&[json!("ann")]), json!("hi ann"));
    }

    #[test]
    fn test_non_finite_float_is_undefined() {
        assert!(matches!(Value::from(f64::NAN), Value::Undefined));
        assert!(matches!(Value::from(f64::INFINITY), Value::Undefined));
    }

    #[test]
    fn test_snapshot_text() {
        let snapshot = Snapshot::new(ValueRecord::from([
            ("title".to_string(), Value::from("Title")),
            ("count".to_string(), Value::from(3)),
        ]));
        assert_eq!(snapshot.text("title"), Some("Title"));
        assert_eq!(snapshot.text("count"), None);
        assert_eq!(snapshot.get("count").and_then(Value::as_f64), Some(3.0));
        assert!(!snapshot.contains("missing"));
    }
}
