use serde_json::{Map, Value as JsonValue};

use crate::query::Value;

/// A present attribute of a candidate record.
#[derive(Clone)]
pub enum FieldRef<'a> {
    Value(Value),
    /// Embedded sub-record, matched by nested criteria.
    Record(&'a dyn Record),
    /// Present, but not a scalar any operator can compare (lists, blobs).
    Opaque,
}

/// Read access to the attributes of a candidate record.
///
/// `None` means the attribute is absent or null; the evaluator does not
/// distinguish the two.
pub trait Record {
    fn field(&self, name: &str) -> Option<FieldRef<'_>>;
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        (**self).field(name)
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        (**self).field(name)
    }
}

impl Record for Map<String, JsonValue> {
    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        self.get(name).and_then(json_field)
    }
}

impl Record for JsonValue {
    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match self {
            JsonValue::Object(map) => map.field(name),
            _ => None,
        }
    }
}

fn json_field(value: &JsonValue) -> Option<FieldRef<'_>> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(FieldRef::Value(Value::Bool(*b))),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldRef::Value(Value::Int(i))),
            None => n.as_f64().map(|f| FieldRef::Value(Value::Float(f))),
        },
        JsonValue::String(s) => Some(FieldRef::Value(Value::String(s.clone()))),
        JsonValue::Array(_) => Some(FieldRef::Opaque),
        JsonValue::Object(map) => Some(FieldRef::Record(map)),
    }
}
