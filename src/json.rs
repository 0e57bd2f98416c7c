//! Conversions between native values and JSON.

use crate::{
    convert,
    types::{Fields, Type, TypeMismatch, Value},
};
use serde_json::{Map, Number, Value as JsonValue};

pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Nil => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::U8(n) => (*n).into(),
        Value::I8(n) => (*n).into(),
        Value::U16(n) => (*n).into(),
        Value::I16(n) => (*n).into(),
        Value::U32(n) => (*n).into(),
        Value::I32(n) => (*n).into(),
        Value::U64(n) => (*n).into(),
        Value::I64(n) => (*n).into(),
        Value::Float(x) => float(f64::from(*x)),
        Value::Double(x) => float(*x),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Array(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        Value::Struct(fields) => object(fields),
        Value::Object(shared) => object(&shared.borrow()),
    }
}

fn float(x: f64) -> JsonValue {
    // JSON has no NaN or infinities.
    Number::from_f64(x).map_or(JsonValue::Null, JsonValue::Number)
}

fn object(fields: &Fields) -> JsonValue {
    JsonValue::Object(
        fields
            .iter()
            .map(|(name, value)| (name.clone(), to_json(value)))
            .collect::<Map<_, _>>(),
    )
}

/// Reads JSON without a target type: objects become copy-semantics records and numbers
/// the widest variant that holds them.
pub fn from_json_untyped(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Nil,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::I64(i)
            } else if let Some(u) = n.as_u64() {
                Value::U64(u)
            } else {
                Value::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::Array(items.iter().map(from_json_untyped).collect()),
        JsonValue::Object(map) => Value::Struct(
            map.iter()
                .map(|(name, value)| (name.clone(), from_json_untyped(value)))
                .collect(),
        ),
    }
}

pub fn from_json(json: &JsonValue, ty: &Type) -> Result<Value, TypeMismatch> {
    convert::cast(from_json_untyped(json), ty)
}
