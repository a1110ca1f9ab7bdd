//! Conversion between event values (`serde_json::Value`) and Rhai values.

use rhai::{Array, Dynamic, Map};
use serde_json::{Number, Value};
use sf_types::Fields;

/// Converts an event value to a Rhai value.
///
/// `null` becomes `()`, integers that fit in `i64` become Rhai integers and
/// every other number becomes a float.
pub fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Dynamic::from(i),
            None => Dynamic::from(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => {
            let arr: Array = items.iter().map(value_to_dynamic).collect();
            Dynamic::from(arr)
        }
        Value::Object(fields) => fields_to_dynamic(fields),
    }
}

/// Converts an object to a Rhai object map.
pub fn fields_to_dynamic(fields: &Fields) -> Dynamic {
    let map: Map = fields
        .iter()
        .map(|(k, v)| (k.as_str().into(), value_to_dynamic(v)))
        .collect();
    Dynamic::from(map)
}

/// Converts a Rhai value to an event value.
///
/// # Errors
///
/// Returns a description of the offending value if it has no event
/// representation (function pointers, custom types, non-finite floats).
pub fn dynamic_to_value(value: &Dynamic) -> Result<Value, String> {
    if value.is_unit() {
        Ok(Value::Null)
    } else if value.is_bool() {
        Ok(Value::Bool(value.as_bool().map_err(type_error)?))
    } else if value.is_int() {
        Ok(Value::Number(Number::from(value.as_int().map_err(type_error)?)))
    } else if value.is_float() {
        let float = value.as_float().map_err(type_error)?;
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| format!("cannot store non-finite number {float}"))
    } else if value.is_string() {
        Ok(Value::String(value.clone().into_string().map_err(type_error)?))
    } else if value.is_char() {
        Ok(Value::String(value.as_char().map_err(type_error)?.to_string()))
    } else if value.is_array() {
        let arr = value.clone().into_array().map_err(type_error)?;
        arr.iter()
            .map(dynamic_to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    } else if value.is_map() {
        let map = value.clone().cast::<Map>();
        map.iter()
            .map(|(k, v)| dynamic_to_value(v).map(|v| (k.to_string(), v)))
            .collect::<Result<Fields, _>>()
            .map(Value::Object)
    } else if value.is_timestamp() {
        Err("cannot store a timestamp; use timestamp() for an RFC 3339 string".to_string())
    } else {
        Err(format!("cannot store a value of type {}", value.type_name()))
    }
}

fn type_error(found: &str) -> String {
    format!("unexpected value of type {found}")
}
