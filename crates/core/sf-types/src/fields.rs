//! Dotted-path operations over nested JSON objects.
//!
//! A key such as `"a.b.c"` walks nested objects: `a` and `b` must be objects,
//! `c` is the leaf. Keys never contain an escaped dot.

use serde_json::{Map, Value};
use sf_error::FieldError;

/// A field tree: ordered map of string keys to JSON values.
pub type Fields = Map<String, Value>;

/// Returns a short name for the JSON type of a value, used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Dotted-path access for [`Fields`].
pub trait FieldsExt {
    /// Returns the value at `key`, or `None` if any segment is missing or
    /// an intermediate segment is not an object.
    fn get_path(&self, key: &str) -> Option<&Value>;

    /// Mutable variant of [`FieldsExt::get_path`].
    fn get_path_mut(&mut self, key: &str) -> Option<&mut Value>;

    /// Stores `value` at `key`, creating intermediate objects as needed.
    ///
    /// Returns the previous value, if any. Fails if an intermediate segment
    /// holds something other than an object.
    fn put_path(&mut self, key: &str, value: Value) -> Result<Option<Value>, FieldError>;

    /// Removes and returns the value at `key`.
    fn delete_path(&mut self, key: &str) -> Result<Value, FieldError>;

    /// Returns true if a value exists at `key`.
    fn has_path(&self, key: &str) -> bool {
        self.get_path(key).is_some()
    }
}

impl FieldsExt for Fields {
    fn get_path(&self, key: &str) -> Option<&Value> {
        match key.split_once('.') {
            None => self.get(key),
            Some((head, rest)) => match self.get(head)? {
                Value::Object(inner) => inner.get_path(rest),
                _ => None,
            },
        }
    }

    fn get_path_mut(&mut self, key: &str) -> Option<&mut Value> {
        match key.split_once('.') {
            None => self.get_mut(key),
            Some((head, rest)) => match self.get_mut(head)? {
                Value::Object(inner) => inner.get_path_mut(rest),
                _ => None,
            },
        }
    }

    fn put_path(&mut self, key: &str, value: Value) -> Result<Option<Value>, FieldError> {
        put_nested(self, key, key, value)
    }

    fn delete_path(&mut self, key: &str) -> Result<Value, FieldError> {
        delete_nested(self, key, key)
    }
}

fn put_nested(
    map: &mut Fields,
    full_key: &str,
    key: &str,
    value: Value,
) -> Result<Option<Value>, FieldError> {
    let Some((head, rest)) = key.split_once('.') else {
        return Ok(map.insert(key.to_string(), value));
    };

    let entry = map
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));

    match entry {
        Value::Object(inner) => put_nested(inner, full_key, rest, value),
        other => {
            let prefix_len = full_key.len() - rest.len() - 1;
            Err(FieldError::NotAnObject {
                key: full_key[..prefix_len].to_string(),
                found: type_name(other),
            })
        }
    }
}

fn delete_nested(map: &mut Fields, full_key: &str, key: &str) -> Result<Value, FieldError> {
    match key.split_once('.') {
        None => map
            .remove(key)
            .ok_or_else(|| FieldError::KeyNotFound(full_key.to_string())),
        Some((head, rest)) => match map.get_mut(head) {
            Some(Value::Object(inner)) => delete_nested(inner, full_key, rest),
            _ => Err(FieldError::KeyNotFound(full_key.to_string())),
        },
    }
}
