//! The host event passed between processors.

use crate::fields::{type_name, Fields, FieldsExt};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_error::FieldError;

/// Key that addresses the event timestamp.
pub const TIMESTAMP_KEY: &str = "@timestamp";

/// Key that addresses the metadata tree. `@metadata.x` addresses `x` inside it.
pub const METADATA_KEY: &str = "@metadata";

/// Field that collects tags.
pub const TAGS_KEY: &str = "tags";

/// Field that collects error messages attached by failing processors.
pub const ERROR_MESSAGE_KEY: &str = "error.message";

const METADATA_PREFIX: &str = "@metadata.";

/// A single event flowing through the pipeline.
///
/// Keys passed to the accessor methods are dotted paths. A key starting with
/// `@metadata.` is resolved against [`Event::meta`] instead of
/// [`Event::fields`], and `@timestamp` addresses [`Event::timestamp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Event {
    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// User-visible fields
    pub fields: Fields,

    /// Pipeline-internal metadata, never indexed
    pub meta: Fields,
}

/// Where a key points inside an event.
enum Target<'a> {
    Timestamp,
    MetadataRoot,
    Metadata(&'a str),
    Fields(&'a str),
}

fn route(key: &str) -> Target<'_> {
    if key == TIMESTAMP_KEY {
        Target::Timestamp
    } else if key == METADATA_KEY {
        Target::MetadataRoot
    } else if let Some(rest) = key.strip_prefix(METADATA_PREFIX) {
        Target::Metadata(rest)
    } else {
        Target::Fields(key)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl Event {
    /// Creates an empty event stamped with the current time.
    pub fn new() -> Self {
        Self::with_fields(Fields::new())
    }

    /// Creates an event stamped with the current time.
    pub fn with_fields(fields: Fields) -> Self {
        Self {
            timestamp: Utc::now(),
            fields,
            meta: Fields::new(),
        }
    }

    /// Sets the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the metadata tree.
    pub fn with_meta(mut self, meta: Fields) -> Self {
        self.meta = meta;
        self
    }

    /// Returns a copy of the value at `key`, or `None` if it does not exist.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        match route(key) {
            Target::Timestamp => Some(Value::String(format_timestamp(&self.timestamp))),
            Target::MetadataRoot => Some(Value::Object(self.meta.clone())),
            Target::Metadata(path) => self.meta.get_path(path).cloned(),
            Target::Fields(path) => self.fields.get_path(path).cloned(),
        }
    }

    /// Returns true if a value exists at `key`.
    pub fn has_value(&self, key: &str) -> bool {
        match route(key) {
            Target::Timestamp | Target::MetadataRoot => true,
            Target::Metadata(path) => self.meta.has_path(path),
            Target::Fields(path) => self.fields.has_path(path),
        }
    }

    /// Stores `value` at `key` and returns the previous value.
    pub fn put_value(&mut self, key: &str, value: Value) -> Result<Option<Value>, FieldError> {
        match route(key) {
            Target::Timestamp => {
                let timestamp = parse_timestamp(&value).ok_or_else(|| FieldError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected an RFC 3339 string, found {}", type_name(&value)),
                })?;
                let previous = std::mem::replace(&mut self.timestamp, timestamp);
                Ok(Some(Value::String(format_timestamp(&previous))))
            }
            Target::MetadataRoot => match value {
                Value::Object(meta) => {
                    let previous = std::mem::replace(&mut self.meta, meta);
                    Ok(Some(Value::Object(previous)))
                }
                other => Err(FieldError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected an object, found {}", type_name(&other)),
                }),
            },
            Target::Metadata(path) => self.meta.put_path(path, value),
            Target::Fields(path) => self.fields.put_path(path, value),
        }
    }

    /// Removes and returns the value at `key`.
    pub fn delete_value(&mut self, key: &str) -> Result<Value, FieldError> {
        match route(key) {
            Target::Timestamp | Target::MetadataRoot => Err(FieldError::Reserved(key.to_string())),
            Target::Metadata(path) => self.meta.delete_path(path),
            Target::Fields(path) => self.fields.delete_path(path),
        }
    }

    /// Moves the value at `from` to `to`.
    ///
    /// Returns false without changing anything if `to` already exists or
    /// `from` does not. `from` is removed before `to` is written so that a
    /// value can be pushed down into its own path (`a` to `a.b`). If the
    /// write fails the value is restored at `from`.
    pub fn rename_value(&mut self, from: &str, to: &str) -> bool {
        if self.has_value(to) {
            return false;
        }

        let Ok(value) = self.delete_value(from) else {
            return false;
        };

        if self.put_value(to, value.clone()).is_err() {
            // Restoring into the slot we just emptied cannot fail.
            let _ = self.put_value(from, value);
            return false;
        }

        true
    }

    /// Appends `value` to `key` with de-duplication.
    ///
    /// An absent key is set to `value` itself. A scalar that differs from
    /// `value` becomes a two-element array. An array gets `value` appended
    /// unless it already contains it. Arrays passed as `value` are appended
    /// element by element.
    pub fn append_to(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        self.append_values(key, value, false)
    }

    /// Appends a tag to the `tags` field, which is always an array.
    pub fn add_tag(&mut self, tag: impl Into<Value>) -> Result<(), FieldError> {
        self.append_values(TAGS_KEY, tag.into(), true)
    }

    /// Appends a message to the `error.message` field.
    pub fn append_error_message(&mut self, message: &str) -> Result<(), FieldError> {
        self.append_to(ERROR_MESSAGE_KEY, Value::String(message.to_string()))
    }

    fn append_values(&mut self, key: &str, value: Value, always_array: bool) -> Result<(), FieldError> {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.append_one(key, item, always_array)?;
                }
                Ok(())
            }
            single => self.append_one(key, single, always_array),
        }
    }

    fn append_one(&mut self, key: &str, value: Value, always_array: bool) -> Result<(), FieldError> {
        let (map, path) = match route(key) {
            Target::Fields(path) => (&mut self.fields, path),
            Target::Metadata(path) => (&mut self.meta, path),
            Target::Timestamp | Target::MetadataRoot => {
                return Err(FieldError::Reserved(key.to_string()));
            }
        };

        if let Some(existing) = map.get_path_mut(path) {
            match existing {
                Value::Null => {}
                Value::Array(items) => {
                    if !items.contains(&value) {
                        items.push(value);
                    }
                    return Ok(());
                }
                Value::Object(_) => {
                    return Err(FieldError::UnexpectedType {
                        key: key.to_string(),
                        found: "object",
                    });
                }
                scalar => {
                    if *scalar != value {
                        let previous = scalar.take();
                        *scalar = Value::Array(vec![previous, value]);
                    }
                    return Ok(());
                }
            }
        }

        let value = if always_array {
            Value::Array(vec![value])
        } else {
            value
        };
        map.put_path(path, value).map(|_| ())
    }

    /// Builds an event from a JSON object.
    ///
    /// `@timestamp` (RFC 3339) and `@metadata` (object) are lifted out of the
    /// field tree. A missing timestamp defaults to now.
    pub fn from_json(value: Value) -> Result<Self, FieldError> {
        let Value::Object(mut fields) = value else {
            return Err(FieldError::InvalidValue {
                key: String::new(),
                message: "expected a JSON object".to_string(),
            });
        };

        let timestamp = match fields.remove(TIMESTAMP_KEY) {
            Some(raw) => parse_timestamp(&raw).ok_or_else(|| FieldError::InvalidValue {
                key: TIMESTAMP_KEY.to_string(),
                message: "expected an RFC 3339 string".to_string(),
            })?,
            None => Utc::now(),
        };

        let meta = match fields.remove(METADATA_KEY) {
            Some(Value::Object(meta)) => meta,
            Some(other) => {
                return Err(FieldError::InvalidValue {
                    key: METADATA_KEY.to_string(),
                    message: format!("expected an object, found {}", type_name(&other)),
                });
            }
            None => Fields::new(),
        };

        Ok(Self {
            timestamp,
            fields,
            meta,
        })
    }

    /// Converts the event into a single JSON object with `@timestamp` first
    /// and `@metadata` present only when non-empty.
    pub fn to_json(&self) -> Value {
        let mut out = Fields::new();
        out.insert(
            TIMESTAMP_KEY.to_string(),
            Value::String(format_timestamp(&self.timestamp)),
        );
        if !self.meta.is_empty() {
            out.insert(METADATA_KEY.to_string(), Value::Object(self.meta.clone()));
        }
        for (key, value) in &self.fields {
            out.insert(key.clone(), value.clone());
        }
        Value::Object(out)
    }
}

impl TryFrom<Value> for Event {
    type Error = FieldError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        event.to_json()
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
