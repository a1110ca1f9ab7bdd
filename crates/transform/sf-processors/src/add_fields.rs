//! add_fields - writes fixed values into every event.

use serde::Deserialize;
use serde_json::Value;
use sf_error::ProcessorError;
use sf_traits::{ProcessError, ProcessResult, Processor};
use sf_types::{Event, Fields};

pub(crate) const NAME: &str = "add_fields";

/// Configuration for [`AddFields`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddFieldsConfig {
    /// Values to write, keyed by dotted path relative to `target`.
    pub fields: Fields,

    /// Path the fields are written under. Empty means the event root.
    #[serde(default)]
    pub target: String,
}

/// Writes the configured fields, overwriting existing values.
#[derive(Debug)]
pub struct AddFields {
    fields: Vec<(String, Value)>,
}

impl AddFields {
    pub fn new(config: AddFieldsConfig) -> Self {
        let fields = config
            .fields
            .into_iter()
            .map(|(key, value)| {
                let path = if config.target.is_empty() {
                    key
                } else {
                    format!("{}.{key}", config.target)
                };
                (path, value)
            })
            .collect();
        Self { fields }
    }
}

impl Processor for AddFields {
    fn run(&self, mut event: Event) -> ProcessResult {
        for (path, value) in &self.fields {
            if let Err(e) = event.put_value(path, value.clone()) {
                let error = ProcessorError::Execution {
                    name: NAME.to_string(),
                    message: e.to_string(),
                };
                return Err(ProcessError::new(event, error));
            }
        }
        Ok(Some(event))
    }

    fn name(&self) -> &str {
        NAME
    }
}
