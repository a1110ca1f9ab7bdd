//! drop_fields - removes fields from every event.

use serde::Deserialize;
use sf_error::FieldError;
use sf_error::ProcessorError;
use sf_traits::{ProcessError, ProcessResult, Processor};
use sf_types::Event;

pub(crate) const NAME: &str = "drop_fields";

fn default_ignore_missing() -> bool {
    true
}

/// Configuration for [`DropFields`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropFieldsConfig {
    pub fields: Vec<String>,

    /// Treat a missing field as success.
    #[serde(default = "default_ignore_missing")]
    pub ignore_missing: bool,
}

/// Deletes the configured dotted paths.
#[derive(Debug)]
pub struct DropFields {
    config: DropFieldsConfig,
}

impl DropFields {
    pub fn new(config: DropFieldsConfig) -> Self {
        Self { config }
    }
}

impl Processor for DropFields {
    fn run(&self, mut event: Event) -> ProcessResult {
        let mut missing = Vec::new();

        for field in &self.config.fields {
            match event.delete_value(field) {
                Ok(_) => {}
                Err(FieldError::KeyNotFound(_)) if self.config.ignore_missing => {}
                Err(FieldError::KeyNotFound(key)) => missing.push(key),
                Err(e) => {
                    return Err(ProcessError::new(
                        event,
                        ProcessorError::Execution {
                            name: NAME.to_string(),
                            message: e.to_string(),
                        },
                    ))
                }
            }
        }

        if missing.is_empty() {
            Ok(Some(event))
        } else {
            Err(ProcessError::new(
                event,
                ProcessorError::Execution {
                    name: NAME.to_string(),
                    message: format!("fields not found: {}", missing.join(", ")),
                },
            ))
        }
    }

    fn name(&self) -> &str {
        NAME
    }
}
