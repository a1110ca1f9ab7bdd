//! add_tags - appends tags with de-duplication.

use serde::Deserialize;
use serde_json::Value;
use sf_error::ProcessorError;
use sf_traits::{ProcessError, ProcessResult, Processor};
use sf_types::{Event, TAGS_KEY};

pub(crate) const NAME: &str = "add_tags";

fn default_target() -> String {
    TAGS_KEY.to_string()
}

/// Configuration for [`AddTags`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddTagsConfig {
    pub tags: Vec<String>,

    /// Field the tags are appended to.
    #[serde(default = "default_target")]
    pub target: String,
}

/// Appends the configured tags to an array field.
#[derive(Debug)]
pub struct AddTags {
    tags: Value,
    target: String,
}

impl AddTags {
    pub fn new(config: AddTagsConfig) -> Self {
        Self {
            tags: Value::from(config.tags),
            target: config.target,
        }
    }
}

impl Processor for AddTags {
    fn run(&self, mut event: Event) -> ProcessResult {
        let result = if self.target == TAGS_KEY {
            event.add_tag(self.tags.clone())
        } else {
            event.append_to(&self.target, self.tags.clone())
        };

        match result {
            Ok(()) => Ok(Some(event)),
            Err(e) => Err(ProcessError::new(
                event,
                ProcessorError::Execution {
                    name: NAME.to_string(),
                    message: e.to_string(),
                },
            )),
        }
    }

    fn name(&self) -> &str {
        NAME
    }
}
