//! sf-processors - native processors for scriptflow.
//!
//! Each processor is built from a JSON configuration through the
//! [`ProcessorRegistry`], which is how scripts reach them
//! (`new_processor("add_tags", #{ tags: ["x"] })`).

mod add_fields;
mod add_tags;
mod drop_event;
mod drop_fields;

pub use add_fields::{AddFields, AddFieldsConfig};
pub use add_tags::{AddTags, AddTagsConfig};
pub use drop_event::DropEvent;
pub use drop_fields::{DropFields, DropFieldsConfig};

use serde::de::DeserializeOwned;
use serde_json::Value;
use sf_error::{ProcessorError, Result};
use sf_traits::ProcessorRegistry;
use std::sync::Arc;
use tracing::debug;

/// Registers every processor in this crate.
///
/// # Errors
///
/// Fails if one of the names is already taken.
pub fn register_builtin_processors(registry: &mut ProcessorRegistry) -> Result<()> {
    registry.register(add_fields::NAME, |config| {
        Ok(Arc::new(AddFields::new(parse_config(add_fields::NAME, config)?)))
    })?;
    registry.register(add_tags::NAME, |config| {
        Ok(Arc::new(AddTags::new(parse_config(add_tags::NAME, config)?)))
    })?;
    registry.register(drop_fields::NAME, |config| {
        Ok(Arc::new(DropFields::new(parse_config(drop_fields::NAME, config)?)))
    })?;
    registry.register(drop_event::NAME, |_| Ok(Arc::new(DropEvent)))?;

    debug!(processors = registry.len(), "Registered builtin processors");
    Ok(())
}

/// Deserializes a processor configuration. `null` reads as `{}`.
pub(crate) fn parse_config<T: DeserializeOwned>(name: &str, config: &Value) -> Result<T> {
    let config = match config {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(config).map_err(|e| {
        ProcessorError::InvalidConfig {
            name: name.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
