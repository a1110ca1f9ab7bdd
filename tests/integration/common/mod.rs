//! Shared helpers for integration tests.

use serde_json::Value;
use sf_error::ProcessorError;
use sf_processors::register_builtin_processors;
use sf_script::{ScriptConfig, ScriptProcessor};
use sf_traits::{ProcessError, ProcessResult, Processor, ProcessorRegistry};
use sf_types::Event;
use std::sync::Arc;

/// Native processor that panics on every event.
struct Explode;

impl Processor for Explode {
    fn run(&self, _event: Event) -> ProcessResult {
        panic!("native processor exploded");
    }

    fn name(&self) -> &str {
        "explode"
    }
}

/// Native processor that always fails, keeping the event.
struct Reject;

impl Processor for Reject {
    fn run(&self, event: Event) -> ProcessResult {
        let error = ProcessorError::Execution {
            name: "reject".to_string(),
            message: "rejected".to_string(),
        };
        Err(ProcessError::new(event, error))
    }

    fn name(&self) -> &str {
        "reject"
    }
}

/// Registry with the builtin processors plus `explode` and `reject`.
pub fn registry() -> Arc<ProcessorRegistry> {
    let mut registry = ProcessorRegistry::new();
    register_builtin_processors(&mut registry).unwrap();
    registry.register("explode", |_| Ok(Arc::new(Explode))).unwrap();
    registry.register("reject", |_| Ok(Arc::new(Reject))).unwrap();
    Arc::new(registry)
}

/// Builds a processor over [`registry`].
pub fn processor(config: ScriptConfig) -> ScriptProcessor {
    ScriptProcessor::new(&config, registry()).unwrap()
}

/// Builds an event from a JSON object literal.
pub fn event(fields: Value) -> Event {
    Event::from_json(fields).unwrap()
}
