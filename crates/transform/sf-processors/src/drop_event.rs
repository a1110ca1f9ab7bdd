//! drop_event - drops every event.

use sf_traits::{ProcessResult, Processor};
use sf_types::Event;

pub(crate) const NAME: &str = "drop_event";

#[derive(Debug, Clone, Copy, Default)]
pub struct DropEvent;

impl Processor for DropEvent {
    fn run(&self, _event: Event) -> ProcessResult {
        Ok(None)
    }

    fn name(&self) -> &str {
        NAME
    }
}
