//! Processor trait for event processing.

use sf_error::SfError;
use sf_types::Event;
use std::fmt;
use std::sync::Arc;

/// Failure of a single [`Processor::run`] call.
///
/// Carries the event as it stood when the failure happened so the pipeline
/// can still inspect, forward or re-queue it. `event` is `None` only when
/// the event had already been dropped.
#[derive(Debug)]
pub struct ProcessError {
    /// The (possibly partially processed) event
    pub event: Option<Event>,

    /// What went wrong
    pub error: SfError,
}

impl ProcessError {
    /// Creates an error that keeps the event.
    pub fn new(event: Event, error: impl Into<SfError>) -> Self {
        Self {
            event: Some(event),
            error: error.into(),
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of [`Processor::run`].
///
/// - `Ok(Some(event))` - processed event
/// - `Ok(None)` - the event should be dropped; this is not an error
/// - `Err(ProcessError)` - failure, usually with the event attached
pub type ProcessResult = std::result::Result<Option<Event>, ProcessError>;

/// Trait for event processors.
///
/// # Thread Safety
///
/// Processors must be `Send + Sync` as a single instance is shared by all
/// pipeline threads. Implementations that hold non-thread-safe state (like
/// script interpreters) must hand out exclusive instances per call.
pub trait Processor: Send + Sync {
    /// Processes one event.
    fn run(&self, event: Event) -> ProcessResult;

    /// Returns the name of this processor for logging.
    fn name(&self) -> &str {
        "processor"
    }
}

impl<P: Processor + ?Sized> Processor for Arc<P> {
    fn run(&self, event: Event) -> ProcessResult {
        (**self).run(event)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn run(&self, event: Event) -> ProcessResult {
        (**self).run(event)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
