//! Core traits for scriptflow.
//!
//! - [`Processor`] - The `run(event)` contract every processing step implements
//! - [`ProcessError`] - Failure that still carries the event
//! - [`ProcessorRegistry`] - Name to constructor map for native processors

pub mod processor;
pub mod registry;

pub use processor::*;
pub use registry::*;
