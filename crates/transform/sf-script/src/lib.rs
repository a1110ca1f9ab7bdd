//! sf-script - Rhai script processor for scriptflow.
//!
//! A [`ScriptProcessor`] compiles user scripts once and runs their
//! `process(evt)` function for every event, each call on its own pooled
//! [`Session`].
//!
//! # Script contract
//!
//! ```rhai
//! // Optional. Called once per session when `params` are configured.
//! fn register(params) {
//!     this.field = params.field;
//! }
//!
//! // Required. `evt` supports Get, Put, Rename, Delete, Tag, AppendTo,
//! // Cancel and IsCancelled.
//! fn process(evt) {
//!     evt.Put(this.field, to_lowercase(evt.Get("message")));
//! }
//!
//! // Optional. Runs once when the processor is created.
//! fn test() {}
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sf_script::{ScriptConfig, ScriptProcessor};
//! use sf_traits::{Processor, ProcessorRegistry};
//!
//! let config = ScriptConfig::with_source(r#"fn process(evt) { evt.Put("seen", true); }"#)
//!     .timeout(Duration::from_millis(500));
//! let processor = ScriptProcessor::new(&config, Arc::new(ProcessorRegistry::new()))?;
//! let event = processor.run(event)?;
//! ```

mod builtin;
pub mod chain;
pub mod config;
pub mod conversion;
pub mod event;
pub mod pool;
pub mod processor;
pub mod program;
pub mod session;
pub mod watchdog;

pub use chain::{ChainBuilder, ChainLink, ScriptChain};
pub use config::ScriptConfig;
pub use event::ScriptEvent;
pub use pool::SessionPool;
pub use processor::ScriptProcessor;
pub use program::CompiledProgram;
pub use session::{Failure, Invocation, Session};
