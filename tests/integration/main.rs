//! Integration tests for scriptflow.
//!
//! These tests drive [`sf_script::ScriptProcessor`] the way a pipeline
//! would: through the `Processor` trait, with the builtin native processors
//! registered and several threads sharing one instance.
//!
//! ```bash
//! cargo test -p sf-integration-tests
//! ```

mod chain_test;
mod common;
mod concurrency_test;
mod loading_test;
mod processor_test;
