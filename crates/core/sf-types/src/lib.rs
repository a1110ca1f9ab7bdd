//! Core types for scriptflow.
//!
//! This crate provides the foundational types used throughout the system:
//! - [`Event`] - Timestamped field tree plus a separate metadata tree
//! - [`FieldsExt`] - Dotted-path get/put/delete over nested JSON objects
//! - [`duration`] - Human-readable duration parsing for configuration

pub mod duration;
pub mod event;
pub mod fields;

pub use event::*;
pub use fields::*;
