//! Error types for scriptflow.
//!
//! This crate provides:
//! - [`SfError`] - Top-level error enum for all processing errors
//! - Domain-specific errors ([`ScriptError`], [`ProcessorError`], [`FieldError`])
//! - [`SfError::is_script_exception`] and [`SfError::is_syntax_error`] predicates

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for scriptflow.
#[derive(Error, Debug)]
pub enum SfError {
    /// Script compilation, session setup and invocation errors
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Native processor construction and execution errors
    #[error("Processor error: {0}")]
    Processor(#[from] ProcessorError),

    /// Event field access errors
    #[error("Field error: {0}")]
    Field(#[from] FieldError),
}

/// Script engine errors.
///
/// The first group of variants can only happen while a processor is being
/// constructed. `Exception`, `Timeout` and `Panic` are per-invocation.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The script failed to compile
    #[error("{source_name}: {message}")]
    Syntax { source_name: String, message: String },

    /// A file pattern expanded to nothing
    #[error("no sources were found in {0}")]
    NoSources(String),

    /// A script file could not be read
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// Source configuration is missing or ambiguous
    #[error("invalid script configuration: {0}")]
    InvalidConfig(String),

    /// The script does not define `process`
    #[error("process function not found")]
    EntryPointNotFound,

    /// `process` exists but cannot be called as the entry point
    #[error("process is not a function: {0}")]
    NotAFunction(String),

    /// Parameters were configured but the script has no `register` hook
    #[error("params were provided but no register function was found")]
    RegisterNotFound,

    /// The `register` hook threw
    #[error("failed in register function: {0}")]
    Register(String),

    /// The `test` hook threw
    #[error("failed in test() function: {0}")]
    SelfTest(String),

    /// Top-level statements failed while creating a session
    #[error("failed to initialize session: {0}")]
    Session(String),

    /// The script threw while processing an event
    #[error("{processor}: failed in process function: {message}")]
    Exception { processor: String, message: String },

    /// The script exceeded its time budget and was interrupted
    #[error("{processor}: script processor execution timeout after {timeout:?}")]
    Timeout { processor: String, timeout: Duration },

    /// A host-side panic was recovered during invocation
    #[error("{processor}: unexpected panic in script processor: {message}")]
    Panic { processor: String, message: String },
}

/// Native processor errors.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// No constructor is registered under this name
    #[error("processor '{0}' is not registered")]
    Unknown(String),

    /// A constructor with this name already exists
    #[error("processor '{0}' is already registered")]
    Duplicate(String),

    /// The constructor rejected its configuration
    #[error("invalid configuration for processor '{name}': {message}")]
    InvalidConfig { name: String, message: String },

    /// The processor failed while running
    #[error("processor '{name}' failed: {message}")]
    Execution { name: String, message: String },
}

/// Dotted-path field access errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Nothing is stored at the key
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A path segment points at a value that is not an object
    #[error("expected object at '{key}' but found {found}")]
    NotAnObject { key: String, found: &'static str },

    /// A value could not be merged into the existing one
    #[error("unexpected type for '{key}': {found}")]
    UnexpectedType { key: String, found: &'static str },

    /// The key is reserved and cannot be changed this way
    #[error("field '{0}' cannot be modified")]
    Reserved(String),

    /// The value cannot be stored in an event
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl SfError {
    /// Returns true for errors raised by a script throwing or timing out.
    pub fn is_script_exception(&self) -> bool {
        matches!(
            self,
            SfError::Script(ScriptError::Exception { .. } | ScriptError::Timeout { .. })
        )
    }

    /// Returns true if this is a compile error.
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, SfError::Script(ScriptError::Syntax { .. }))
    }
}

/// Result type alias using SfError.
pub type Result<T> = std::result::Result<T, SfError>;
