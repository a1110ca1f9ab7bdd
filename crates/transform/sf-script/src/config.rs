//! Configuration types for script processors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_error::ScriptError;
use sf_types::duration::humantime_serde;
use sf_types::Fields;
use std::time::Duration;

/// Tag added to events whose script invocation failed.
pub const DEFAULT_TAG_ON_EXCEPTION: &str = "_script_exception";

/// Default upper bound on idle sessions kept for reuse.
pub const DEFAULT_MAX_CACHED_SESSIONS: usize = 4;

/// Configuration for a script processor.
///
/// Exactly one of `source`, `file` or `files` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Processor identifier used in logs, metrics and error messages.
    #[serde(default)]
    pub tag: Option<String>,

    /// Inline script.
    #[serde(default)]
    pub source: Option<String>,

    /// Path or glob pattern of the script file(s).
    #[serde(default)]
    pub file: Option<String>,

    /// Paths or glob patterns, loaded in order.
    #[serde(default)]
    pub files: Vec<String>,

    /// Passed to the script's `register` hook once per session.
    #[serde(default)]
    pub params: Option<Fields>,

    /// Wall-clock budget per event. Zero disables the timeout.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Duration,

    /// Tag added to events when the script fails. Empty disables tagging.
    #[serde(default = "default_tag_on_exception")]
    pub tag_on_exception: String,

    /// Maximum number of idle sessions kept for reuse. Zero keeps all of them.
    #[serde(default = "default_max_cached_sessions")]
    pub max_cached_sessions: usize,
}

fn default_tag_on_exception() -> String {
    DEFAULT_TAG_ON_EXCEPTION.to_string()
}

fn default_max_cached_sessions() -> usize {
    DEFAULT_MAX_CACHED_SESSIONS
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            tag: None,
            source: None,
            file: None,
            files: Vec::new(),
            params: None,
            timeout: Duration::ZERO,
            tag_on_exception: default_tag_on_exception(),
            max_cached_sessions: default_max_cached_sessions(),
        }
    }
}

impl ScriptConfig {
    /// Creates a new config with an inline script.
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Creates a new config with a script file path or glob.
    pub fn with_file(path: impl Into<String>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    /// Creates a new config with several script paths or globs.
    pub fn with_files<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ScriptError> {
        serde_yaml::from_str(yaml).map_err(|e| ScriptError::InvalidConfig(e.to_string()))
    }

    /// Sets the processor tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the parameters passed to `register`.
    ///
    /// Non-object values are ignored.
    pub fn params(mut self, params: Value) -> Self {
        if let Value::Object(map) = params {
            self.params = Some(map);
        }
        self
    }

    /// Sets the per-event timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the tag added on failure.
    pub fn tag_on_exception(mut self, tag: impl Into<String>) -> Self {
        self.tag_on_exception = tag.into();
        self
    }

    /// Sets the idle session cap.
    pub fn max_cached_sessions(mut self, max: usize) -> Self {
        self.max_cached_sessions = max;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ScriptError> {
        let configured = [
            self.source.is_some(),
            self.file.is_some(),
            !self.files.is_empty(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        match configured {
            0 => Err(ScriptError::InvalidConfig(
                "one of source, file or files must be set".to_string(),
            )),
            1 => Ok(()),
            _ => Err(ScriptError::InvalidConfig(
                "only one of source, file or files may be set".to_string(),
            )),
        }
    }
}
