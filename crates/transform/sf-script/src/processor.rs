//! ScriptProcessor - the [`Processor`] implementation backed by a script.

use crate::config::ScriptConfig;
use crate::pool::SessionPool;
use crate::program::CompiledProgram;
use crate::session::{Failure, Invocation, SessionFactory};
use crate::watchdog::Watchdog;
use sf_error::{Result, ScriptError, SfError};
use sf_metrics::ProcessorMetrics;
use sf_traits::{ProcessError, ProcessResult, Processor, ProcessorRegistry};
use sf_types::Event;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs a user script's `process` function for every event.
///
/// Safe to share between threads: each call checks out its own session.
pub struct ScriptProcessor {
    tag: Option<String>,
    sources: Vec<String>,
    timeout: Duration,
    tag_on_exception: String,
    pool: SessionPool,
    watchdog: Option<Watchdog>,
    metrics: Option<ProcessorMetrics>,
    display: String,
}

impl ScriptProcessor {
    /// Compiles the configured sources and validates the script.
    ///
    /// One session is built up front with the `test` hook enabled and kept
    /// for reuse.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the source configuration is missing or ambiguous
    /// - a file pattern matches nothing or a file cannot be read
    /// - the script fails to compile
    /// - `process` is missing or not a one-argument function
    /// - `params` are set but `register` is missing or throws
    /// - `test` throws
    pub fn new(config: &ScriptConfig, registry: Arc<ProcessorRegistry>) -> Result<Self> {
        let program = Arc::new(CompiledProgram::load(config)?);
        let sources = program.source_names().to_vec();
        let label = format_display(config.tag.as_deref(), &sources);

        let factory = SessionFactory {
            program,
            registry,
            params: config.params.clone(),
            processor_id: config.tag.clone().unwrap_or_else(|| "script".to_string()),
        };
        let seed = factory.create(true)?;
        let pool = SessionPool::new(factory, seed, config.max_cached_sessions);

        let watchdog = if config.timeout.is_zero() {
            None
        } else {
            let name = config.tag.as_deref().unwrap_or("script");
            Some(Watchdog::spawn(name).map_err(|e| {
                ScriptError::Session(format!("failed to start timeout thread: {e}"))
            })?)
        };

        info!(processor = %label, timeout = ?config.timeout, "Created script processor");

        Ok(Self {
            tag: config.tag.clone(),
            sources,
            timeout: config.timeout,
            tag_on_exception: config.tag_on_exception.clone(),
            pool,
            watchdog,
            metrics: None,
            display: label,
        })
    }

    /// Records invocation latency and failures on `metrics`.
    pub fn with_metrics(mut self, metrics: ProcessorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the configured tag.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Returns the loaded source names.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Returns the per-event timeout; zero means none.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the number of idle sessions.
    pub fn idle_sessions(&self) -> usize {
        self.pool.idle_count()
    }

    fn invoke(&self, event: Event) -> ProcessResult {
        let mut session = match self.pool.get() {
            Ok(session) => session,
            Err(e) => {
                warn!(processor = %self.display, error = %e, "Failed to create script session");
                return Err(ProcessError::new(event, e));
            }
        };

        let timeout = self.watchdog.as_ref().map(|w| (w, self.timeout));
        match session.invoke(event, timeout) {
            Invocation::Completed(event) => Ok(Some(event)),
            Invocation::Cancelled => Ok(None),
            Invocation::Failed { event, failure } => Err(self.fail(event, failure)),
        }
    }

    fn fail(&self, event: Option<Event>, failure: Failure) -> ProcessError {
        let processor = self.display.clone();
        let (error, message) = match failure {
            Failure::Exception(message) => (
                ScriptError::Exception {
                    processor,
                    message: message.clone(),
                },
                message,
            ),
            Failure::Timeout => {
                let error = ScriptError::Timeout {
                    processor,
                    timeout: self.timeout,
                };
                let message = error.to_string();
                (error, message)
            }
            Failure::Panic(message) => (
                ScriptError::Panic {
                    processor,
                    message: message.clone(),
                },
                message,
            ),
        };

        debug!(processor = %self.display, error = %error, "Script invocation failed");

        let event = event.map(|mut event| {
            self.annotate(&mut event, &message);
            event
        });

        ProcessError {
            event,
            error: SfError::Script(error),
        }
    }

    fn annotate(&self, event: &mut Event, message: &str) {
        if !self.tag_on_exception.is_empty() {
            if let Err(e) = event.add_tag(self.tag_on_exception.as_str()) {
                debug!(processor = %self.display, error = %e, "Failed to tag event");
            }
        }
        if let Err(e) = event.append_error_message(message) {
            debug!(processor = %self.display, error = %e, "Failed to add error message");
        }
    }
}

impl Processor for ScriptProcessor {
    fn run(&self, event: Event) -> ProcessResult {
        let start = Instant::now();
        let result = self.invoke(event);

        if let Some(metrics) = &self.metrics {
            metrics.record_process_time(start.elapsed());
            if result.is_err() {
                metrics.record_exception();
            }
        }

        result
    }

    fn name(&self) -> &str {
        "script"
    }
}

impl fmt::Display for ScriptProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl fmt::Debug for ScriptProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptProcessor")
            .field("tag", &self.tag)
            .field("sources", &self.sources)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn format_display(tag: Option<&str>, sources: &[String]) -> String {
    match tag {
        Some(tag) => format!("script=[type=rhai, id={tag}, sources={}]", sources.join(", ")),
        None => format!("script=[type=rhai, sources={}]", sources.join(", ")),
    }
}
