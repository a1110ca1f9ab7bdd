//! sf-metrics - OpenTelemetry metrics integration for scriptflow.
//!
//! Provides per-processor instruments tagged with the processor id. The
//! meter is supplied by the host application; without an installed meter
//! provider the global meter is a no-op and recording costs almost nothing.
//!
//! # Example
//!
//! ```ignore
//! use sf_metrics::ProcessorMetrics;
//!
//! let metrics = ProcessorMetrics::from_global("my-script");
//! metrics.record_process_time(started.elapsed());
//! metrics.record_exception();
//! ```

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{global, KeyValue};
use std::time::Duration;
use tracing::debug;

/// Instrumentation scope name used for the global meter.
pub const METER_NAME: &str = "scriptflow";

/// Metrics for a single script processor instance.
#[derive(Debug, Clone)]
pub struct ProcessorMetrics {
    /// Processor identifier - added as a dimension to all metrics.
    processor_id: String,

    /// Attributes attached to every measurement.
    attributes: Vec<KeyValue>,

    /// Histogram of per-event processing time in milliseconds.
    process_time_ms: Histogram<f64>,

    /// Counter of invocations that threw, timed out or panicked.
    exceptions: Counter<u64>,
}

impl ProcessorMetrics {
    /// Creates the instruments on the given meter.
    pub fn new(meter: &Meter, processor_id: impl Into<String>) -> Self {
        let processor_id = processor_id.into();

        debug!(processor = %processor_id, "Initializing processor metrics");

        let process_time_ms = meter
            .f64_histogram("scriptflow.script.process_time")
            .with_description("Time spent in the script process function")
            .with_unit("ms")
            .build();

        let exceptions = meter
            .u64_counter("scriptflow.script.exceptions")
            .with_description("Invocations that threw, timed out or panicked")
            .with_unit("invocations")
            .build();

        let attributes = vec![KeyValue::new("processor", processor_id.clone())];

        Self {
            processor_id,
            attributes,
            process_time_ms,
            exceptions,
        }
    }

    /// Creates the instruments on the global meter.
    pub fn from_global(processor_id: impl Into<String>) -> Self {
        Self::new(&global::meter(METER_NAME), processor_id)
    }

    /// Get the processor id.
    pub fn processor_id(&self) -> &str {
        &self.processor_id
    }

    /// Record the duration of one invocation.
    pub fn record_process_time(&self, duration: Duration) {
        self.process_time_ms
            .record(duration.as_secs_f64() * 1000.0, &self.attributes);
    }

    /// Record one failed invocation.
    pub fn record_exception(&self) {
        self.exceptions.add(1, &self.attributes);
    }

    /// Returns the common attributes plus the provided ones.
    pub fn with_attributes(&self, extra: &[KeyValue]) -> Vec<KeyValue> {
        let mut attrs = self.attributes.clone();
        attrs.extend_from_slice(extra);
        attrs
    }
}
