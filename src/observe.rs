//! Pipeline observation
//!
//! Components report progress through a `PipelineObserver` they are handed,
//! rather than logging through a process-wide singleton. `LogObserver`
//! forwards to the `log` facade; `RecordingObserver` keeps events for
//! inspection in tests.

use std::cell::RefCell;

use log::{info, warn};

use crate::error::SeismicError;

/// Receives progress and recoverable-failure events from the pipeline
///
/// Every method has a no-op default so observers only implement what they
/// care about.
pub trait PipelineObserver {
    fn file_read(&self, _name: &str, _traces: usize) {}

    fn file_skipped(&self, _name: &str, _error: &SeismicError) {}

    fn trace_normalized(&self, _trace_id: &str, _samples: usize) {}

    fn stream_stored(&self, _name: &str) {}

    fn trace_stored(&self, _trace_id: &str, _rows: usize) {}

    fn station_lookup_failed(&self, _station: &str, _error: &SeismicError) {}

    fn station_not_found(&self, _station: &str) {}

    fn message(&self, _text: &str) {}
}

/// Observer that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

/// Observer that writes events through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn file_read(&self, name: &str, traces: usize) {
        info!("Read file: {} ({} traces)", name, traces);
    }

    fn file_skipped(&self, name: &str, error: &SeismicError) {
        warn!("Skipping {}: {} [{}]", name, error, error.error_code());
    }

    fn trace_normalized(&self, trace_id: &str, samples: usize) {
        log::debug!("Normalized {} ({} samples)", trace_id, samples);
    }

    fn stream_stored(&self, name: &str) {
        info!("Insert data for stream: {}", name);
    }

    fn trace_stored(&self, trace_id: &str, rows: usize) {
        log::debug!("Committed {} rows for {}", rows, trace_id);
    }

    fn station_lookup_failed(&self, station: &str, error: &SeismicError) {
        warn!("Station lookup failed for {}: {}", station, error);
    }

    fn station_not_found(&self, station: &str) {
        info!("No location found for station {}", station);
    }

    fn message(&self, text: &str) {
        info!("{}", text);
    }
}

/// Observer that records every event as a line of text
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events, oldest first
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Recorded events starting with `prefix`
    pub fn events_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

impl PipelineObserver for RecordingObserver {
    fn file_read(&self, name: &str, traces: usize) {
        self.push(format!("file_read {name} {traces}"));
    }

    fn file_skipped(&self, name: &str, error: &SeismicError) {
        self.push(format!("file_skipped {name} {}", error.error_code()));
    }

    fn trace_normalized(&self, trace_id: &str, samples: usize) {
        self.push(format!("trace_normalized {trace_id} {samples}"));
    }

    fn stream_stored(&self, name: &str) {
        self.push(format!("stream_stored {name}"));
    }

    fn trace_stored(&self, trace_id: &str, rows: usize) {
        self.push(format!("trace_stored {trace_id} {rows}"));
    }

    fn station_lookup_failed(&self, station: &str, error: &SeismicError) {
        self.push(format!("station_lookup_failed {station} {}", error.error_code()));
    }

    fn station_not_found(&self, station: &str) {
        self.push(format!("station_not_found {station}"));
    }

    fn message(&self, text: &str) {
        self.push(format!("message {text}"));
    }
}
