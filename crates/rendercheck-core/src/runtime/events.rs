// crates/rendercheck-core/src/runtime/events.rs
// ============================================================================
// Module: rendercheck Event Sinks
// Description: JSON-lines sinks for suite lifecycle events.
// Purpose: Emit structured run logs without a logging framework dependency.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Sinks serialize each [`SuiteEvent`] to one JSON line. Serialization or
//! write failures are dropped; logging never fails a test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::SuiteEvent;
use crate::interfaces::SuiteEventSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl SuiteEventSink for StderrEventSink {
    fn record(&self, event: &SuiteEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl SuiteEventSink for FileEventSink {
    fn record(&self, event: &SuiteEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that forwards every event to several sinks.
#[derive(Default)]
pub struct FanoutEventSink {
    /// Downstream sinks, in registration order.
    sinks: Vec<Arc<dyn SuiteEventSink>>,
}

impl FanoutEventSink {
    /// Creates a fan-out over the given sinks.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn SuiteEventSink>>) -> Self {
        Self {
            sinks,
        }
    }
}

impl SuiteEventSink for FanoutEventSink {
    fn record(&self, event: &SuiteEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

/// No-op sink.
pub struct NoopEventSink;

impl SuiteEventSink for NoopEventSink {
    fn record(&self, _event: &SuiteEvent) {}
}
