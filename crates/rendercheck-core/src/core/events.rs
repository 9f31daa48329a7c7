// crates/rendercheck-core/src/core/events.rs
// ============================================================================
// Module: rendercheck Suite Events
// Description: Structured lifecycle events emitted during a suite run.
// Purpose: Give sinks a stable JSON-lines vocabulary for run logging.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Events are emitted by the orchestrator and runner and delivered to a
//! [`crate::interfaces::SuiteEventSink`]. Each event serializes to one JSON
//! object tagged by `event`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::identifiers::TestName;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle event for a suite run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SuiteEvent {
    /// Discovery finished and tests are about to run.
    SuiteStarted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Suite root.
        root: PathBuf,
        /// Tests selected for the run.
        test_count: usize,
        /// Worker count.
        jobs: usize,
    },
    /// A test began executing.
    TestStarted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Test identity.
        test: TestName,
    },
    /// A test's command exited, failed to launch, or timed out.
    CommandFinished {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Test identity.
        test: TestName,
        /// Exit code when available.
        exit_code: Option<i32>,
        /// Whether the command succeeded.
        success: bool,
        /// Command wall-clock time.
        duration_ms: u64,
    },
    /// Captured stdout or stderr could not be written to the working directory.
    CaptureFailed {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Test identity.
        test: TestName,
        /// Capture file that was not written.
        path: PathBuf,
        /// Write error.
        message: String,
    },
    /// One declared output was evaluated.
    OutputCompared {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Test identity.
        test: TestName,
        /// Output name.
        output: String,
        /// Whether the output passed.
        passed: bool,
        /// Failing percentage when compared.
        failing_percent: Option<f64>,
        /// Maximum difference when compared.
        max_difference: Option<f64>,
    },
    /// A test finished.
    TestFinished {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Test identity.
        test: TestName,
        /// Whether the test passed.
        passed: bool,
        /// Test wall-clock time.
        duration_ms: u64,
        /// Working directory kept for inspection.
        retained_workdir: Option<PathBuf>,
    },
    /// All tests finished.
    SuiteFinished {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Passing tests.
        passed: usize,
        /// Failing tests.
        failed: usize,
        /// Suite wall-clock time.
        duration_ms: u64,
    },
}

impl SuiteEvent {
    /// Returns the stable event label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SuiteStarted {
                ..
            } => "suite_started",
            Self::TestStarted {
                ..
            } => "test_started",
            Self::CommandFinished {
                ..
            } => "command_finished",
            Self::CaptureFailed {
                ..
            } => "capture_failed",
            Self::OutputCompared {
                ..
            } => "output_compared",
            Self::TestFinished {
                ..
            } => "test_finished",
            Self::SuiteFinished {
                ..
            } => "suite_finished",
        }
    }
}

/// Returns the current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}
