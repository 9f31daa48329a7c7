// crates/rendercheck-core/src/core/verdict.rs
// ============================================================================
// Module: rendercheck Verdicts
// Description: Comparison verdicts, per-test results, and the suite report.
// Purpose: Carry pass/fail outcomes with enough detail to act on a failure.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`ComparisonVerdict`] is produced for every candidate/reference pair,
//! an [`OutputVerdict`] for every declared output, a [`TestResult`] for every
//! discovered test, and one [`SuiteReport`] per run. A dimension mismatch is a
//! verdict field, never an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

use crate::core::grid::GridShape;
use crate::core::identifiers::TestName;
use crate::interfaces::ArtifactError;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Process exit code when at least one test failed.
pub const EXIT_TESTS_FAILED: u8 = 1;
/// Process exit code for harness-level setup errors.
pub const EXIT_SETUP_ERROR: u8 = 2;

// ============================================================================
// SECTION: Comparison Verdict
// ============================================================================

/// Position of a sample inside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleLocation {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Channel index.
    pub channel: u16,
}

/// Shapes of a candidate/reference pair that could not be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionMismatch {
    /// Candidate shape.
    pub candidate: GridShape,
    /// Reference shape.
    pub reference: GridShape,
}

/// Outcome of comparing one candidate grid against one reference grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonVerdict {
    /// Whether the candidate is within tolerance.
    pub passed: bool,
    /// Largest absolute sample difference; infinite for NaN against a number.
    #[serde(serialize_with = "serialize_finite")]
    pub max_difference: f64,
    /// Where the largest difference occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_location: Option<SampleLocation>,
    /// Samples whose difference exceeds `fail_threshold`.
    pub failing_sample_count: u64,
    /// Samples compared.
    pub total_sample_count: u64,
    /// `100 * failing / total` (0 when nothing was compared).
    pub failing_percent: f64,
    /// Set when shapes differ; no samples were compared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_mismatch: Option<DimensionMismatch>,
    /// Set when a sample exceeded the hard-fail limit.
    pub hard_failure: bool,
}

impl ComparisonVerdict {
    /// Builds the failing verdict for grids whose shapes differ.
    #[must_use]
    pub const fn mismatched(candidate: GridShape, reference: GridShape) -> Self {
        Self {
            passed: false,
            max_difference: 0.0,
            max_location: None,
            failing_sample_count: 0,
            total_sample_count: 0,
            failing_percent: 0.0,
            dimension_mismatch: Some(DimensionMismatch {
                candidate,
                reference,
            }),
            hard_failure: false,
        }
    }

    /// Returns whether the verdict is a dimension mismatch.
    #[must_use]
    pub const fn is_dimension_mismatch(&self) -> bool {
        self.dimension_mismatch.is_some()
    }
}

// ============================================================================
// SECTION: Output Verdict
// ============================================================================

/// Which side of a comparison an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    /// File produced by the test command.
    Candidate,
    /// Stored reference file.
    Reference,
}

impl ArtifactRole {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Reference => "reference",
        }
    }
}

/// An artifact that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactFailure {
    /// Candidate or reference.
    pub role: ArtifactRole,
    /// Load error.
    pub error: ArtifactError,
}

/// Result of evaluating one declared output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutputOutcome {
    /// Both artifacts loaded and were compared.
    Compared {
        /// Reference file the verdict was computed against.
        reference: PathBuf,
        /// Comparison verdict.
        verdict: ComparisonVerdict,
    },
    /// An artifact was missing or undecodable.
    Unavailable(ArtifactFailure),
}

/// Verdict for one declared output of a test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputVerdict {
    /// Output name as declared.
    pub output: String,
    /// What happened.
    #[serde(flatten)]
    pub outcome: OutputOutcome,
}

impl OutputVerdict {
    /// Returns whether this output passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        match &self.outcome {
            OutputOutcome::Compared {
                verdict, ..
            } => verdict.passed,
            OutputOutcome::Unavailable(_) => false,
        }
    }
}

// ============================================================================
// SECTION: Test Result
// ============================================================================

/// Test-level failure that prevented or aborted artifact comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestError {
    /// The declaration is malformed.
    #[error("invalid test declaration: {message}")]
    Specification {
        /// Error text.
        message: String,
    },
    /// The working directory could not be prepared.
    #[error("cannot prepare working directory: {message}")]
    Workdir {
        /// Error text.
        message: String,
    },
    /// The command failed to launch or exited nonzero.
    #[error("command failed: {message}")]
    Execution {
        /// Exit code when the process ran.
        exit_code: Option<i32>,
        /// Error text.
        message: String,
    },
    /// The command exceeded its timeout and was killed.
    #[error("command timed out after {timeout_ms} ms")]
    Timeout {
        /// Allotted time in milliseconds.
        timeout_ms: u64,
    },
    /// The harness worker for this test stopped unexpectedly.
    #[error("harness worker failed: {message}")]
    Internal {
        /// Error text.
        message: String,
    },
}

/// Aggregate outcome for one test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    /// Test identity.
    pub name: TestName,
    /// Execution succeeded and every output passed.
    pub passed: bool,
    /// Per-output verdicts in declaration order.
    pub outputs: Vec<OutputVerdict>,
    /// Exit code of the command when it ran to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Test-level failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TestError>,
    /// Wall-clock time for the whole test.
    pub duration_ms: u64,
    /// Trailing command stdout.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout_tail: String,
    /// Trailing command stderr.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr_tail: String,
    /// Working directory kept for inspection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retained_workdir: Option<PathBuf>,
}

impl TestResult {
    /// Builds a failed result for a test that never reached comparison.
    #[must_use]
    pub fn errored(name: TestName, error: TestError, elapsed: Duration) -> Self {
        Self {
            name,
            passed: false,
            outputs: Vec::new(),
            exit_code: None,
            error: Some(error),
            duration_ms: duration_millis(elapsed),
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            retained_workdir: None,
        }
    }

    /// Returns the outputs that did not pass.
    pub fn failing_outputs(&self) -> impl Iterator<Item = &OutputVerdict> {
        self.outputs.iter().filter(|output| !output.passed())
    }
}

// ============================================================================
// SECTION: Suite Report
// ============================================================================

/// Ordered results of a suite run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    /// Results in discovery order.
    pub results: Vec<TestResult>,
    /// Number of passing tests.
    pub passed: usize,
    /// Number of failing tests.
    pub failed: usize,
    /// Wall-clock time for the whole run.
    pub duration_ms: u64,
}

impl SuiteReport {
    /// Tallies results into a report.
    #[must_use]
    pub fn new(results: Vec<TestResult>, elapsed: Duration) -> Self {
        let passed = results.iter().filter(|result| result.passed).count();
        let failed = results.len() - passed;
        Self {
            results,
            passed,
            failed,
            duration_ms: duration_millis(elapsed),
        }
    }

    /// Returns whether every test passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Returns the process exit code for this report.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.all_passed() { 0 } else { EXIT_TESTS_FAILED }
    }
}

/// Serializes non-finite floats as `null`.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "Signature fixed by serde.")]
fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() { serializer.serialize_f64(*value) } else { serializer.serialize_none() }
}

/// Converts a duration to whole milliseconds, saturating.
#[must_use]
pub fn duration_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
