// crates/rendercheck-cli/src/report.rs
// ============================================================================
// Module: CLI Run Report
// Description: Human-readable and canonical JSON rendering of suite results.
// Purpose: Tell a user which tests failed and by how much.
// Dependencies: rendercheck-core, serde_jcs
// ============================================================================

//! ## Overview
//! Each test renders as one `PASS`/`FAIL` line. Failing tests add indented
//! detail lines: one per failing output (failing percentage and max
//! difference, or the missing/undecodable artifact), the test-level error,
//! the tail of stderr, and the retained working directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rendercheck_core::ArtifactError;
use rendercheck_core::ArtifactFailure;
use rendercheck_core::ArtifactRole;
use rendercheck_core::OutputOutcome;
use rendercheck_core::OutputVerdict;
use rendercheck_core::SuiteReport;
use rendercheck_core::TestResult;

use crate::t;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Stderr lines echoed under a failing test.
pub const STDERR_TAIL_LINES: usize = 5;

// ============================================================================
// SECTION: Text Rendering
// ============================================================================

/// Renders the lines for one test result.
#[must_use]
pub fn result_lines(result: &TestResult) -> Vec<String> {
    let seconds = format_seconds(result.duration_ms);
    if result.passed {
        return vec![t!("report.pass", name = result.name, seconds = seconds)];
    }

    let mut lines = vec![t!("report.fail", name = result.name, seconds = seconds)];
    if let Some(error) = &result.error {
        lines.push(t!("report.error", error = error));
    }
    lines.extend(result.failing_outputs().map(output_line));
    let stderr: Vec<&str> = result.stderr_tail.lines().collect();
    if !stderr.is_empty() {
        lines.push(t!("report.stderr_header"));
        let start = stderr.len().saturating_sub(STDERR_TAIL_LINES);
        lines.extend(stderr[start ..].iter().map(|line| t!("report.stream_line", line = line)));
    }
    if let Some(path) = &result.retained_workdir {
        lines.push(t!("report.workdir", path = path.display()));
    }
    lines
}

/// Renders the closing summary line.
#[must_use]
pub fn summary_line(report: &SuiteReport) -> String {
    t!(
        "report.summary",
        passed = report.passed,
        failed = report.failed,
        total = report.results.len(),
        seconds = format_seconds(report.duration_ms)
    )
}

/// Renders the detail line for one failing output.
fn output_line(output: &OutputVerdict) -> String {
    match &output.outcome {
        OutputOutcome::Compared {
            reference,
            verdict,
        } => {
            let reference_name =
                reference.file_name().map_or_else(|| reference.display().to_string(), |name| {
                    name.to_string_lossy().into_owned()
                });
            if let Some(mismatch) = &verdict.dimension_mismatch {
                return t!(
                    "report.output.mismatch",
                    output = output.output,
                    candidate = mismatch.candidate,
                    reference = reference_name,
                    expected = mismatch.reference
                );
            }
            if verdict.hard_failure {
                return t!(
                    "report.output.hard_fail",
                    output = output.output,
                    max = format_difference(verdict.max_difference),
                    reference = reference_name
                );
            }
            t!(
                "report.output.compared",
                output = output.output,
                percent = format!("{:.3}", verdict.failing_percent),
                max = format_difference(verdict.max_difference),
                reference = reference_name
            )
        }
        OutputOutcome::Unavailable(ArtifactFailure {
            role,
            error,
        }) => {
            let role_label = match role {
                ArtifactRole::Candidate => t!("report.role.candidate"),
                ArtifactRole::Reference => t!("report.role.reference"),
            };
            match error {
                ArtifactError::NotFound {
                    path,
                } => t!(
                    "report.output.not_found",
                    output = output.output,
                    role = role_label,
                    path = path.display()
                ),
                ArtifactError::Decode {
                    path,
                    message,
                } => t!(
                    "report.output.decode_failed",
                    output = output.output,
                    role = role_label,
                    path = path.display(),
                    error = message
                ),
            }
        }
    }
}

/// Formats milliseconds as seconds with one decimal.
fn format_seconds(millis: u64) -> String {
    format!("{}.{}", millis / 1000, (millis % 1000) / 100)
}

/// Formats a sample difference.
fn format_difference(value: f64) -> String {
    if value.is_finite() { format!("{value:.6}") } else { "inf".to_string() }
}

// ============================================================================
// SECTION: Machine Rendering
// ============================================================================

/// Serializes the report as canonical JSON (RFC 8785) with a trailing newline.
///
/// # Errors
///
/// Returns an error when the report cannot be serialized.
pub fn canonical_json(report: &SuiteReport) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_jcs::to_vec(report)?;
    bytes.push(b'\n');
    Ok(bytes)
}
