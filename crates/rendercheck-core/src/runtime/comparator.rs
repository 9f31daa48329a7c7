// crates/rendercheck-core/src/runtime/comparator.rs
// ============================================================================
// Module: rendercheck Comparator
// Description: Tolerance-based structural comparison of sample grids.
// Purpose: Decide whether a candidate artifact matches its reference.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Comparison is per sample: the absolute difference of every candidate and
//! reference sample is measured, samples above `fail_threshold` are counted,
//! and the candidate passes when the failing percentage is at most
//! `fail_percent`. A few wildly divergent samples therefore pass as long as
//! they are a small enough fraction of the grid, which absorbs low-order-bit
//! noise between platforms.
//!
//! ## Invariants
//! - Shapes must match exactly; otherwise no sample is compared.
//! - The percentage boundary is inclusive.
//! - An empty grid passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ArtifactGrid;
use crate::core::ComparisonVerdict;
use crate::core::SampleLocation;
use crate::core::Tolerance;

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Compares a candidate grid against a reference grid.
#[must_use]
pub fn compare(
    candidate: &ArtifactGrid,
    reference: &ArtifactGrid,
    tolerance: &Tolerance,
) -> ComparisonVerdict {
    if candidate.shape() != reference.shape() {
        return ComparisonVerdict::mismatched(candidate.shape(), reference.shape());
    }

    let mut max_difference = 0.0_f64;
    let mut max_index = None;
    let mut failing = 0_u64;
    let mut hard_failure = false;

    for (index, (&actual, &expected)) in
        candidate.samples().iter().zip(reference.samples()).enumerate()
    {
        let difference = sample_difference(actual, expected);
        if difference > max_difference {
            max_difference = difference;
            max_index = Some(index);
        }
        if difference > tolerance.fail_threshold {
            failing += 1;
        }
        if let Some(hard_fail) = tolerance.hard_fail
            && difference > hard_fail
        {
            hard_failure = true;
        }
    }

    let total = u64::try_from(candidate.samples().len()).unwrap_or(u64::MAX);
    let failing_percent = failing_percent(failing, total);
    let passed = failing_percent <= tolerance.fail_percent && !hard_failure;

    ComparisonVerdict {
        passed,
        max_difference,
        max_location: max_index.map(|index| locate(candidate, index)),
        failing_sample_count: failing,
        total_sample_count: total,
        failing_percent,
        dimension_mismatch: None,
        hard_failure,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Absolute difference of two samples.
///
/// Equal values (including equal infinities) and NaN pairs differ by zero;
/// NaN against a number differs by infinity.
#[allow(clippy::float_cmp, reason = "Exact equality short-circuits infinities.")]
fn sample_difference(actual: f32, expected: f32) -> f64 {
    if actual == expected || (actual.is_nan() && expected.is_nan()) {
        return 0.0;
    }
    let difference = (f64::from(actual) - f64::from(expected)).abs();
    if difference.is_nan() { f64::INFINITY } else { difference }
}

/// Percentage of failing samples; zero for an empty grid.
#[allow(clippy::cast_precision_loss, reason = "Sample counts fit comfortably in f64 mantissa.")]
fn failing_percent(failing: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * failing as f64 / total as f64
}

/// Maps a flat sample index back to pixel coordinates and channel.
fn locate(grid: &ArtifactGrid, index: usize) -> SampleLocation {
    let channels = usize::from(grid.channels().max(1));
    let width = usize::try_from(grid.width().max(1)).unwrap_or(usize::MAX);
    let pixel = index / channels;
    SampleLocation {
        x: u32::try_from(pixel % width).unwrap_or(u32::MAX),
        y: u32::try_from(pixel / width).unwrap_or(u32::MAX),
        channel: u16::try_from(index % channels).unwrap_or(u16::MAX),
    }
}
