// crates/rendercheck-core/src/core/mod.rs
// ============================================================================
// Module: rendercheck Core Types
// Description: Test declarations, decoded grids, verdicts, and suite options.
// Purpose: Provide stable, serializable types shared by runtime and CLI.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Core types describe what a render test declares, what an artifact decodes
//! to, and what a comparison or a whole suite run concludes. Runtime modules
//! only move these values around; the rules for building them live here.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod events;
pub mod grid;
pub mod identifiers;
pub mod options;
pub mod spec;
pub mod verdict;

#[cfg(test)]
mod spec_tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::SuiteEvent;
pub use grid::ArtifactGrid;
pub use grid::GridError;
pub use grid::GridShape;
pub use grid::SampleFormat;
pub use identifiers::TestName;
pub use options::DEFAULT_FAIL_PERCENT;
pub use options::DEFAULT_FAIL_THRESHOLD;
pub use options::DEFAULT_REFERENCE_DIR;
pub use options::DEFAULT_TIMEOUT;
pub use options::RetentionPolicy;
pub use options::RunnerOptions;
pub use options::SpecDefaults;
pub use options::SuiteOptions;
pub use spec::DECLARATION_FILE_NAME;
pub use spec::RENDERER_PLACEHOLDER;
pub use spec::SpecificationError;
pub use spec::TestSpecification;
pub use spec::Tolerance;
pub use verdict::ArtifactFailure;
pub use verdict::ArtifactRole;
pub use verdict::ComparisonVerdict;
pub use verdict::DimensionMismatch;
pub use verdict::EXIT_SETUP_ERROR;
pub use verdict::EXIT_TESTS_FAILED;
pub use verdict::OutputOutcome;
pub use verdict::OutputVerdict;
pub use verdict::SampleLocation;
pub use verdict::SuiteReport;
pub use verdict::TestError;
pub use verdict::TestResult;
