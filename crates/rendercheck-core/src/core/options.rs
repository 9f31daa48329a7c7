// crates/rendercheck-core/src/core/options.rs
// ============================================================================
// Module: rendercheck Suite Options
// Description: Immutable settings threaded from startup into the engine.
// Purpose: Replace process-wide defaults with an explicit options value.
// Dependencies: regex, serde
// ============================================================================

//! ## Overview
//! [`SuiteOptions`] is built once (usually by `rendercheck-config`) and handed
//! to the orchestrator. It carries the declaration defaults, the worker
//! count, the name filter, and the working-directory policy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::core::spec::Tolerance;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default per-sample tolerance.
pub const DEFAULT_FAIL_THRESHOLD: f64 = 0.01;
/// Default percentage of out-of-tolerance samples allowed.
pub const DEFAULT_FAIL_PERCENT: f64 = 1.0;
/// Default reference directory name inside a test directory.
pub const DEFAULT_REFERENCE_DIR: &str = "ref";
/// Default per-test command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
/// Default number of trailing stdout/stderr bytes kept in a result.
pub const DEFAULT_OUTPUT_TAIL_BYTES: usize = 4096;

// ============================================================================
// SECTION: Retention Policy
// ============================================================================

/// When to keep a test's working directory after the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Always delete.
    Never,
    /// Keep only when the test failed.
    #[default]
    #[serde(alias = "on-failure")]
    OnFailure,
    /// Always keep.
    Always,
}

impl RetentionPolicy {
    /// Returns whether a directory should be kept for the given outcome.
    #[must_use]
    pub const fn should_retain(self, passed: bool) -> bool {
        match self {
            Self::Never => false,
            Self::OnFailure => !passed,
            Self::Always => true,
        }
    }

    /// Parses a policy label (`never`, `on_failure`/`on-failure`, `always`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "never" => Some(Self::Never),
            "on_failure" | "on-failure" => Some(Self::OnFailure),
            "always" => Some(Self::Always),
            _ => None,
        }
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnFailure => "on_failure",
            Self::Always => "always",
        }
    }
}

// ============================================================================
// SECTION: Option Types
// ============================================================================

/// Values applied to a declaration when it omits a key.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDefaults {
    /// Default tolerance.
    pub tolerance: Tolerance,
    /// Default reference directory name.
    pub reference_dir: String,
    /// Renderer executable substituted for `{renderer}`.
    pub renderer: Option<PathBuf>,
    /// Default per-test timeout.
    pub timeout: Duration,
}

impl Default for SpecDefaults {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            reference_dir: DEFAULT_REFERENCE_DIR.to_string(),
            renderer: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Settings for a single test execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Parent directory for working directories (system temp when `None`).
    pub scratch_root: Option<PathBuf>,
    /// Working directory retention policy.
    pub retention: RetentionPolicy,
    /// Trailing bytes of stdout/stderr kept in each result.
    pub output_tail_bytes: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            scratch_root: None,
            retention: RetentionPolicy::default(),
            output_tail_bytes: DEFAULT_OUTPUT_TAIL_BYTES,
        }
    }
}

/// Immutable options for a whole suite run.
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Maximum number of tests running at once.
    pub jobs: NonZeroUsize,
    /// Optional test-name filter (unanchored search).
    pub filter: Option<Regex>,
    /// Declaration defaults.
    pub defaults: SpecDefaults,
    /// Per-test execution settings.
    pub runner: RunnerOptions,
}

impl SuiteOptions {
    /// Returns whether a test name passes the filter.
    #[must_use]
    pub fn selects(&self, name: &str) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter.is_match(name))
    }
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            filter: None,
            defaults: SpecDefaults::default(),
            runner: RunnerOptions::default(),
        }
    }
}

/// Returns the available CPU parallelism, falling back to one worker.
#[must_use]
pub fn default_jobs() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
