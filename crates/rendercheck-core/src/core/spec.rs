// crates/rendercheck-core/src/core/spec.rs
// ============================================================================
// Module: rendercheck Test Specifications
// Description: Data-only test declarations and their validated form.
// Purpose: Parse `test.toml` into an immutable, fully substituted record.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Each test directory carries a `test.toml` declaration. Parsing is pure:
//! a fixed schema is deserialized, defaults are applied, every field is
//! validated, and the `{renderer}` placeholder is substituted. Nothing in a
//! declaration is ever executed at discovery time.
//!
//! ## Invariants
//! - `outputs` is non-empty, unique, and every entry is a relative path that
//!   cannot escape the working directory.
//! - `command` is non-blank and contains no unresolved placeholder.
//! - Tolerance values are finite, `fail_threshold >= 0`, and
//!   `0 <= fail_percent <= 100`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::TestName;
use crate::core::options::DEFAULT_FAIL_PERCENT;
use crate::core::options::DEFAULT_FAIL_THRESHOLD;
use crate::core::options::SpecDefaults;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name that marks a directory as a render test.
pub const DECLARATION_FILE_NAME: &str = "test.toml";
/// Token replaced by the renderer executable path.
pub const RENDERER_PLACEHOLDER: &str = "{renderer}";
/// Maximum declaration size accepted.
const MAX_DECLARATION_BYTES: u64 = 256 * 1024;

// ============================================================================
// SECTION: Tolerance
// ============================================================================

/// Per-sample and aggregate divergence limits for one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Per-sample absolute difference above which a sample fails.
    pub fail_threshold: f64,
    /// Maximum percentage of failing samples that still passes (inclusive).
    pub fail_percent: f64,
    /// Single-sample difference that fails the comparison outright.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_fail: Option<f64>,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(DEFAULT_FAIL_THRESHOLD, DEFAULT_FAIL_PERCENT)
    }
}

impl Tolerance {
    /// Creates a tolerance without a hard-fail limit.
    #[must_use]
    pub const fn new(fail_threshold: f64, fail_percent: f64) -> Self {
        Self {
            fail_threshold,
            fail_percent,
            hard_fail: None,
        }
    }

    /// Returns a copy with the given hard-fail limit.
    #[must_use]
    pub const fn with_hard_fail(mut self, hard_fail: Option<f64>) -> Self {
        self.hard_fail = hard_fail;
        self
    }

    /// Checks that every limit is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`SpecificationError::InvalidTolerance`] on the first bad value.
    pub fn validate(&self) -> Result<(), SpecificationError> {
        if !self.fail_threshold.is_finite() || self.fail_threshold < 0.0 {
            return Err(SpecificationError::InvalidTolerance(format!(
                "fail_threshold must be a finite value >= 0, got {}",
                self.fail_threshold
            )));
        }
        if !self.fail_percent.is_finite() || !(0.0..=100.0).contains(&self.fail_percent) {
            return Err(SpecificationError::InvalidTolerance(format!(
                "fail_percent must be within [0, 100], got {}",
                self.fail_percent
            )));
        }
        if let Some(hard_fail) = self.hard_fail
            && (!hard_fail.is_finite() || hard_fail < 0.0)
        {
            return Err(SpecificationError::InvalidTolerance(format!(
                "hard_fail must be a finite value >= 0, got {hard_fail}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Declaration loading or validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecificationError {
    /// The declaration could not be read.
    #[error("cannot read {}: {message}", path.display())]
    Io {
        /// Declaration path.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
    /// The declaration is not valid TOML for the schema.
    #[error("cannot parse {}: {message}", path.display())]
    Parse {
        /// Declaration path.
        path: PathBuf,
        /// Parser error text.
        message: String,
    },
    /// `command` is absent or blank.
    #[error("declaration has no command")]
    MissingCommand,
    /// `outputs` is empty.
    #[error("declaration lists no outputs")]
    EmptyOutputs,
    /// An output name is not a safe relative path.
    #[error("output '{name}' is invalid: {reason}")]
    InvalidOutput {
        /// Offending output name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// An output is listed twice.
    #[error("output '{0}' is listed more than once")]
    DuplicateOutput(String),
    /// A tolerance value is out of range.
    #[error("invalid tolerance: {0}")]
    InvalidTolerance(String),
    /// The reference directory is not a safe relative path.
    #[error("reference_dir '{0}' must be a relative path inside the test directory")]
    InvalidReferenceDir(String),
    /// `timeout_secs` is zero.
    #[error("timeout_secs must be greater than zero")]
    InvalidTimeout,
    /// An environment entry is malformed.
    #[error("environment variable '{0}' has an invalid name")]
    InvalidEnv(String),
    /// `{renderer}` is used but no renderer is configured.
    #[error("command uses {placeholder} but no renderer is configured")]
    MissingRenderer {
        /// The placeholder text.
        placeholder: &'static str,
    },
    /// The configured renderer path cannot be made absolute.
    #[error("renderer path {} cannot be resolved: {message}", path.display())]
    InvalidRenderer {
        /// Configured renderer path.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
}

// ============================================================================
// SECTION: Declaration Schema
// ============================================================================

/// On-disk declaration schema.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Declaration {
    /// Per-sample tolerance.
    #[serde(default, alias = "failThreshold", alias = "failthresh")]
    fail_threshold: Option<f64>,
    /// Allowed failing percentage.
    #[serde(default, alias = "failPercent", alias = "failpercent")]
    fail_percent: Option<f64>,
    /// Single-sample hard limit.
    #[serde(default, alias = "hardFail", alias = "hardfail")]
    hard_fail: Option<f64>,
    /// Expected artifacts.
    #[serde(default)]
    outputs: Vec<String>,
    /// Invocation string.
    #[serde(default)]
    command: Option<String>,
    /// Reference directory override.
    #[serde(default)]
    reference_dir: Option<String>,
    /// Timeout override in seconds.
    #[serde(default)]
    timeout_secs: Option<u64>,
    /// Extra environment variables.
    #[serde(default)]
    env: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Test Specification
// ============================================================================

/// Validated, immutable render test declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSpecification {
    /// Test identity.
    name: TestName,
    /// Directory holding the declaration and inputs.
    directory: PathBuf,
    /// Comparison limits.
    tolerance: Tolerance,
    /// Expected artifacts, in declaration order.
    outputs: Vec<String>,
    /// Fully substituted invocation.
    command: String,
    /// Reference directory (inside `directory`).
    reference_dir: PathBuf,
    /// Command timeout.
    timeout: Duration,
    /// Extra environment variables for the command.
    env: BTreeMap<String, String>,
}

impl TestSpecification {
    /// Reads and parses `directory/test.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecificationError`] when the file cannot be read or the
    /// declaration is invalid.
    pub fn load(
        name: TestName,
        directory: &Path,
        defaults: &SpecDefaults,
    ) -> Result<Self, SpecificationError> {
        let path = directory.join(DECLARATION_FILE_NAME);
        let source = read_declaration(&path)?;
        Self::parse(name, directory, &source, defaults)
    }

    /// Parses declaration text for a test living in `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecificationError`] when the declaration is invalid.
    pub fn parse(
        name: TestName,
        directory: &Path,
        source: &str,
        defaults: &SpecDefaults,
    ) -> Result<Self, SpecificationError> {
        let declaration: Declaration =
            toml::from_str(source).map_err(|err| SpecificationError::Parse {
                path: directory.join(DECLARATION_FILE_NAME),
                message: err.to_string(),
            })?;

        let tolerance = Tolerance {
            fail_threshold: declaration
                .fail_threshold
                .unwrap_or(defaults.tolerance.fail_threshold),
            fail_percent: declaration.fail_percent.unwrap_or(defaults.tolerance.fail_percent),
            hard_fail: declaration.hard_fail.or(defaults.tolerance.hard_fail),
        };
        tolerance.validate()?;

        let outputs = validate_outputs(declaration.outputs)?;

        let raw_command = declaration.command.unwrap_or_default();
        if raw_command.trim().is_empty() {
            return Err(SpecificationError::MissingCommand);
        }
        let command = substitute_renderer(&raw_command, defaults.renderer.as_deref())?;

        let reference_name =
            declaration.reference_dir.unwrap_or_else(|| defaults.reference_dir.clone());
        if !is_contained_relative(&reference_name) {
            return Err(SpecificationError::InvalidReferenceDir(reference_name));
        }

        let timeout = match declaration.timeout_secs {
            Some(0) => return Err(SpecificationError::InvalidTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.timeout,
        };

        for key in declaration.env.keys() {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return Err(SpecificationError::InvalidEnv(key.clone()));
            }
        }

        Ok(Self {
            name,
            directory: directory.to_path_buf(),
            tolerance,
            outputs,
            command,
            reference_dir: directory.join(reference_name),
            timeout,
            env: declaration.env,
        })
    }

    /// Returns the test name.
    #[must_use]
    pub const fn name(&self) -> &TestName {
        &self.name
    }

    /// Returns the test directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the comparison tolerance.
    #[must_use]
    pub const fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    /// Returns the expected artifact names.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Returns the substituted command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the reference directory path.
    #[must_use]
    pub fn reference_dir(&self) -> &Path {
        &self.reference_dir
    }

    /// Returns the primary reference path for an output.
    #[must_use]
    pub fn reference_path(&self, output: &str) -> PathBuf {
        self.reference_dir.join(output)
    }

    /// Returns the command timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns extra environment variables for the command.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a declaration file with a size cap.
fn read_declaration(path: &Path) -> Result<String, SpecificationError> {
    let io_error = |err: std::io::Error| SpecificationError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    let file = fs::File::open(path).map_err(io_error)?;
    let mut source = String::new();
    let read = file.take(MAX_DECLARATION_BYTES + 1).read_to_string(&mut source).map_err(io_error)?;
    if u64::try_from(read).unwrap_or(u64::MAX) > MAX_DECLARATION_BYTES {
        return Err(SpecificationError::Io {
            path: path.to_path_buf(),
            message: format!("declaration exceeds {MAX_DECLARATION_BYTES} bytes"),
        });
    }
    Ok(source)
}

/// Checks output names and rejects duplicates.
fn validate_outputs(outputs: Vec<String>) -> Result<Vec<String>, SpecificationError> {
    if outputs.is_empty() {
        return Err(SpecificationError::EmptyOutputs);
    }
    let mut seen = std::collections::BTreeSet::new();
    for name in &outputs {
        if name.trim().is_empty() {
            return Err(SpecificationError::InvalidOutput {
                name: name.clone(),
                reason: "name is blank",
            });
        }
        if !is_contained_relative(name) {
            return Err(SpecificationError::InvalidOutput {
                name: name.clone(),
                reason: "must be a relative path inside the working directory",
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(SpecificationError::DuplicateOutput(name.clone()));
        }
    }
    Ok(outputs)
}

/// Returns true for relative paths made only of normal (or `.`) components.
fn is_contained_relative(value: &str) -> bool {
    let path = Path::new(value);
    let mut has_normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    has_normal
}

/// Replaces `{renderer}` with the renderer's absolute path.
fn substitute_renderer(
    command: &str,
    renderer: Option<&Path>,
) -> Result<String, SpecificationError> {
    if !command.contains(RENDERER_PLACEHOLDER) {
        return Ok(command.to_string());
    }
    let Some(renderer) = renderer else {
        return Err(SpecificationError::MissingRenderer {
            placeholder: RENDERER_PLACEHOLDER,
        });
    };
    let absolute =
        std::path::absolute(renderer).map_err(|err| SpecificationError::InvalidRenderer {
            path: renderer.to_path_buf(),
            message: err.to_string(),
        })?;
    let text = absolute.display().to_string();
    let quoted = if text.chars().any(char::is_whitespace) { format!("\"{text}\"") } else { text };
    Ok(command.replace(RENDERER_PLACEHOLDER, &quoted))
}
