// crates/rendercheck-config/src/config.rs
// ============================================================================
// Module: rendercheck Configuration
// Description: Configuration loading and validation for the harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rendercheck-core, regex, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is read from a TOML file (when one is found), overlaid with
//! environment variables, and validated before use. Relative paths inside
//! the file are resolved against the file's directory. Unknown keys and
//! out-of-range values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use rendercheck_core::DEFAULT_FAIL_PERCENT;
use rendercheck_core::DEFAULT_FAIL_THRESHOLD;
use rendercheck_core::DEFAULT_REFERENCE_DIR;
use rendercheck_core::DEFAULT_TIMEOUT;
use rendercheck_core::RetentionPolicy;
use rendercheck_core::RunnerOptions;
use rendercheck_core::SpecDefaults;
use rendercheck_core::SuiteOptions;
use rendercheck_core::Tolerance;
use rendercheck_core::core::options::DEFAULT_OUTPUT_TAIL_BYTES;
use rendercheck_core::core::options::default_jobs;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::env::EnvOverrides;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "rendercheck.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RENDERCHECK_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 256 * 1024;
/// Maximum worker count.
pub const MAX_JOBS: usize = 1024;
/// Maximum per-test timeout in seconds (one day).
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;
/// Maximum stdout/stderr tail kept per result.
pub const MAX_OUTPUT_TAIL_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Execution settings.
    #[serde(default)]
    pub harness: HarnessSection,
    /// Declaration defaults.
    #[serde(default)]
    pub defaults: DefaultsSection,
    /// File the configuration was read from, if any (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// `[harness]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessSection {
    /// Renderer executable substituted for `{renderer}`.
    #[serde(default)]
    pub renderer: Option<PathBuf>,
    /// Worker count; defaults to available parallelism.
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Default per-test timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Parent directory for working directories.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
    /// Working directory retention policy.
    #[serde(default)]
    pub retain_workdirs: RetentionPolicy,
    /// JSON-lines event log path.
    #[serde(default)]
    pub event_log: Option<PathBuf>,
    /// Trailing stdout/stderr bytes kept per result.
    #[serde(default = "default_output_tail_bytes")]
    pub output_tail_bytes: usize,
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            renderer: None,
            jobs: None,
            timeout_secs: default_timeout_secs(),
            scratch_root: None,
            retain_workdirs: RetentionPolicy::default(),
            event_log: None,
            output_tail_bytes: default_output_tail_bytes(),
        }
    }
}

impl HarnessSection {
    /// Validates execution settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(jobs) = self.jobs
            && !(1 ..= MAX_JOBS).contains(&jobs)
        {
            return Err(ConfigError::Invalid(format!(
                "harness.jobs must be within [1, {MAX_JOBS}], got {jobs}"
            )));
        }
        if !(1 ..= MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "harness.timeout_secs must be within [1, {MAX_TIMEOUT_SECS}], got {}",
                self.timeout_secs
            )));
        }
        if self.output_tail_bytes > MAX_OUTPUT_TAIL_BYTES {
            return Err(ConfigError::Invalid(format!(
                "harness.output_tail_bytes must be at most {MAX_OUTPUT_TAIL_BYTES}"
            )));
        }
        validate_optional_path("harness.renderer", self.renderer.as_deref())?;
        validate_optional_path("harness.scratch_root", self.scratch_root.as_deref())?;
        validate_optional_path("harness.event_log", self.event_log.as_deref())?;
        Ok(())
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    /// Default per-sample tolerance.
    #[serde(default = "default_fail_threshold")]
    pub fail_threshold: f64,
    /// Default allowed failing percentage.
    #[serde(default = "default_fail_percent")]
    pub fail_percent: f64,
    /// Default single-sample hard limit.
    #[serde(default)]
    pub hard_fail: Option<f64>,
    /// Default reference directory name.
    #[serde(default = "default_reference_dir")]
    pub reference_dir: String,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            fail_threshold: default_fail_threshold(),
            fail_percent: default_fail_percent(),
            hard_fail: None,
            reference_dir: default_reference_dir(),
        }
    }
}

impl DefaultsSection {
    /// Returns the default tolerance.
    #[must_use]
    pub const fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.fail_threshold, self.fail_percent).with_hard_fail(self.hard_fail)
    }

    /// Validates declaration defaults.
    fn validate(&self) -> Result<(), ConfigError> {
        self.tolerance()
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("defaults: {err}")))?;
        let reference = Path::new(&self.reference_dir);
        let contained = reference.components().all(|component| {
            matches!(component, Component::Normal(_) | Component::CurDir)
        }) && reference.components().any(|component| matches!(component, Component::Normal(_)));
        if !contained {
            return Err(ConfigError::Invalid(format!(
                "defaults.reference_dir must be a relative directory name, got '{}'",
                self.reference_dir
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HarnessConfig {
    /// Loads configuration using the default resolution rules and overlays
    /// environment overrides.
    ///
    /// Resolution: `path`, else `RENDERCHECK_CONFIG`, else
    /// `./rendercheck.toml` when present, else built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env(&EnvOverrides::from_env()?);
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses one configuration file without validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses configuration text without validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not a valid config.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    pub fn apply_env(&mut self, overrides: &EnvOverrides) {
        if let Some(renderer) = &overrides.renderer {
            self.harness.renderer = Some(renderer.clone());
        }
        if let Some(jobs) = overrides.jobs {
            self.harness.jobs = Some(jobs.get());
        }
        if let Some(timeout) = overrides.timeout {
            self.harness.timeout_secs = timeout.as_secs();
        }
        if let Some(retention) = overrides.retention {
            self.harness.retain_workdirs = retention;
        }
        if let Some(scratch_root) = &overrides.scratch_root {
            self.harness.scratch_root = Some(scratch_root.clone());
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.harness.validate()?;
        self.defaults.validate()?;
        Ok(())
    }

    /// Returns the effective worker count.
    #[must_use]
    pub fn jobs(&self) -> NonZeroUsize {
        self.harness.jobs.and_then(NonZeroUsize::new).unwrap_or_else(default_jobs)
    }

    /// Builds suite options from the validated configuration.
    #[must_use]
    pub fn suite_options(&self, filter: Option<Regex>) -> SuiteOptions {
        SuiteOptions {
            jobs: self.jobs(),
            filter,
            defaults: SpecDefaults {
                tolerance: self.defaults.tolerance(),
                reference_dir: self.defaults.reference_dir.clone(),
                renderer: self.harness.renderer.clone(),
                timeout: Duration::from_secs(self.harness.timeout_secs),
            },
            runner: RunnerOptions {
                scratch_root: self.harness.scratch_root.clone(),
                retention: self.harness.retain_workdirs,
                output_tail_bytes: self.harness.output_tail_bytes,
            },
        }
    }

    /// Makes file-relative paths absolute against the config directory.
    fn resolve_relative_paths(&mut self, base: &Path) {
        for path in [
            &mut self.harness.renderer,
            &mut self.harness.scratch_root,
            &mut self.harness.event_log,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() && !path.as_os_str().is_empty() {
                *path = base.join(&*path);
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the CLI, the environment, or the default
/// file name. Returns `None` when no file applies.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(raw) = env::var_os(CONFIG_ENV_VAR) {
        let value = raw
            .into_string()
            .map_err(|_| ConfigError::Invalid(format!("{CONFIG_ENV_VAR} must be valid UTF-8")))?;
        if value.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{CONFIG_ENV_VAR} must be non-empty")));
        }
        return Ok(Some(PathBuf::from(value)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Rejects explicitly empty path values.
fn validate_optional_path(field: &str, path: Option<&Path>) -> Result<(), ConfigError> {
    if let Some(path) = path
        && path.as_os_str().is_empty()
    {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Default timeout in seconds.
const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Default output tail size.
const fn default_output_tail_bytes() -> usize {
    DEFAULT_OUTPUT_TAIL_BYTES
}

/// Default per-sample tolerance.
const fn default_fail_threshold() -> f64 {
    DEFAULT_FAIL_THRESHOLD
}

/// Default failing percentage.
const fn default_fail_percent() -> f64 {
    DEFAULT_FAIL_PERCENT
}

/// Default reference directory.
fn default_reference_dir() -> String {
    DEFAULT_REFERENCE_DIR.to_string()
}
