// crates/rendercheck-config/src/env.rs
// ============================================================================
// Module: rendercheck Environment Overrides
// Description: `RENDERCHECK_*` environment variables layered over the file.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: rendercheck-core
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement; a variable
//! that is set but empty, non-UTF-8, or malformed fails closed instead of
//! being ignored. Lookups go through a closure so tests can supply values
//! without mutating the process environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use rendercheck_core::RetentionPolicy;

use crate::config::ConfigError;
use crate::config::MAX_JOBS;
use crate::config::MAX_TIMEOUT_SECS;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys recognized by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Renderer executable path.
    Renderer,
    /// Worker count (positive integer).
    Jobs,
    /// Default per-test timeout in seconds (positive integer).
    TimeoutSeconds,
    /// Retention policy (`never`, `on-failure`, `always`).
    Retain,
    /// Parent directory for working directories.
    ScratchRoot,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Renderer => "RENDERCHECK_RENDERER",
            Self::Jobs => "RENDERCHECK_JOBS",
            Self::TimeoutSeconds => "RENDERCHECK_TIMEOUT_SEC",
            Self::Retain => "RENDERCHECK_RETAIN",
            Self::ScratchRoot => "RENDERCHECK_SCRATCH_ROOT",
        }
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Typed overrides read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Renderer executable override.
    pub renderer: Option<PathBuf>,
    /// Worker count override.
    pub jobs: Option<NonZeroUsize>,
    /// Default timeout override.
    pub timeout: Option<Duration>,
    /// Retention policy override.
    pub retention: Option<RetentionPolicy>,
    /// Scratch root override.
    pub scratch_root: Option<PathBuf>,
}

impl EnvOverrides {
    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Reads overrides through a lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let read = |key: HarnessEnv| read_nonempty(key.as_str(), lookup(key.as_str()));
        let renderer = read(HarnessEnv::Renderer)?.map(PathBuf::from);
        let jobs = read(HarnessEnv::Jobs)?
            .map(|value| parse_jobs(HarnessEnv::Jobs.as_str(), &value))
            .transpose()?;
        let timeout = read(HarnessEnv::TimeoutSeconds)?
            .map(|value| parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let retention = read(HarnessEnv::Retain)?
            .map(|value| {
                RetentionPolicy::parse(&value).ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "{} must be never, on-failure, or always",
                        HarnessEnv::Retain.as_str()
                    ))
                })
            })
            .transpose()?;
        let scratch_root = read(HarnessEnv::ScratchRoot)?.map(PathBuf::from);
        Ok(Self {
            renderer,
            jobs,
            timeout,
            retention,
            scratch_root,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Enforces UTF-8 and rejects blank values.
fn read_nonempty(name: &str, raw: Option<OsString>) -> Result<Option<String>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw
        .into_string()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{name} must be non-empty")));
    }
    Ok(Some(value))
}

/// Parses a positive worker count.
fn parse_jobs(name: &str, value: &str) -> Result<NonZeroUsize, ConfigError> {
    value
        .trim()
        .parse::<NonZeroUsize>()
        .ok()
        .filter(|jobs| jobs.get() <= MAX_JOBS)
        .ok_or_else(|| {
            ConfigError::Invalid(format!("{name} must be an integer within [1, {MAX_JOBS}]"))
        })
}

/// Parses a positive timeout in whole seconds.
fn parse_timeout_seconds(name: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| (1 ..= MAX_TIMEOUT_SECS).contains(secs))
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "{name} must be an integer number of seconds within [1, {MAX_TIMEOUT_SECS}]"
            ))
        })
}
