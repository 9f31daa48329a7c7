// crates/rendercheck-core/src/interfaces/mod.rs
// ============================================================================
// Module: rendercheck Interfaces
// Description: Collaborator contracts for decoding, execution, and logging.
// Purpose: Keep the engine independent of codecs and process primitives.
// Dependencies: async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! The runner reaches the outside world only through these traits. Shipped
//! implementations live in [`crate::runtime`]; tests substitute their own to
//! observe or script collaborator behavior.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::ArtifactGrid;
use crate::core::SuiteEvent;

// ============================================================================
// SECTION: Artifact Loader
// ============================================================================

/// Artifact loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactError {
    /// The file does not exist or is not a regular file.
    #[error("artifact not found: {}", path.display())]
    NotFound {
        /// Requested path.
        path: PathBuf,
    },
    /// The file exists but is not a supported raster.
    #[error("cannot decode artifact {}: {message}", path.display())]
    Decode {
        /// Requested path.
        path: PathBuf,
        /// Decoder error text.
        message: String,
    },
}

impl ArtifactError {
    /// Returns the path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound {
                path,
            }
            | Self::Decode {
                path, ..
            } => path,
        }
    }

    /// Returns whether the artifact was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Decoder that turns an artifact file into a sample grid.
pub trait ArtifactLoader: Send + Sync {
    /// Loads and decodes the artifact at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::NotFound`] when the file is absent and
    /// [`ArtifactError::Decode`] when it cannot be parsed.
    fn load(&self, path: &Path) -> Result<ArtifactGrid, ArtifactError>;
}

// ============================================================================
// SECTION: Command Executor
// ============================================================================

/// One command invocation.
#[derive(Debug, Clone, Copy)]
pub struct CommandRequest<'a> {
    /// Command line, interpreted by the platform shell.
    pub command: &'a str,
    /// Working directory.
    pub working_dir: &'a Path,
    /// Extra environment variables.
    pub env: &'a BTreeMap<String, String>,
    /// Time allowed before the process is killed.
    pub timeout: Duration,
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (absent when terminated by a signal).
    pub exit_code: Option<i32>,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Captured stdout.
    pub stdout: Vec<u8>,
    /// Captured stderr.
    pub stderr: Vec<u8>,
    /// Wall-clock time.
    pub elapsed: Duration,
}

/// Command execution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The process could not be started.
    #[error("failed to launch command: {0}")]
    Launch(String),
    /// Waiting on the process failed.
    #[error("failed while waiting on command: {0}")]
    Io(String),
    /// The process exceeded its timeout and was killed.
    #[error("command exceeded {}ms and was killed", .0.as_millis())]
    Timeout(Duration),
}

/// Runs external commands for the test runner.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs a command to completion or until its timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when the command cannot be launched, cannot
    /// be awaited, or times out. A nonzero exit is not an error.
    async fn execute(&self, request: CommandRequest<'_>) -> Result<CommandOutput, ExecutionError>;
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Sink for structured suite lifecycle events.
pub trait SuiteEventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &SuiteEvent);
}
