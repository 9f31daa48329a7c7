// crates/rendercheck-core/tests/helpers/mod.rs
// ============================================================================
// Module: Core Test Helpers
// Description: Scripted collaborators and fixture builders for core tests.
// Purpose: Exercise the runner and orchestrator without a real renderer.
// Dependencies: rendercheck-core, async-trait, tempfile
// ============================================================================

//! ## Overview
//! [`ScriptedExecutor`] interprets a tiny command language instead of
//! spawning processes, and [`TextGridLoader`] decodes whitespace-separated
//! numbers into a one-row grid while counting loads.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only helpers may panic on fixture errors."
)]

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use rendercheck_core::ArtifactError;
use rendercheck_core::ArtifactGrid;
use rendercheck_core::ArtifactLoader;
use rendercheck_core::CommandExecutor;
use rendercheck_core::CommandOutput;
use rendercheck_core::CommandRequest;
use rendercheck_core::ExecutionError;
use rendercheck_core::SuiteEvent;
use rendercheck_core::SuiteEventSink;

// ============================================================================
// SECTION: Scripted Executor
// ============================================================================

/// Executor that interprets `;`-separated steps inside the working directory.
///
/// Steps: `copy SRC DST`, `write NAME VALUES...`, `echo TEXT...`, `exit N`,
/// and `hang` (reports a timeout).
#[derive(Default)]
pub struct ScriptedExecutor {
    /// Number of commands executed.
    pub calls: AtomicUsize,
    /// Set when a working directory contained a `ref` directory.
    pub saw_reference_dir: AtomicBool,
    /// Delay applied before each command.
    pub delay: Option<Duration>,
}

impl ScriptedExecutor {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, request: CommandRequest<'_>) -> Result<CommandOutput, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.working_dir.join("ref").exists() {
            self.saw_reference_dir.store(true, Ordering::SeqCst);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut stdout = Vec::new();
        for step in request.command.split(';') {
            let words: Vec<&str> = step.split_whitespace().collect();
            match words.as_slice() {
                ["copy", source, target] => {
                    fs::copy(request.working_dir.join(source), request.working_dir.join(target))
                        .map_err(|err| ExecutionError::Io(err.to_string()))?;
                }
                ["write", name, values @ ..] => {
                    fs::write(request.working_dir.join(name), values.join(" "))
                        .map_err(|err| ExecutionError::Io(err.to_string()))?;
                }
                ["echo", text @ ..] => {
                    stdout.extend_from_slice(text.join(" ").as_bytes());
                    stdout.push(b'\n');
                }
                ["exit", code] => {
                    let code: i32 = code.parse().unwrap();
                    return Ok(output(Some(code), stdout));
                }
                ["hang"] => return Err(ExecutionError::Timeout(request.timeout)),
                [] => {}
                other => return Err(ExecutionError::Launch(format!("unknown step {other:?}"))),
            }
        }
        Ok(output(Some(0), stdout))
    }
}

fn output(exit_code: Option<i32>, stdout: Vec<u8>) -> CommandOutput {
    CommandOutput {
        exit_code,
        success: exit_code == Some(0),
        stdout,
        stderr: Vec::new(),
        elapsed: Duration::ZERO,
    }
}

// ============================================================================
// SECTION: Text Grid Loader
// ============================================================================

/// Loader that reads whitespace-separated floats as a `N x 1 x 1` grid.
#[derive(Default)]
pub struct TextGridLoader {
    /// Number of load attempts.
    pub loads: AtomicUsize,
}

impl ArtifactLoader for TextGridLoader {
    fn load(&self, path: &Path) -> Result<ArtifactGrid, ArtifactError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let text = fs::read_to_string(path).map_err(|_| ArtifactError::NotFound {
            path: path.to_path_buf(),
        })?;
        let samples: Result<Vec<f32>, _> = text.split_whitespace().map(str::parse).collect();
        let samples = samples.map_err(|err: std::num::ParseFloatError| ArtifactError::Decode {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let width = u32::try_from(samples.len()).unwrap();
        ArtifactGrid::from_f32(width, 1, 1, samples).map_err(|err| ArtifactError::Decode {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Event Recording
// ============================================================================

/// Sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SuiteEvent>>,
}

impl RecordingSink {
    /// Returns the recorded event labels in order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(SuiteEvent::label).collect()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<SuiteEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SuiteEventSink for RecordingSink {
    fn record(&self, event: &SuiteEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Writes a test directory with a declaration and extra files.
pub fn write_test(directory: &Path, declaration: &str, files: &[(&str, &str)]) {
    fs::create_dir_all(directory).unwrap();
    fs::write(directory.join("test.toml"), declaration).unwrap();
    for (name, contents) in files {
        let path = directory.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
}
