// crates/rendercheck-core/src/runtime/runner.rs
// ============================================================================
// Module: rendercheck Test Runner
// Description: Executes one test and compares its outputs to references.
// Purpose: Produce exactly one TestResult per TestSpecification.
// Dependencies: crate::{core, interfaces, runtime}, tokio
// ============================================================================

//! ## Overview
//! A run copies the test directory into a private [`WorkDir`], executes the
//! command there, and, only if the command exited successfully, evaluates
//! every declared output. A missing or undecodable artifact fails that output
//! alone; the remaining outputs are still evaluated.
//!
//! ## Invariants
//! - A nonzero exit, launch failure, or timeout skips all artifact loading.
//! - Outputs are reported in declaration order.
//! - `passed` holds only when execution succeeded and every output passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::core::ArtifactFailure;
use crate::core::ArtifactRole;
use crate::core::ComparisonVerdict;
use crate::core::OutputOutcome;
use crate::core::OutputVerdict;
use crate::core::RunnerOptions;
use crate::core::SuiteEvent;
use crate::core::TestError;
use crate::core::TestResult;
use crate::core::TestSpecification;
use crate::core::Tolerance;
use crate::core::events::now_millis;
use crate::core::verdict::duration_millis;
use crate::interfaces::ArtifactError;
use crate::interfaces::ArtifactLoader;
use crate::interfaces::CommandExecutor;
use crate::interfaces::CommandRequest;
use crate::interfaces::ExecutionError;
use crate::interfaces::SuiteEventSink;
use crate::runtime::comparator::compare;
use crate::runtime::events::NoopEventSink;
use crate::runtime::executor::ShellCommandExecutor;
use crate::runtime::loader::ImageArtifactLoader;
use crate::runtime::workdir::WorkDir;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File receiving the command's stdout inside the working directory.
pub const STDOUT_FILE_NAME: &str = "rendercheck.stdout.txt";
/// File receiving the command's stderr inside the working directory.
pub const STDERR_FILE_NAME: &str = "rendercheck.stderr.txt";

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs single tests end to end.
#[derive(Clone)]
pub struct TestRunner {
    /// Command execution backend.
    executor: Arc<dyn CommandExecutor>,
    /// Artifact decoder.
    loader: Arc<dyn ArtifactLoader>,
    /// Lifecycle event sink.
    events: Arc<dyn SuiteEventSink>,
    /// Execution settings.
    options: RunnerOptions,
}

impl TestRunner {
    /// Creates a runner from explicit collaborators.
    #[must_use]
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        loader: Arc<dyn ArtifactLoader>,
        events: Arc<dyn SuiteEventSink>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            executor,
            loader,
            events,
            options,
        }
    }

    /// Creates a runner with the shell executor, image loader, and no logging.
    #[must_use]
    pub fn with_options(options: RunnerOptions) -> Self {
        Self::new(
            Arc::new(ShellCommandExecutor::new()),
            Arc::new(ImageArtifactLoader::new()),
            Arc::new(NoopEventSink),
            options,
        )
    }

    /// Returns the runner's options.
    #[must_use]
    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Runs one test and returns its result.
    pub async fn run(&self, spec: TestSpecification) -> TestResult {
        let started = Instant::now();
        self.events.record(&SuiteEvent::TestStarted {
            timestamp_ms: now_millis(),
            test: spec.name().clone(),
        });

        let mut result = self.run_in_workdir(&spec).await;
        result.duration_ms = duration_millis(started.elapsed());

        self.events.record(&SuiteEvent::TestFinished {
            timestamp_ms: now_millis(),
            test: result.name.clone(),
            passed: result.passed,
            duration_ms: result.duration_ms,
            retained_workdir: result.retained_workdir.clone(),
        });
        result
    }

    /// Prepares the working directory, executes, and compares.
    async fn run_in_workdir(&self, spec: &TestSpecification) -> TestResult {
        let started = Instant::now();
        let workdir = match self.prepare_workdir(spec) {
            Ok(workdir) => workdir,
            Err(message) => {
                return TestResult::errored(
                    spec.name().clone(),
                    TestError::Workdir {
                        message,
                    },
                    started.elapsed(),
                );
            }
        };

        let mut result = TestResult {
            name: spec.name().clone(),
            passed: false,
            outputs: Vec::new(),
            exit_code: None,
            error: None,
            duration_ms: 0,
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            retained_workdir: None,
        };

        let request = CommandRequest {
            command: spec.command(),
            working_dir: workdir.path(),
            env: spec.env(),
            timeout: spec.timeout(),
        };
        match self.executor.execute(request).await {
            Ok(output) => {
                self.capture(spec, &workdir, STDOUT_FILE_NAME, &output.stdout);
                self.capture(spec, &workdir, STDERR_FILE_NAME, &output.stderr);
                result.exit_code = output.exit_code;
                result.stdout_tail = tail(&output.stdout, self.options.output_tail_bytes);
                result.stderr_tail = tail(&output.stderr, self.options.output_tail_bytes);
                self.record_command(spec, output.exit_code, output.success, started);
                if output.success {
                    match self.evaluate_outputs(spec, workdir.path()).await {
                        Ok(outputs) => result.outputs = outputs,
                        Err(error) => result.error = Some(error),
                    }
                } else {
                    result.error = Some(TestError::Execution {
                        exit_code: output.exit_code,
                        message: exit_message(output.exit_code),
                    });
                }
            }
            Err(ExecutionError::Timeout(timeout)) => {
                self.record_command(spec, None, false, started);
                result.error = Some(TestError::Timeout {
                    timeout_ms: duration_millis(timeout),
                });
            }
            Err(error) => {
                self.record_command(spec, None, false, started);
                result.error = Some(TestError::Execution {
                    exit_code: None,
                    message: error.to_string(),
                });
            }
        }

        for output in &result.outputs {
            self.record_output(spec, output);
        }
        result.passed = result.error.is_none()
            && !result.outputs.is_empty()
            && result.outputs.iter().all(OutputVerdict::passed);
        result.retained_workdir = workdir.finish(self.options.retention, result.passed);
        result
    }

    /// Creates the working directory and copies the test inputs into it.
    fn prepare_workdir(&self, spec: &TestSpecification) -> Result<WorkDir, String> {
        let workdir = WorkDir::create(self.options.scratch_root.as_deref(), spec.name().as_str())
            .map_err(|err| err.to_string())?;
        workdir
            .populate_from(spec.directory(), spec.reference_dir())
            .map_err(|err| format!("cannot copy {}: {err}", spec.directory().display()))?;
        workdir.remove_outputs(spec.outputs()).map_err(|err| err.to_string())?;
        Ok(workdir)
    }

    /// Writes one captured stream, reporting a failed write as an event.
    fn capture(&self, spec: &TestSpecification, workdir: &WorkDir, name: &str, contents: &[u8]) {
        if let Err(err) = workdir.write(name, contents) {
            self.events.record(&SuiteEvent::CaptureFailed {
                timestamp_ms: now_millis(),
                test: spec.name().clone(),
                path: workdir.path().join(name),
                message: err.to_string(),
            });
        }
    }

    /// Loads and compares every declared output on the blocking pool.
    async fn evaluate_outputs(
        &self,
        spec: &TestSpecification,
        workdir: &Path,
    ) -> Result<Vec<OutputVerdict>, TestError> {
        let loader = Arc::clone(&self.loader);
        let tolerance = *spec.tolerance();
        let reference_dir = spec.reference_dir().to_path_buf();
        let outputs = spec.outputs().to_vec();
        let declared: Vec<PathBuf> = outputs.iter().map(|name| reference_dir.join(name)).collect();
        let workdir = workdir.to_path_buf();
        tokio::task::spawn_blocking(move || {
            outputs
                .into_iter()
                .map(|output| {
                    let candidate = workdir.join(&output);
                    let references = reference_candidates(&reference_dir, &output, &declared);
                    let outcome =
                        evaluate_output(loader.as_ref(), &tolerance, &candidate, &references);
                    OutputVerdict {
                        output,
                        outcome,
                    }
                })
                .collect()
        })
        .await
        .map_err(|err| TestError::Internal {
            message: err.to_string(),
        })
    }

    /// Emits a `command_finished` event.
    fn record_command(
        &self,
        spec: &TestSpecification,
        exit_code: Option<i32>,
        success: bool,
        started: Instant,
    ) {
        self.events.record(&SuiteEvent::CommandFinished {
            timestamp_ms: now_millis(),
            test: spec.name().clone(),
            exit_code,
            success,
            duration_ms: duration_millis(started.elapsed()),
        });
    }

    /// Emits an `output_compared` event.
    fn record_output(&self, spec: &TestSpecification, output: &OutputVerdict) {
        let (failing_percent, max_difference) = match &output.outcome {
            OutputOutcome::Compared {
                verdict, ..
            } => (Some(verdict.failing_percent), Some(verdict.max_difference)),
            OutputOutcome::Unavailable(_) => (None, None),
        };
        self.events.record(&SuiteEvent::OutputCompared {
            timestamp_ms: now_millis(),
            test: spec.name().clone(),
            output: output.output.clone(),
            passed: output.passed(),
            failing_percent,
            max_difference,
        });
    }
}

// ============================================================================
// SECTION: Output Evaluation
// ============================================================================

/// Evaluates one output against its references.
///
/// The first passing reference wins; otherwise the closest verdict is kept.
fn evaluate_output(
    loader: &dyn ArtifactLoader,
    tolerance: &Tolerance,
    candidate_path: &Path,
    references: &[PathBuf],
) -> OutputOutcome {
    let candidate = match loader.load(candidate_path) {
        Ok(grid) => grid,
        Err(error) => {
            return OutputOutcome::Unavailable(ArtifactFailure {
                role: ArtifactRole::Candidate,
                error,
            });
        }
    };

    let mut closest: Option<(PathBuf, ComparisonVerdict)> = None;
    let mut first_error: Option<ArtifactError> = None;
    for reference_path in references {
        match loader.load(reference_path) {
            Ok(reference) => {
                let verdict = compare(&candidate, &reference, tolerance);
                if verdict.passed {
                    return OutputOutcome::Compared {
                        reference: reference_path.clone(),
                        verdict,
                    };
                }
                let replace = closest.as_ref().is_none_or(|(_, best)| is_closer(&verdict, best));
                if replace {
                    closest = Some((reference_path.clone(), verdict));
                }
            }
            Err(error) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    match (closest, first_error) {
        (Some((reference, verdict)), _) => OutputOutcome::Compared {
            reference,
            verdict,
        },
        (None, Some(error)) => OutputOutcome::Unavailable(ArtifactFailure {
            role: ArtifactRole::Reference,
            error,
        }),
        (None, None) => OutputOutcome::Unavailable(ArtifactFailure {
            role: ArtifactRole::Reference,
            error: ArtifactError::NotFound {
                path: references.first().cloned().unwrap_or_default(),
            },
        }),
    }
}

/// Orders failing verdicts: comparable shapes first, then fewer failing
/// samples, then smaller max difference.
fn is_closer(candidate: &ComparisonVerdict, best: &ComparisonVerdict) -> bool {
    match (candidate.is_dimension_mismatch(), best.is_dimension_mismatch()) {
        (false, true) => true,
        (true, _) => false,
        (false, false) => {
            (candidate.failing_percent, candidate.max_difference)
                < (best.failing_percent, best.max_difference)
        }
    }
}

/// Lists the primary reference followed by `<stem>-<variant>.<ext>` alternates.
///
/// References of other declared outputs (`declared`) are never alternates.
fn reference_candidates(reference_dir: &Path, output: &str, declared: &[PathBuf]) -> Vec<PathBuf> {
    let primary = reference_dir.join(output);
    let mut candidates = vec![primary.clone()];
    let (Some(parent), Some(stem)) = (primary.parent(), primary.file_stem()) else {
        return candidates;
    };
    let prefix = format!("{}-", stem.to_string_lossy());
    let extension = primary.extension().map(|ext| ext.to_os_string());
    let Ok(entries) = fs::read_dir(parent) else {
        return candidates;
    };
    let mut alternates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && !declared.contains(path)
                && path.extension().map(|ext| ext.to_os_string()) == extension
                && path
                    .file_stem()
                    .is_some_and(|name| name.to_string_lossy().starts_with(&prefix))
        })
        .collect();
    alternates.sort();
    candidates.extend(alternates);
    candidates
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the last `limit` bytes of captured output as text.
fn tail(bytes: &[u8], limit: usize) -> String {
    let start = bytes.len().saturating_sub(limit);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}

/// Describes a nonzero exit.
fn exit_message(exit_code: Option<i32>) -> String {
    exit_code.map_or_else(
        || "terminated by signal".to_string(),
        |code| format!("exited with status {code}"),
    )
}
