// crates/rendercheck-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: rendercheck Suite Orchestrator
// Description: Test discovery and bounded-parallel suite execution.
// Purpose: Run every selected test once and return ordered results.
// Dependencies: crate::{core, interfaces, runtime}, tokio, walkdir
// ============================================================================

//! ## Overview
//! Discovery walks the suite root for `test.toml` files; each containing
//! directory is one test. Tests run on a [`JoinSet`] gated by a semaphore so
//! at most `jobs` commands are in flight. Results land in a slot indexed by
//! discovery position, so report order never depends on completion order.
//!
//! ## Invariants
//! - Exactly one result per selected test, including tests whose declaration
//!   is invalid or whose worker task panicked.
//! - One failing test never prevents the others from running.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::core::DECLARATION_FILE_NAME;
use crate::core::SuiteEvent;
use crate::core::SuiteOptions;
use crate::core::SuiteReport;
use crate::core::TestError;
use crate::core::TestName;
use crate::core::TestResult;
use crate::core::TestSpecification;
use crate::core::events::now_millis;
use crate::core::verdict::duration_millis;
use crate::interfaces::SuiteEventSink;
use crate::runtime::runner::TestRunner;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Suite-level failures that prevent any test from running.
#[derive(Debug, Error)]
pub enum SuiteError {
    /// The suite root does not exist or is not a directory.
    #[error("test root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    /// The suite root could not be traversed.
    #[error("cannot scan {}: {message}", path.display())]
    Discovery {
        /// Path being scanned.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// A test directory found under the suite root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTest {
    /// Name derived from the directory's position under the root.
    pub name: TestName,
    /// Absolute test directory.
    pub directory: PathBuf,
}

/// Finds every directory under `root` that contains a declaration file.
///
/// Results are sorted by test name.
///
/// # Errors
///
/// Returns [`SuiteError`] when the root is missing or cannot be traversed.
pub fn discover(root: &Path) -> Result<Vec<DiscoveredTest>, SuiteError> {
    let root = root.canonicalize().map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => SuiteError::RootNotFound(root.to_path_buf()),
        _ => SuiteError::Discovery {
            path: root.to_path_buf(),
            message: err.to_string(),
        },
    })?;
    if !root.is_dir() {
        return Err(SuiteError::RootNotFound(root));
    }

    let mut tests = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|err| SuiteError::Discovery {
            path: err.path().map_or_else(|| root.clone(), Path::to_path_buf),
            message: err.to_string(),
        })?;
        if !entry.file_type().is_file() || entry.file_name() != DECLARATION_FILE_NAME {
            continue;
        }
        let Some(directory) = entry.path().parent() else {
            continue;
        };
        tests.push(DiscoveredTest {
            name: TestName::from_directory(&root, directory),
            directory: directory.to_path_buf(),
        });
    }
    tests.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(tests)
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Runs a suite of tests with bounded parallelism.
pub struct SuiteOrchestrator {
    /// Suite configuration.
    options: SuiteOptions,
    /// Shared per-test runner.
    runner: Arc<TestRunner>,
    /// Lifecycle event sink.
    events: Arc<dyn SuiteEventSink>,
}

impl SuiteOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        options: SuiteOptions,
        runner: Arc<TestRunner>,
        events: Arc<dyn SuiteEventSink>,
    ) -> Self {
        Self {
            options,
            runner,
            events,
        }
    }

    /// Discovers tests under `root` and keeps those the filter selects.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError`] when discovery fails.
    pub fn select(&self, root: &Path) -> Result<Vec<DiscoveredTest>, SuiteError> {
        let mut tests = discover(root)?;
        tests.retain(|test| self.options.selects(test.name.as_str()));
        Ok(tests)
    }

    /// Runs every selected test under `root` and returns the ordered report.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError`] when discovery fails; test failures are
    /// reported in the returned [`SuiteReport`].
    pub async fn run_all(&self, root: &Path) -> Result<SuiteReport, SuiteError> {
        let started = Instant::now();
        let tests = self.select(root)?;
        self.events.record(&SuiteEvent::SuiteStarted {
            timestamp_ms: now_millis(),
            root: root.to_path_buf(),
            test_count: tests.len(),
            jobs: self.options.jobs.get(),
        });

        let mut slots: Vec<Option<TestResult>> = vec![None; tests.len()];
        let semaphore = Arc::new(Semaphore::new(self.options.jobs.get()));
        let mut tasks = JoinSet::new();
        let mut task_slots = HashMap::new();

        for (index, test) in tests.iter().enumerate() {
            let spec = match TestSpecification::load(
                test.name.clone(),
                &test.directory,
                &self.options.defaults,
            ) {
                Ok(spec) => spec,
                Err(err) => {
                    let result = TestResult::errored(
                        test.name.clone(),
                        TestError::Specification {
                            message: err.to_string(),
                        },
                        Duration::ZERO,
                    );
                    self.record_finished(&result);
                    slots[index] = Some(result);
                    continue;
                }
            };
            let semaphore = Arc::clone(&semaphore);
            let runner = Arc::clone(&self.runner);
            let handle = tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                runner.run(spec).await
            });
            task_slots.insert(handle.id(), index);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    if let Some(&index) = task_slots.get(&id) {
                        slots[index] = Some(result);
                    }
                }
                Err(err) => {
                    if let Some(&index) = task_slots.get(&err.id()) {
                        let result = TestResult::errored(
                            tests[index].name.clone(),
                            TestError::Internal {
                                message: err.to_string(),
                            },
                            Duration::ZERO,
                        );
                        self.record_finished(&result);
                        slots[index] = Some(result);
                    }
                }
            }
        }

        let results: Vec<TestResult> = slots
            .into_iter()
            .zip(&tests)
            .map(|(slot, test)| {
                slot.unwrap_or_else(|| {
                    TestResult::errored(
                        test.name.clone(),
                        TestError::Internal {
                            message: "test produced no result".to_string(),
                        },
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        let report = SuiteReport::new(results, started.elapsed());
        self.events.record(&SuiteEvent::SuiteFinished {
            timestamp_ms: now_millis(),
            passed: report.passed,
            failed: report.failed,
            duration_ms: duration_millis(started.elapsed()),
        });
        Ok(report)
    }

    /// Emits `test_finished` for results produced outside the runner.
    fn record_finished(&self, result: &TestResult) {
        self.events.record(&SuiteEvent::TestFinished {
            timestamp_ms: now_millis(),
            test: result.name.clone(),
            passed: result.passed,
            duration_ms: result.duration_ms,
            retained_workdir: None,
        });
    }
}
