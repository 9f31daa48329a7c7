// crates/rendercheck-core/tests/orchestrator.rs
// ============================================================================
// Module: Suite Orchestrator Tests
// Description: Discovery, filtering, ordering, and failure isolation.
// Purpose: Ensure a suite run yields one ordered result per selected test.
// Dependencies: rendercheck-core, regex, tempfile, tokio
// ============================================================================

//! Suite orchestration tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod helpers;

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use helpers::RecordingSink;
use helpers::ScriptedExecutor;
use helpers::TextGridLoader;
use helpers::write_test;
use regex::Regex;
use rendercheck_core::RetentionPolicy;
use rendercheck_core::RunnerOptions;
use rendercheck_core::SuiteError;
use rendercheck_core::SuiteEvent;
use rendercheck_core::SuiteOptions;
use rendercheck_core::SuiteOrchestrator;
use rendercheck_core::TestError;
use rendercheck_core::TestName;
use rendercheck_core::TestRunner;
use rendercheck_core::discover;

const PASSING: &str = "command = \"copy scene.txt out.txt\"\noutputs = [\"out.txt\"]\n";

fn build_suite(root: &Path) {
    write_test(&root.join("beta"), PASSING, &[("scene.txt", "0.5"), ("ref/out.txt", "0.5")]);
    write_test(&root.join("alpha"), PASSING, &[("scene.txt", "0.5"), ("ref/out.txt", "0.9")]);
    write_test(
        &root.join("nested/gamma"),
        PASSING,
        &[("scene.txt", "0.1 0.2"), ("ref/out.txt", "0.1 0.2")],
    );
    write_test(&root.join("broken"), "command = \"copy\"\n", &[]);
}

fn orchestrator(
    jobs: usize,
    filter: Option<&str>,
    executor: Arc<ScriptedExecutor>,
    events: Arc<RecordingSink>,
    scratch: &Path,
) -> SuiteOrchestrator {
    let options = SuiteOptions {
        jobs: NonZeroUsize::new(jobs).unwrap(),
        filter: filter.map(|pattern| Regex::new(pattern).unwrap()),
        runner: RunnerOptions {
            scratch_root: Some(scratch.to_path_buf()),
            retention: RetentionPolicy::Never,
            ..RunnerOptions::default()
        },
        ..SuiteOptions::default()
    };
    let runner = TestRunner::new(
        executor,
        Arc::new(TextGridLoader::default()),
        events.clone(),
        options.runner.clone(),
    );
    SuiteOrchestrator::new(options, Arc::new(runner), events)
}

fn names(report: &rendercheck_core::SuiteReport) -> Vec<&str> {
    report.results.iter().map(|result| result.name.as_str()).collect()
}

#[test]
fn discovery_names_tests_by_relative_path() {
    let suite = tempfile::tempdir().unwrap();
    build_suite(suite.path());
    let tests = discover(suite.path()).unwrap();
    let names: Vec<TestName> = tests.into_iter().map(|test| test.name).collect();
    assert_eq!(
        names,
        vec![
            TestName::new("alpha"),
            TestName::new("beta"),
            TestName::new("broken"),
            TestName::new("nested/gamma"),
        ]
    );
}

#[test]
fn missing_root_is_a_suite_error() {
    let suite = tempfile::tempdir().unwrap();
    let err = discover(&suite.path().join("absent")).unwrap_err();
    assert!(matches!(err, SuiteError::RootNotFound(_)));
}

#[tokio::test]
async fn every_test_gets_one_result_in_discovery_order() {
    let suite = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    build_suite(suite.path());
    let executor = Arc::new(ScriptedExecutor::default());
    let events = Arc::new(RecordingSink::default());
    let report = orchestrator(4, None, executor.clone(), events.clone(), scratch.path())
        .run_all(suite.path())
        .await
        .unwrap();

    assert_eq!(names(&report), vec!["alpha", "beta", "broken", "nested/gamma"]);
    assert_eq!(report.passed, 2);
    assert_eq!(report.failed, 2);
    assert!(!report.all_passed());
    assert_eq!(report.exit_code(), 1);
    assert!(matches!(report.results[2].error, Some(TestError::Specification { .. })));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 3);

    let labels = events.labels();
    assert_eq!(labels.first(), Some(&"suite_started"));
    assert_eq!(labels.last(), Some(&"suite_finished"));
    let finished = events
        .events()
        .iter()
        .filter(|event| matches!(event, SuiteEvent::TestFinished { .. }))
        .count();
    assert_eq!(finished, 4);
}

#[tokio::test]
async fn filter_selects_matching_tests() {
    let suite = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    build_suite(suite.path());
    let executor = Arc::new(ScriptedExecutor::default());
    let report = orchestrator(
        2,
        Some("^(beta|nested/)"),
        executor.clone(),
        Arc::new(RecordingSink::default()),
        scratch.path(),
    )
    .run_all(suite.path())
    .await
    .unwrap();

    assert_eq!(names(&report), vec!["beta", "nested/gamma"]);
    assert!(report.all_passed());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_selection_passes() {
    let suite = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    build_suite(suite.path());
    let report = orchestrator(
        1,
        Some("no-such-test"),
        Arc::new(ScriptedExecutor::default()),
        Arc::new(RecordingSink::default()),
        scratch.path(),
    )
    .run_all(suite.path())
    .await
    .unwrap();
    assert!(report.results.is_empty());
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn results_do_not_depend_on_parallelism() {
    let suite = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    build_suite(suite.path());

    let mut outcomes = Vec::new();
    for jobs in [1, 4] {
        let executor = Arc::new(ScriptedExecutor::with_delay(Duration::from_millis(5)));
        let report = orchestrator(
            jobs,
            None,
            executor,
            Arc::new(RecordingSink::default()),
            scratch.path(),
        )
        .run_all(suite.path())
        .await
        .unwrap();
        let summary: Vec<(String, bool, usize)> = report
            .results
            .iter()
            .map(|result| (result.name.to_string(), result.passed, result.outputs.len()))
            .collect();
        outcomes.push(summary);
    }
    assert_eq!(outcomes[0], outcomes[1]);
}

#[tokio::test]
async fn scratch_root_is_empty_when_retention_is_never() {
    let suite = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    build_suite(suite.path());
    let _ = orchestrator(
        2,
        None,
        Arc::new(ScriptedExecutor::default()),
        Arc::new(RecordingSink::default()),
        scratch.path(),
    )
    .run_all(suite.path())
    .await
    .unwrap();
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}
