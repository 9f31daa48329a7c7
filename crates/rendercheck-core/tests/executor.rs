// crates/rendercheck-core/tests/executor.rs
// ============================================================================
// Module: Shell Executor Tests
// Description: Real process execution through the platform shell.
// Purpose: Verify working directory, environment, exit codes, and timeouts.
// Dependencies: rendercheck-core, tempfile, tokio
// ============================================================================

//! Shell executor and full-stack runner tests (Unix shells only).

#![cfg(unix)]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;
use std::time::Instant;

use image::ImageBuffer;
use image::Rgb;
use rendercheck_core::CommandExecutor;
use rendercheck_core::CommandRequest;
use rendercheck_core::ExecutionError;
use rendercheck_core::RetentionPolicy;
use rendercheck_core::RunnerOptions;
use rendercheck_core::ShellCommandExecutor;
use rendercheck_core::SpecDefaults;
use rendercheck_core::TestError;
use rendercheck_core::TestName;
use rendercheck_core::TestRunner;
use rendercheck_core::TestSpecification;

fn request<'a>(
    command: &'a str,
    dir: &'a std::path::Path,
    env: &'a BTreeMap<String, String>,
    timeout: Duration,
) -> CommandRequest<'a> {
    CommandRequest {
        command,
        working_dir: dir,
        env,
        timeout,
    }
}

#[tokio::test]
async fn runs_in_working_directory_with_env() {
    let dir = tempfile::tempdir().unwrap();
    let env = BTreeMap::from([("RC_VALUE".to_string(), "seven".to_string())]);
    let output = ShellCommandExecutor::new()
        .execute(request(
            "printf '%s' \"$RC_VALUE\" > value.txt && printf ok",
            dir.path(),
            &env,
            Duration::from_secs(10),
        ))
        .await
        .unwrap();
    assert!(output.success);
    assert_eq!(output.exit_code, Some(0));
    assert_eq!(output.stdout, b"ok");
    assert_eq!(fs::read_to_string(dir.path().join("value.txt")).unwrap(), "seven");
}

#[tokio::test]
async fn nonzero_exit_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let env = BTreeMap::new();
    let output = ShellCommandExecutor::new()
        .execute(request("echo oops >&2; exit 3", dir.path(), &env, Duration::from_secs(10)))
        .await
        .unwrap();
    assert!(!output.success);
    assert_eq!(output.exit_code, Some(3));
    assert_eq!(output.stderr, b"oops\n");
}

#[tokio::test]
async fn long_command_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let env = BTreeMap::new();
    let started = Instant::now();
    let err = ShellCommandExecutor::new()
        .execute(request("exec sleep 5", dir.path(), &env, Duration::from_millis(300)))
        .await
        .unwrap_err();
    assert_eq!(err, ExecutionError::Timeout(Duration::from_millis(300)));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn timeout_kills_processes_started_by_the_shell() {
    let dir = tempfile::tempdir().unwrap();
    let env = BTreeMap::new();
    let err = ShellCommandExecutor::new()
        .execute(request(
            "sh -c 'sleep 1; touch late.txt'; true",
            dir.path(),
            &env,
            Duration::from_millis(200),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, ExecutionError::Timeout(Duration::from_millis(200)));
    tokio::time::sleep(Duration::from_millis(1800)).await;
    assert!(!dir.path().join("late.txt").exists());
}

#[tokio::test]
async fn copy_command_passes_against_identical_reference() {
    let suite = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let image: ImageBuffer<Rgb<f32>, Vec<f32>> = ImageBuffer::from_pixel(4, 4, Rgb([0.25, 0.5, 2.0]));
    image.save(suite.path().join("scene.exr")).unwrap();
    fs::create_dir_all(suite.path().join("ref")).unwrap();
    image.save(suite.path().join("ref/out.exr")).unwrap();
    fs::write(
        suite.path().join("test.toml"),
        "command = \"cp scene.exr out.exr\"\noutputs = [\"out.exr\"]\n",
    )
    .unwrap();

    let runner = TestRunner::with_options(RunnerOptions {
        scratch_root: Some(scratch.path().to_path_buf()),
        retention: RetentionPolicy::OnFailure,
        ..RunnerOptions::default()
    });
    let spec =
        TestSpecification::load(TestName::new("copy"), suite.path(), &SpecDefaults::default())
            .unwrap();
    let result = runner.run(spec).await;
    assert!(result.passed, "{result:?}");
    assert!(result.retained_workdir.is_none());
}

#[tokio::test]
async fn failing_shell_command_skips_comparison() {
    let suite = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    fs::write(
        suite.path().join("test.toml"),
        "command = \"echo crashed >&2; exit 3\"\noutputs = [\"out.exr\"]\n",
    )
    .unwrap();
    let runner = TestRunner::with_options(RunnerOptions {
        scratch_root: Some(scratch.path().to_path_buf()),
        retention: RetentionPolicy::Never,
        ..RunnerOptions::default()
    });
    let spec =
        TestSpecification::load(TestName::new("crash"), suite.path(), &SpecDefaults::default())
            .unwrap();
    let result = runner.run(spec).await;
    assert!(!result.passed);
    assert!(result.outputs.is_empty());
    assert!(matches!(result.error, Some(TestError::Execution { exit_code: Some(3), .. })));
    assert_eq!(result.stderr_tail, "crashed\n");
}
