// crates/rendercheck-core/src/core/spec_tests.rs
// ============================================================================
// Module: Test Declaration Tests
// Description: Unit tests for declaration parsing and validation.
// Purpose: Pin defaults, key aliases, and rejection of malformed declarations.
// Dependencies: rendercheck-core spec module
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions and exact literals are permitted."
)]

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use super::SpecificationError;
use super::TestSpecification;
use super::Tolerance;
use crate::core::SpecDefaults;
use crate::core::TestName;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn parse(source: &str) -> Result<TestSpecification, SpecificationError> {
    parse_with(source, &SpecDefaults::default())
}

fn parse_with(
    source: &str,
    defaults: &SpecDefaults,
) -> Result<TestSpecification, SpecificationError> {
    TestSpecification::parse(TestName::new("scenes/cornell"), Path::new("/suite/scenes/cornell"), source, defaults)
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn minimal_declaration_uses_defaults() {
    let spec = parse("command = \"render scene.xml\"\noutputs = [\"out.exr\"]\n").unwrap();
    assert_eq!(spec.tolerance(), &Tolerance::new(0.01, 1.0));
    assert_eq!(spec.outputs(), ["out.exr".to_string()]);
    assert_eq!(spec.reference_dir(), Path::new("/suite/scenes/cornell/ref"));
    assert_eq!(spec.reference_path("out.exr"), PathBuf::from("/suite/scenes/cornell/ref/out.exr"));
    assert_eq!(spec.timeout(), Duration::from_secs(600));
    assert!(spec.env().is_empty());
}

#[test]
fn legacy_key_spellings_are_accepted() {
    let spec = parse(
        "failthresh = 0.02\nfailpercent = 0.5\nhardfail = 0.5\ncommand = \"r\"\noutputs = [\"a.exr\"]\n",
    )
    .unwrap();
    assert_eq!(spec.tolerance().fail_threshold, 0.02);
    assert_eq!(spec.tolerance().fail_percent, 0.5);
    assert_eq!(spec.tolerance().hard_fail, Some(0.5));

    let camel = parse("failThreshold = 0.03\nfailPercent = 2.0\ncommand = \"r\"\noutputs = [\"a.exr\"]\n")
        .unwrap();
    assert_eq!(camel.tolerance().fail_threshold, 0.03);
    assert_eq!(camel.tolerance().fail_percent, 2.0);
}

#[test]
fn integer_tolerances_are_widened() {
    let spec = parse("fail_threshold = 0\nfail_percent = 5\ncommand = \"r\"\noutputs = [\"a.exr\"]\n")
        .unwrap();
    assert_eq!(spec.tolerance().fail_threshold, 0.0);
    assert_eq!(spec.tolerance().fail_percent, 5.0);
}

#[test]
fn overrides_and_env_are_kept() {
    let spec = parse(
        "command = \"r\"\noutputs = [\"beauty.exr\", \"aov/normal.exr\"]\nreference_dir = \"golden\"\ntimeout_secs = 30\n[env]\nRENDER_THREADS = \"2\"\n",
    )
    .unwrap();
    assert_eq!(spec.outputs().len(), 2);
    assert_eq!(spec.outputs()[1], "aov/normal.exr");
    assert_eq!(spec.reference_dir(), Path::new("/suite/scenes/cornell/golden"));
    assert_eq!(spec.timeout(), Duration::from_secs(30));
    assert_eq!(spec.env().get("RENDER_THREADS").map(String::as_str), Some("2"));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = parse("command = \"r\"\noutputs = [\"a.exr\"]\nthreshold = 1\n").unwrap_err();
    assert!(matches!(err, SpecificationError::Parse { .. }));
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn missing_or_blank_command_is_rejected() {
    assert_eq!(parse("outputs = [\"a.exr\"]\n").unwrap_err(), SpecificationError::MissingCommand);
    assert_eq!(
        parse("command = \"  \"\noutputs = [\"a.exr\"]\n").unwrap_err(),
        SpecificationError::MissingCommand
    );
}

#[test]
fn outputs_must_be_present_unique_and_contained() {
    assert_eq!(parse("command = \"r\"\n").unwrap_err(), SpecificationError::EmptyOutputs);
    assert_eq!(
        parse("command = \"r\"\noutputs = [\"a.exr\", \"a.exr\"]\n").unwrap_err(),
        SpecificationError::DuplicateOutput("a.exr".to_string())
    );
    for bad in ["../escape.exr", "/abs.exr", "", "."] {
        let source = format!("command = \"r\"\noutputs = [{bad:?}]\n");
        assert!(
            matches!(parse(&source).unwrap_err(), SpecificationError::InvalidOutput { .. }),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn out_of_range_tolerances_are_rejected() {
    for source in [
        "fail_threshold = -0.1\n",
        "fail_percent = 101.0\n",
        "fail_percent = -1.0\n",
        "fail_threshold = nan\n",
        "hard_fail = -1.0\n",
    ] {
        let full = format!("{source}command = \"r\"\noutputs = [\"a.exr\"]\n");
        assert!(
            matches!(parse(&full).unwrap_err(), SpecificationError::InvalidTolerance(_)),
            "{source} should be rejected"
        );
    }
}

#[test]
fn invalid_reference_dir_timeout_and_env_are_rejected() {
    assert!(matches!(
        parse("command = \"r\"\noutputs = [\"a.exr\"]\nreference_dir = \"../ref\"\n").unwrap_err(),
        SpecificationError::InvalidReferenceDir(_)
    ));
    assert_eq!(
        parse("command = \"r\"\noutputs = [\"a.exr\"]\ntimeout_secs = 0\n").unwrap_err(),
        SpecificationError::InvalidTimeout
    );
    assert_eq!(
        parse("command = \"r\"\noutputs = [\"a.exr\"]\n[env]\n\"A=B\" = \"1\"\n").unwrap_err(),
        SpecificationError::InvalidEnv("A=B".to_string())
    );
}

// ============================================================================
// SECTION: Renderer Substitution
// ============================================================================

#[test]
fn renderer_placeholder_requires_configuration() {
    let err = parse("command = \"{renderer} scene.xml\"\noutputs = [\"a.exr\"]\n").unwrap_err();
    assert!(matches!(err, SpecificationError::MissingRenderer { .. }));
}

#[test]
fn renderer_placeholder_is_replaced_with_absolute_path() {
    let defaults = SpecDefaults {
        renderer: Some(PathBuf::from("/opt/render/bin/render")),
        ..SpecDefaults::default()
    };
    let spec =
        parse_with("command = \"{renderer} -o out.exr scene.xml\"\noutputs = [\"out.exr\"]\n", &defaults)
            .unwrap();
    assert_eq!(spec.command(), "/opt/render/bin/render -o out.exr scene.xml");
}

#[test]
fn renderer_with_spaces_is_quoted() {
    let defaults = SpecDefaults {
        renderer: Some(PathBuf::from("/opt/my render/render")),
        ..SpecDefaults::default()
    };
    let spec = parse_with("command = \"{renderer} scene.xml\"\noutputs = [\"out.exr\"]\n", &defaults)
        .unwrap();
    assert_eq!(spec.command(), "\"/opt/my render/render\" scene.xml");
}

#[test]
fn commands_without_placeholder_ignore_renderer() {
    let spec = parse("command = \"cp scene.exr out.exr\"\noutputs = [\"out.exr\"]\n").unwrap();
    assert_eq!(spec.command(), "cp scene.exr out.exr");
}
