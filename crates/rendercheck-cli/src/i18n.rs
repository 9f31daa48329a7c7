// crates/rendercheck-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings behind stable keys.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The rendercheck CLI stores user-facing strings in a small catalog so that
//! wording stays consistent across commands. All runtime output should be
//! routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "rendercheck {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.load_failed", "Failed to load configuration: {error}"),
    ("config.validate.ok", "Configuration is valid."),
    ("config.validate.source", "Loaded {path}"),
    ("config.validate.defaults", "No configuration file found; using built-in defaults."),
    ("run.filter_invalid", "Invalid --filter pattern {pattern}: {error}"),
    ("run.event_log_failed", "Failed to open event log {path}: {error}"),
    ("run.suite_failed", "Cannot run suite: {error}"),
    ("run.report_failed", "Failed to write report to {path}: {error}"),
    ("run.report_written", "Report written to {path}"),
    ("run.no_tests", "No tests found under {root}."),
    ("list.none", "No tests found."),
    ("list.summary", "{count} test(s)"),
    ("report.pass", "PASS {name} ({seconds}s)"),
    ("report.fail", "FAIL {name} ({seconds}s)"),
    (
        "report.output.compared",
        "  {output}: {percent}% of samples over threshold, max difference {max} (reference \
         {reference})",
    ),
    (
        "report.output.hard_fail",
        "  {output}: a sample differs by {max}, above the hard limit (reference {reference})",
    ),
    (
        "report.output.mismatch",
        "  {output}: produced {candidate} but reference {reference} is {expected}",
    ),
    ("report.output.not_found", "  {output}: {role} not found at {path}"),
    ("report.output.decode_failed", "  {output}: cannot decode {role} {path}: {error}"),
    ("report.role.candidate", "output"),
    ("report.role.reference", "reference"),
    ("report.error", "  {error}"),
    ("report.stderr_header", "  stderr (last lines):"),
    ("report.stream_line", "    | {line}"),
    ("report.workdir", "  working directory kept at {path}"),
    ("report.summary", "{passed} passed, {failed} failed, {total} total in {seconds}s"),
];

/// Returns the message catalog.
pub(crate) fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
