// crates/rendercheck-cli/src/lib.rs
// ============================================================================
// Module: rendercheck CLI Library
// Description: Shared helpers for the rendercheck command-line interface.
// Purpose: Expose the message catalog and report formatting to the binary.
// Dependencies: rendercheck-core, serde_jcs
// ============================================================================

//! ## Overview
//! Library surface backing the `rendercheck` binary. User-facing strings go
//! through [`i18n`]; human and machine-readable run reports are produced by
//! [`report`].

pub mod i18n;
pub mod report;
