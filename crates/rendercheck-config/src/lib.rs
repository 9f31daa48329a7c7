// crates/rendercheck-config/src/lib.rs
// ============================================================================
// Module: rendercheck Config Library
// Description: Harness configuration model, environment overlay, validation.
// Purpose: Single source of truth for rendercheck.toml semantics.
// Dependencies: rendercheck-core, serde, toml
// ============================================================================

//! ## Overview
//! `rendercheck-config` loads `rendercheck.toml`, overlays `RENDERCHECK_*`
//! environment variables, validates the result fail-closed, and converts it
//! into the immutable [`rendercheck_core::SuiteOptions`] handed to the
//! orchestrator.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvOverrides;
pub use env::HarnessEnv;
