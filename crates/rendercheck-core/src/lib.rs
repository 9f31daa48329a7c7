// crates/rendercheck-core/src/lib.rs
// ============================================================================
// Module: rendercheck Core Library
// Description: Public API surface for the rendering regression harness.
// Purpose: Expose the data model, collaborator interfaces, and runtime engine.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! rendercheck core discovers declarative render tests, runs each test's
//! command in an isolated working directory, and compares the produced
//! raster artifacts against stored references under a numeric tolerance.
//! External collaborators (artifact codec, process execution, event logging)
//! are reached through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ArtifactError;
pub use interfaces::ArtifactLoader;
pub use interfaces::CommandExecutor;
pub use interfaces::CommandOutput;
pub use interfaces::CommandRequest;
pub use interfaces::ExecutionError;
pub use interfaces::SuiteEventSink;
pub use runtime::DiscoveredTest;
pub use runtime::FanoutEventSink;
pub use runtime::FileEventSink;
pub use runtime::ImageArtifactLoader;
pub use runtime::NoopEventSink;
pub use runtime::ShellCommandExecutor;
pub use runtime::StderrEventSink;
pub use runtime::SuiteError;
pub use runtime::SuiteOrchestrator;
pub use runtime::TestRunner;
pub use runtime::WorkDir;
pub use runtime::compare;
pub use runtime::discover;
