// crates/rendercheck-core/src/runtime/mod.rs
// ============================================================================
// Module: rendercheck Runtime
// Description: Comparison, execution, and orchestration engine.
// Purpose: Turn discovered declarations into a suite report.
// Dependencies: crate::{core, interfaces}, image, tokio, tempfile, walkdir
// ============================================================================

//! ## Overview
//! The runtime layers, leaves first: the comparator and artifact loader, the
//! isolated working directory and command executor, the per-test runner, and
//! the suite orchestrator that fans tests out over a bounded worker pool.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod comparator;
pub mod events;
pub mod executor;
pub mod loader;
pub mod orchestrator;
pub mod runner;
pub mod workdir;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use comparator::compare;
pub use events::FileEventSink;
pub use events::FanoutEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use executor::ShellCommandExecutor;
pub use loader::ImageArtifactLoader;
pub use orchestrator::DiscoveredTest;
pub use orchestrator::SuiteError;
pub use orchestrator::SuiteOrchestrator;
pub use orchestrator::discover;
pub use runner::TestRunner;
pub use workdir::WorkDir;
