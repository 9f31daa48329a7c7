// crates/rendercheck-core/src/core/identifiers.rs
// ============================================================================
// Module: rendercheck Identifiers
// Description: Stable names for discovered render tests.
// Purpose: Provide a typed, serializable test identity.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A test is identified by its directory path relative to the suite root,
//! always `/`-separated so names are identical across platforms.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Component;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Test identifier derived from the test directory location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestName(String);

impl TestName {
    /// Creates a new test name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derives a test name from a test directory and the suite root.
    ///
    /// The root directory itself is named after its final path component.
    #[must_use]
    pub fn from_directory(root: &Path, directory: &Path) -> Self {
        let relative = directory.strip_prefix(root).unwrap_or(directory);
        let parts: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            let fallback = directory
                .file_name()
                .or_else(|| root.file_name())
                .map_or_else(|| ".".to_string(), |name| name.to_string_lossy().into_owned());
            return Self(fallback);
        }
        Self(parts.join("/"))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TestName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
