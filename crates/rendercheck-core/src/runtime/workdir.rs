// crates/rendercheck-core/src/runtime/workdir.rs
// ============================================================================
// Module: rendercheck Working Directories
// Description: Per-test isolated scratch directories.
// Purpose: Keep parallel tests from sharing or contaminating artifacts.
// Dependencies: tempfile, walkdir
// ============================================================================

//! ## Overview
//! A [`WorkDir`] is a fresh temporary directory populated with a copy of the
//! test directory. It is deleted when dropped, so every exit path (early
//! return, error, panic) cleans up; [`WorkDir::finish`] is the only way to
//! keep it, according to the configured [`RetentionPolicy`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::core::RetentionPolicy;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Isolated working directory owned by one test run.
#[derive(Debug)]
pub struct WorkDir {
    /// Temporary directory handle; removed on drop.
    dir: TempDir,
}

impl WorkDir {
    /// Creates an empty working directory under `scratch_root` (or the
    /// system temp directory) whose name starts with the test name.
    ///
    /// # Errors
    ///
    /// Returns an error when the scratch root or directory cannot be created.
    pub fn create(scratch_root: Option<&Path>, test_name: &str) -> io::Result<Self> {
        let prefix = format!("{}-", sanitize(test_name));
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match scratch_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self {
            dir,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copies `source` into the working directory, skipping `exclude` and
    /// everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error when traversal or copying fails.
    pub fn populate_from(&self, source: &Path, exclude: &Path) -> io::Result<()> {
        let walker = WalkDir::new(source)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.path() != exclude);
        for entry in walker {
            let entry = entry.map_err(io::Error::other)?;
            let relative = entry.path().strip_prefix(source).map_err(io::Error::other)?;
            let target = self.path().join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    /// Removes files copied to the given output paths.
    ///
    /// A copied output would otherwise stand in for one the command never
    /// wrote. Paths that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing output cannot be removed.
    pub fn remove_outputs(&self, outputs: &[String]) -> io::Result<()> {
        for output in outputs {
            let path = self.path().join(output);
            match fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path)?,
                Ok(_) => fs::remove_file(&path)?,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Writes a file into the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn write(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Consumes the directory, keeping it on disk when the policy says so.
    ///
    /// Returns the kept path, or `None` when the directory was removed.
    #[must_use]
    pub fn finish(self, policy: RetentionPolicy, passed: bool) -> Option<PathBuf> {
        if policy.should_retain(passed) {
            return Some(self.dir.keep());
        }
        let _ = self.dir.close();
        None
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Makes a test name safe for use as a directory prefix.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .take(64)
        .collect();
    if cleaned.is_empty() { "test".to_string() } else { cleaned }
}
