// crates/rendercheck-core/src/core/grid.rs
// ============================================================================
// Module: rendercheck Artifact Grids
// Description: Decoded raster samples with explicit shape.
// Purpose: Give the comparator a codec-independent view of an artifact.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An [`ArtifactGrid`] is a row-major, channel-interleaved sequence of `f32`
//! samples. The constructor enforces `samples == width * height * channels`,
//! so every grid handed to the comparator is internally consistent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Storage format of the samples in the source file.
///
/// Informational only: comparison works on the decoded `f32` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// 8-bit unsigned integers normalized to [0, 1].
    U8,
    /// 16-bit unsigned integers normalized to [0, 1].
    U16,
    /// 16-bit floats widened exactly to `f32`.
    F16,
    /// 32-bit floats passed through unchanged.
    F32,
    /// 32-bit unsigned integers (OpenEXR id channels) converted to `f32`
    /// without normalization.
    U32,
}

/// Width, height, and channel count of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel.
    pub channels: u16,
}

impl GridShape {
    /// Returns the number of samples a grid of this shape holds, if it fits.
    #[must_use]
    pub fn sample_count(self) -> Option<usize> {
        let width = usize::try_from(self.width).ok()?;
        let height = usize::try_from(self.height).ok()?;
        width.checked_mul(height)?.checked_mul(usize::from(self.channels))
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// Grid construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// The sample buffer does not match the declared shape.
    #[error("grid {shape} expects {expected} samples, got {actual}")]
    SampleCountMismatch {
        /// Declared shape.
        shape: GridShape,
        /// Samples implied by the shape.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },
    /// The declared shape overflows addressable memory.
    #[error("grid {0} is too large")]
    TooLarge(GridShape),
}

/// Decoded raster artifact.
///
/// # Invariants
/// - `samples.len() == width * height * channels`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactGrid {
    /// Grid dimensions.
    shape: GridShape,
    /// Row-major, channel-interleaved samples.
    samples: Vec<f32>,
    /// Source storage format.
    format: SampleFormat,
}

impl ArtifactGrid {
    /// Builds a grid after checking the sample count against the shape.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] when the buffer length does not match the shape.
    pub fn new(
        width: u32,
        height: u32,
        channels: u16,
        samples: Vec<f32>,
        format: SampleFormat,
    ) -> Result<Self, GridError> {
        let shape = GridShape {
            width,
            height,
            channels,
        };
        let expected = shape.sample_count().ok_or(GridError::TooLarge(shape))?;
        if samples.len() != expected {
            return Err(GridError::SampleCountMismatch {
                shape,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            shape,
            samples,
            format,
        })
    }

    /// Builds an `f32` grid; convenience for callers holding float data.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] when the buffer length does not match the shape.
    pub fn from_f32(
        width: u32,
        height: u32,
        channels: u16,
        samples: Vec<f32>,
    ) -> Result<Self, GridError> {
        Self::new(width, height, channels, samples, SampleFormat::F32)
    }

    /// Returns the grid shape.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Returns the width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.shape.width
    }

    /// Returns the height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.shape.height
    }

    /// Returns the channel count.
    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.shape.channels
    }

    /// Returns the samples.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the source sample format.
    #[must_use]
    pub const fn format(&self) -> SampleFormat {
        self.format
    }
}
