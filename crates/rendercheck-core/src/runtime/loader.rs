// crates/rendercheck-core/src/runtime/loader.rs
// ============================================================================
// Module: rendercheck Image Loader
// Description: `image`-crate backed artifact decoder.
// Purpose: Decode raster artifacts into grids without altering sample values.
// Dependencies: crate::{core, interfaces}, exr, image
// ============================================================================

//! ## Overview
//! OpenEXR samples are passed through as stored (half floats widen exactly
//! to `f32`). Integer formats are normalized to [0, 1] by dividing by the
//! type maximum. No gamma, colorspace, or channel-layout conversion happens:
//! the grid has exactly the channels the decoder reports.
//!
//! OpenEXR files are read with the `exr` crate directly rather than through
//! `image`, which keeps only RGB(A). Every channel of every layer lands in
//! the grid: per layer `R`, `G`, `B`, `A` first, then the remaining channels
//! in header order (depth `Z`, ids, AOVs).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;

use exr::prelude::AnyChannel;
use exr::prelude::FlatSamples;
use exr::prelude::ReadChannels;
use exr::prelude::ReadLayers;
use image::DynamicImage;
use image::ImageFormat;
use image::ImageReader;

use crate::core::ArtifactGrid;
use crate::core::SampleFormat;
use crate::interfaces::ArtifactError;
use crate::interfaces::ArtifactLoader;

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Artifact loader for OpenEXR, PNG, TIFF, and Radiance HDR files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageArtifactLoader;

impl ImageArtifactLoader {
    /// Creates a loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ArtifactLoader for ImageArtifactLoader {
    fn load(&self, path: &Path) -> Result<ArtifactGrid, ArtifactError> {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                return Err(ArtifactError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(decode_error(path, err)),
        }

        let reader = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|err| decode_error(path, err))?;
        let grid = if reader.format() == Some(ImageFormat::OpenExr) {
            load_exr(path)
        } else {
            let image = reader.decode().map_err(|err| decode_error(path, err))?;
            grid_from_image(image)
        };
        grid.map_err(|message| ArtifactError::Decode {
            path: path.to_path_buf(),
            message,
        })
    }
}

// ============================================================================
// SECTION: OpenEXR
// ============================================================================

/// Decodes every channel of every layer of an OpenEXR file.
fn load_exr(path: &Path) -> Result<ArtifactGrid, String> {
    let image = exr::prelude::read()
        .no_deep_data()
        .largest_resolution_level()
        .all_channels()
        .all_layers()
        .all_attributes()
        .from_file(path)
        .map_err(|err| err.to_string())?;

    let Some(first) = image.layer_data.first() else {
        return Err("file contains no layers".to_string());
    };
    let size = first.size;
    let mut channels: Vec<&AnyChannel<FlatSamples>> = Vec::new();
    for layer in &image.layer_data {
        if layer.size != size {
            return Err(format!(
                "layers differ in size ({}x{} and {}x{})",
                size.width(),
                size.height(),
                layer.size.width(),
                layer.size.height()
            ));
        }
        let mut ordered: Vec<&AnyChannel<FlatSamples>> = layer.channel_data.list.iter().collect();
        ordered.sort_by_key(|channel| channel_rank(&channel.name.to_string()));
        channels.extend(ordered);
    }
    if let Some(channel) = channels.iter().find(|channel| channel.sampling.area() != 1) {
        return Err(format!("channel {} is subsampled", channel.name));
    }

    let width = u32::try_from(size.width()).map_err(|err| err.to_string())?;
    let height = u32::try_from(size.height()).map_err(|err| err.to_string())?;
    let count = u16::try_from(channels.len()).map_err(|err| err.to_string())?;
    let pixels = size.area();
    let mut samples = vec![0.0_f32; pixels * channels.len()];
    for (index, channel) in channels.iter().enumerate() {
        let values = channel_values(&channel.sample_data);
        if values.len() != pixels {
            return Err(format!("channel {} has {} samples", channel.name, values.len()));
        }
        for (pixel, value) in values.into_iter().enumerate() {
            samples[pixel * channels.len() + index] = value;
        }
    }
    let format = exr_format(channels.iter().map(|channel| &channel.sample_data));
    ArtifactGrid::new(width, height, count, samples, format).map_err(|err| err.to_string())
}

/// Orders `R`, `G`, `B`, `A` ahead of every other channel name.
fn channel_rank(name: &str) -> u8 {
    match name {
        "R" => 0,
        "G" => 1,
        "B" => 2,
        "A" => 3,
        _ => 4,
    }
}

/// Widens a channel's samples to `f32`.
#[allow(clippy::cast_precision_loss, reason = "u32 id channels are compared as f32.")]
fn channel_values(samples: &FlatSamples) -> Vec<f32> {
    match samples {
        FlatSamples::F16(values) => values.iter().map(|value| value.to_f32()).collect(),
        FlatSamples::F32(values) => values.clone(),
        FlatSamples::U32(values) => values.iter().map(|&value| value as f32).collect(),
    }
}

/// Reports the storage format shared by all channels, or `F32` when mixed.
fn exr_format<'a>(mut samples: impl Iterator<Item = &'a FlatSamples>) -> SampleFormat {
    let format_of = |samples: &FlatSamples| match samples {
        FlatSamples::F16(_) => SampleFormat::F16,
        FlatSamples::F32(_) => SampleFormat::F32,
        FlatSamples::U32(_) => SampleFormat::U32,
    };
    let Some(first) = samples.next().map(format_of) else {
        return SampleFormat::F32;
    };
    if samples.all(|other| format_of(other) == first) { first } else { SampleFormat::F32 }
}

// ============================================================================
// SECTION: Conversion
// ============================================================================

/// Converts a decoded image into a grid, keeping its channel layout.
fn grid_from_image(image: DynamicImage) -> Result<ArtifactGrid, String> {
    let width = image.width();
    let height = image.height();
    let (channels, samples, format) = match image {
        DynamicImage::ImageLuma8(buffer) => (1, normalize_u8(buffer.as_raw()), SampleFormat::U8),
        DynamicImage::ImageLumaA8(buffer) => (2, normalize_u8(buffer.as_raw()), SampleFormat::U8),
        DynamicImage::ImageRgb8(buffer) => (3, normalize_u8(buffer.as_raw()), SampleFormat::U8),
        DynamicImage::ImageRgba8(buffer) => (4, normalize_u8(buffer.as_raw()), SampleFormat::U8),
        DynamicImage::ImageLuma16(buffer) => {
            (1, normalize_u16(buffer.as_raw()), SampleFormat::U16)
        }
        DynamicImage::ImageLumaA16(buffer) => {
            (2, normalize_u16(buffer.as_raw()), SampleFormat::U16)
        }
        DynamicImage::ImageRgb16(buffer) => (3, normalize_u16(buffer.as_raw()), SampleFormat::U16),
        DynamicImage::ImageRgba16(buffer) => {
            (4, normalize_u16(buffer.as_raw()), SampleFormat::U16)
        }
        DynamicImage::ImageRgb32F(buffer) => (3, buffer.into_raw(), SampleFormat::F32),
        DynamicImage::ImageRgba32F(buffer) => (4, buffer.into_raw(), SampleFormat::F32),
        other => {
            return Err(format!(
                "unsupported pixel layout with {} channels",
                other.color().channel_count()
            ));
        }
    };
    ArtifactGrid::new(width, height, channels, samples, format).map_err(|err| err.to_string())
}

/// Maps 8-bit samples onto [0, 1].
fn normalize_u8(raw: &[u8]) -> Vec<f32> {
    raw.iter().map(|&value| f32::from(value) / f32::from(u8::MAX)).collect()
}

/// Maps 16-bit samples onto [0, 1].
fn normalize_u16(raw: &[u16]) -> Vec<f32> {
    raw.iter().map(|&value| f32::from(value) / f32::from(u16::MAX)).collect()
}

/// Wraps a decoder or I/O failure.
fn decode_error(path: &Path, err: impl std::fmt::Display) -> ArtifactError {
    ArtifactError::Decode {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
