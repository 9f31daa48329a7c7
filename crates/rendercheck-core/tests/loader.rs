// crates/rendercheck-core/tests/loader.rs
// ============================================================================
// Module: Image Loader Tests
// Description: Decoding of real raster files into artifact grids.
// Purpose: Pin normalization, channel layout, and error classification.
// Dependencies: rendercheck-core, image, tempfile
// ============================================================================

//! Image artifact loader tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;

use exr::prelude::AnyChannel;
use exr::prelude::AnyChannels;
use exr::prelude::FlatSamples;
use exr::prelude::Image as ExrImage;
use exr::prelude::WritableImage;
use exr::prelude::f16;
use image::GrayImage;
use image::ImageBuffer;
use image::Luma;
use image::Rgb;
use image::Rgba;
use rendercheck_core::ArtifactError;
use rendercheck_core::ArtifactLoader;
use rendercheck_core::ImageArtifactLoader;
use rendercheck_core::SampleFormat;
use rendercheck_core::Tolerance;
use rendercheck_core::compare;

/// Writes a single-layer EXR with the given channels.
fn write_exr(path: &Path, width: usize, height: usize, channels: Vec<AnyChannel<FlatSamples>>) {
    let image = ExrImage::from_channels((width, height), AnyChannels::sort(channels.into()));
    image.write().to_file(path).unwrap();
}

/// Builds a channel holding one `f32` value per pixel.
fn f32_channel(name: &str, values: &[f32]) -> AnyChannel<FlatSamples> {
    AnyChannel::new(name, FlatSamples::F32(values.to_vec()))
}

#[test]
fn exr_samples_pass_through_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beauty.exr");
    let image: ImageBuffer<Rgba<f32>, Vec<f32>> =
        ImageBuffer::from_fn(3, 2, |x, y| Rgba([x as f32 * 1.5, y as f32, 4.25, 1.0]));
    image.save(&path).unwrap();

    let grid = ImageArtifactLoader::new().load(&path).unwrap();
    assert_eq!((grid.width(), grid.height(), grid.channels()), (3, 2, 4));
    assert_eq!(grid.format(), SampleFormat::F32);
    // pixel (2, 1)
    assert_eq!(&grid.samples()[20 .. 24], &[3.0, 1.0, 4.25, 1.0]);
}

#[test]
fn rgb_exr_keeps_three_channels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("normal.exr");
    let image: ImageBuffer<Rgb<f32>, Vec<f32>> = ImageBuffer::from_pixel(2, 2, Rgb([0.5, -1.0, 8.0]));
    image.save(&path).unwrap();

    let grid = ImageArtifactLoader::new().load(&path).unwrap();
    assert_eq!(grid.channels(), 3);
    assert_eq!(&grid.samples()[.. 3], &[0.5, -1.0, 8.0]);
}

#[test]
fn eight_bit_png_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mask.png");
    let image = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
    image.save(&path).unwrap();

    let grid = ImageArtifactLoader::new().load(&path).unwrap();
    assert_eq!(grid.channels(), 1);
    assert_eq!(grid.format(), SampleFormat::U8);
    assert_eq!(grid.samples(), &[0.0, 1.0]);
}

#[test]
fn sixteen_bit_png_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("depth.png");
    let image: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(1, 1, Luma([u16::MAX]));
    image.save(&path).unwrap();

    let grid = ImageArtifactLoader::new().load(&path).unwrap();
    assert_eq!(grid.format(), SampleFormat::U16);
    assert_eq!(grid.samples(), &[1.0]);
}

#[test]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = ImageArtifactLoader::new().load(&dir.path().join("absent.exr")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn directory_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = ImageArtifactLoader::new().load(dir.path()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn garbage_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.exr");
    fs::write(&path, b"not an image at all").unwrap();
    let err = ImageArtifactLoader::new().load(&path).unwrap_err();
    assert!(matches!(err, ArtifactError::Decode { .. }), "{err:?}");
    assert_eq!(err.path(), path.as_path());
}

#[test]
fn exr_depth_channel_is_kept_after_rgb() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("depth.exr");
    write_exr(
        &path,
        2,
        1,
        vec![
            f32_channel("Z", &[100.0, 100.0]),
            f32_channel("R", &[0.5, 0.5]),
            f32_channel("G", &[0.25, 0.25]),
            f32_channel("B", &[0.125, 0.125]),
        ],
    );

    let grid = ImageArtifactLoader::new().load(&path).unwrap();
    assert_eq!((grid.width(), grid.height(), grid.channels()), (2, 1, 4));
    assert_eq!(&grid.samples()[.. 4], &[0.5, 0.25, 0.125, 100.0]);
}

#[test]
fn exr_depth_difference_fails_the_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let near = dir.path().join("near.exr");
    let far = dir.path().join("far.exr");
    for (path, depth) in [(&near, 1.0), (&far, 100.0)] {
        write_exr(
            path,
            1,
            1,
            vec![
                f32_channel("R", &[0.5]),
                f32_channel("G", &[0.5]),
                f32_channel("B", &[0.5]),
                f32_channel("Z", &[depth]),
            ],
        );
    }

    let loader = ImageArtifactLoader::new();
    let verdict =
        compare(&loader.load(&near).unwrap(), &loader.load(&far).unwrap(), &Tolerance::default());
    assert!(!verdict.passed);
    assert_eq!(verdict.max_difference, 99.0);
    assert_eq!(verdict.failing_percent, 25.0);
}

#[test]
fn half_float_luminance_exr_widens_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("luma.exr");
    let values: Vec<f16> = [0.25_f32, 2.5, -1.0].iter().map(|&value| f16::from_f32(value)).collect();
    write_exr(&path, 3, 1, vec![AnyChannel::new("Y", FlatSamples::F16(values))]);

    let grid = ImageArtifactLoader::new().load(&path).unwrap();
    assert_eq!(grid.channels(), 1);
    assert_eq!(grid.format(), SampleFormat::F16);
    assert_eq!(grid.samples(), &[0.25, 2.5, -1.0]);
}
