//! Normalizing one decoded image onto the fixed target canvas.
//!
//! ## Strategy selection
//!
//! | Source vs. target | Policy | Strategy |
//! |---|---|---|
//! | same size, same format | any | [`Strategy::Unchanged`] |
//! | target larger on both axes | no upscale | [`Strategy::Pad`] |
//! | target larger on both axes | upscale, keep aspect | [`Strategy::UpscaleFit`] |
//! | target larger on both axes | upscale, stretch | [`Strategy::Stretch`] |
//! | otherwise | keep aspect | [`Strategy::ShrinkFit`] |
//! | otherwise | crop | [`Strategy::CropFill`] |
//!
//! Every strategy except `Unchanged` yields an RGBA image of exactly the target
//! size. Pasting replaces pixels; it does not alpha-blend onto the background.

use super::calculations::{
    anchored_offset, centered_offset, crop_window, fit_within, scale_to_fit,
};
use super::decode::SourceImage;
use super::params::ConversionSettings;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

/// How a source image is brought to the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Already the right size and format.
    Unchanged,
    /// Smaller source centered on the background, no scaling.
    Pad,
    /// Smaller source enlarged without distortion, then centered.
    UpscaleFit,
    /// Smaller source stretched independently per axis.
    Stretch,
    /// Shrunk to fit inside the target, placed by the anchor.
    ShrinkFit,
    /// Cropped to the target aspect ratio (window placed by the anchor), then resized.
    CropFill,
}

/// Decide which strategy applies. Pure: depends only on geometry, format and policy.
pub fn plan(
    source: (u32, u32),
    source_format: Option<ImageFormat>,
    settings: &ConversionSettings,
) -> Strategy {
    let target = settings.target_size();

    if source == target && source_format == Some(settings.format()) {
        return Strategy::Unchanged;
    }

    if target.0 > source.0 && target.1 > source.1 {
        return match (settings.upscale_if_smaller(), settings.preserve_aspect_ratio()) {
            (false, _) => Strategy::Pad,
            (true, true) => Strategy::UpscaleFit,
            (true, false) => Strategy::Stretch,
        };
    }

    if settings.preserve_aspect_ratio() {
        Strategy::ShrinkFit
    } else {
        Strategy::CropFill
    }
}

/// Normalize `source` to the canvas described by `settings`.
pub fn convert(source: SourceImage, settings: &ConversionSettings) -> DynamicImage {
    let dims = source.dimensions();
    let strategy = plan(dims, source.format, settings);
    tracing::debug!(
        "converting {}x{} with {:?} to {}x{}",
        dims.0,
        dims.1,
        strategy,
        settings.target_width(),
        settings.target_height()
    );

    let target = settings.target_size();
    let image = source.image;

    match strategy {
        Strategy::Unchanged => image,
        Strategy::Pad => {
            let offset = centered_offset(target, dims);
            DynamicImage::ImageRgba8(on_background(&image, settings, offset))
        }
        Strategy::UpscaleFit => {
            let (w, h) = scale_to_fit(dims, target);
            let scaled = image.resize_exact(w, h, FilterType::Lanczos3);
            if (w, h) == target {
                return DynamicImage::ImageRgba8(scaled.to_rgba8());
            }
            let offset = centered_offset(target, (w, h));
            DynamicImage::ImageRgba8(on_background(&scaled, settings, offset))
        }
        Strategy::Stretch => {
            let stretched = image.resize_exact(target.0, target.1, FilterType::Lanczos3);
            DynamicImage::ImageRgba8(stretched.to_rgba8())
        }
        Strategy::ShrinkFit => {
            let (w, h) = fit_within(dims, target);
            let shrunk = if (w, h) == dims {
                image
            } else {
                image.resize_exact(w, h, FilterType::Lanczos3)
            };
            let offset = anchored_offset(target, (w, h), settings.anchor());
            DynamicImage::ImageRgba8(on_background(&shrunk, settings, offset))
        }
        Strategy::CropFill => {
            let window = crop_window(dims, target, settings.anchor());
            let cropped = image.crop_imm(window.x, window.y, window.width, window.height);
            let filled = cropped.resize_exact(target.0, target.1, FilterType::Lanczos3);
            DynamicImage::ImageRgba8(filled.to_rgba8())
        }
    }
}

/// Paste `image` at `offset` onto a target-sized canvas filled with the background.
fn on_background(
    image: &DynamicImage,
    settings: &ConversionSettings,
    offset: (i64, i64),
) -> RgbaImage {
    let mut canvas = blank_canvas(settings);
    imageops::replace(&mut canvas, &image.to_rgba8(), offset.0, offset.1);
    canvas
}

fn blank_canvas(settings: &ConversionSettings) -> RgbaImage {
    RgbaImage::from_pixel(
        settings.target_width(),
        settings.target_height(),
        settings.background(),
    )
}

/// Target-sized image of the background colour.
///
/// Stands in for failed images when no explicit default image is configured.
pub fn create_default_image(settings: &ConversionSettings) -> DynamicImage {
    DynamicImage::ImageRgba8(blank_canvas(settings))
}
