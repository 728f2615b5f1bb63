//! Parameter types for image conversion.
//!
//! These structs describe *what* every source image should become, not *how*
//! the pixels get there. [`ConversionSettings`] is shared read-only by every
//! worker in the fetch pool and by the atlas assembler (which needs the
//! background colour for the default image).
//!
//! ## Types
//!
//! - [`Anchor`]: Normalized `(x, y)` placement of content inside leftover canvas space.
//! - [`ConversionSettings`]: Validated output geometry, format, background and resize policy.
//! - [`SettingsBuilder`]: Collects raw values and validates them all at once.

use image::{ImageFormat, Rgba};
use thiserror::Error;

/// Smallest accepted target width or height, in pixels.
pub const MIN_DIMENSION: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("invalid conversion settings: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Where content sits inside the leftover space of a canvas or crop.
///
/// `(0, 0)` is top-left, `(1, 1)` bottom-right, `(0.5, 0.5)` centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl Anchor {
    pub const CENTER: Anchor = Anchor { x: 0.5, y: 0.5 };
    pub const TOP_LEFT: Anchor = Anchor { x: 0.0, y: 0.0 };
    pub const BOTTOM_RIGHT: Anchor = Anchor { x: 1.0, y: 1.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_valid(self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Validated conversion settings. Only obtainable through [`SettingsBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSettings {
    format: ImageFormat,
    target_width: u32,
    target_height: u32,
    anchor: Anchor,
    background: Rgba<u8>,
    preserve_aspect_ratio: bool,
    upscale_if_smaller: bool,
}

impl ConversionSettings {
    /// Start building settings for `format` at `width`×`height` pixels.
    ///
    /// Defaults: centered anchor, transparent black background, aspect ratio
    /// preserved, no upscaling.
    pub fn builder(format: &str, width: u32, height: u32) -> SettingsBuilder {
        SettingsBuilder {
            format: format.to_string(),
            width,
            height,
            anchor: Anchor::CENTER,
            background: [0, 0, 0, 0],
            preserve_aspect_ratio: true,
            upscale_if_smaller: false,
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Primary file extension for the output format (`png`, `jpg`, ...).
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    pub fn preserve_aspect_ratio(&self) -> bool {
        self.preserve_aspect_ratio
    }

    pub fn upscale_if_smaller(&self) -> bool {
        self.upscale_if_smaller
    }
}

/// Unvalidated settings. Colour channels are kept wide so that out-of-range
/// input from config files or flags is reported rather than silently wrapped.
#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    format: String,
    width: u32,
    height: u32,
    anchor: Anchor,
    background: [i64; 4],
    preserve_aspect_ratio: bool,
    upscale_if_smaller: bool,
}

impl SettingsBuilder {
    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Background as `[r, g, b, alpha]`, each expected in `0..=255`.
    pub fn background(mut self, rgba: [i64; 4]) -> Self {
        self.background = rgba;
        self
    }

    pub fn preserve_aspect_ratio(mut self, keep: bool) -> Self {
        self.preserve_aspect_ratio = keep;
        self
    }

    pub fn upscale_if_smaller(mut self, upscale: bool) -> Self {
        self.upscale_if_smaller = upscale;
        self
    }

    /// Validate every field and report all violations together.
    pub fn build(self) -> Result<ConversionSettings, SettingsError> {
        let mut errors = Vec::new();

        if !self.anchor.is_valid() {
            errors.push(format!(
                "anchor ({}, {}) must have both components between 0 and 1",
                self.anchor.x, self.anchor.y
            ));
        }

        let mut background = [0u8; 4];
        for (i, (channel, name)) in self
            .background
            .iter()
            .zip(["red", "green", "blue", "alpha"])
            .enumerate()
        {
            match u8::try_from(*channel) {
                Ok(v) => background[i] = v,
                Err(_) => errors.push(format!(
                    "{name} channel {channel} must be between 0 and 255"
                )),
            }
        }

        if self.width < MIN_DIMENSION {
            errors.push(format!(
                "width {} must be at least {MIN_DIMENSION} pixels",
                self.width
            ));
        }
        if self.height < MIN_DIMENSION {
            errors.push(format!(
                "height {} must be at least {MIN_DIMENSION} pixels",
                self.height
            ));
        }

        let format = match parse_format(&self.format) {
            Ok(f) => Some(f),
            Err(msg) => {
                errors.push(msg);
                None
            }
        };

        match format {
            Some(format) if errors.is_empty() => Ok(ConversionSettings {
                format,
                target_width: self.width,
                target_height: self.height,
                anchor: self.anchor,
                background: Rgba(background),
                preserve_aspect_ratio: self.preserve_aspect_ratio,
                upscale_if_smaller: self.upscale_if_smaller,
            }),
            _ => Err(SettingsError::Invalid(errors)),
        }
    }
}

/// Resolve an output format name (`png`, `JPEG`, `tif`, ...) to an encoder we can write.
pub fn parse_format(name: &str) -> Result<ImageFormat, String> {
    let lowered = name.trim().to_ascii_lowercase();
    match ImageFormat::from_extension(&lowered) {
        Some(format) if format.writing_enabled() => Ok(format),
        Some(_) => Err(format!("output format '{name}' cannot be written")),
        None => Err(format!("unknown output format '{name}'")),
    }
}
