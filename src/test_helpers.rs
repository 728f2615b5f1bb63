//! Shared test utilities for the atlasmaker test suite.
//!
//! Image builders, pixel probes, and [`MockSource`], an in-memory
//! [`ImageSource`] that records every fetch so tests can check how the
//! parallel runner drives it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let source = MockSource::new().with_image("a.png", solid(20, 20, [255, 0, 0, 255]));
//! let results = run_all(&source, &["a.png".into()], &settings, RunOptions::default())?;
//! assert_eq!(rgba_at(results[0].image().unwrap(), 0, 0), [255, 0, 0, 255]);
//! assert_eq!(source.calls(), vec!["a.png"]);
//! ```

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};

use crate::fetch::{FetchError, ImageSource};
use crate::imaging::SourceImage;

// =========================================================================
// Image builders
// =========================================================================

/// Single-colour RGBA image.
pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

/// Left half `left`, right half `right` (split at `width / 2`).
pub fn halves(width: u32, height: u32, left: [u8; 4], right: [u8; 4]) -> DynamicImage {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 { Rgba(left) } else { Rgba(right) }
    });
    DynamicImage::ImageRgba8(img)
}

/// Deterministic high-entropy pattern; compresses badly, so encoded files are large.
pub fn noise(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x9e37_79b9;
    let img = RgbaImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgba([r, g, b, 255])
    });
    DynamicImage::ImageRgba8(img)
}

/// Wrap an in-memory image as a decoded source of unknown format.
pub fn source(image: DynamicImage) -> SourceImage {
    SourceImage::new(image, None)
}

/// Encode `img` into `format` bytes.
pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// Write `img` as PNG to `dir/name` and return the path.
pub fn write_image(dir: &Path, name: &str, img: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

// =========================================================================
// Pixel probes
// =========================================================================

/// RGBA value of the pixel at `(x, y)`.
pub fn rgba_at(img: &DynamicImage, x: u32, y: u32) -> [u8; 4] {
    img.get_pixel(x, y).0
}

// =========================================================================
// Mock image source
// =========================================================================

/// In-memory [`ImageSource`]. Unknown locations fail with a not-found error
/// naming the location.
#[derive(Default)]
pub struct MockSource {
    images: HashMap<String, DynamicImage>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
    truncated_flags: Mutex<Vec<bool>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, location: &str, image: DynamicImage) -> Self {
        self.images.insert(location.to_string(), image);
        self
    }

    /// Sleep for `delay` before answering fetches of `location`.
    pub fn with_delay(mut self, location: &str, delay: Duration) -> Self {
        self.delays.insert(location.to_string(), delay);
        self
    }

    /// Locations fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// `allow_truncated` argument of each fetch, in call order.
    pub fn truncated_flags(&self) -> Vec<bool> {
        self.truncated_flags.lock().unwrap().clone()
    }
}

impl ImageSource for MockSource {
    fn fetch(&self, location: &str, allow_truncated: bool) -> Result<SourceImage, FetchError> {
        self.calls.lock().unwrap().push(location.to_string());
        self.truncated_flags.lock().unwrap().push(allow_truncated);

        if let Some(delay) = self.delays.get(location) {
            std::thread::sleep(*delay);
        }

        match self.images.get(location) {
            Some(img) => Ok(SourceImage::new(img.clone(), Some(ImageFormat::Png))),
            None => Err(FetchError::Io {
                path: PathBuf::from(location),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such mock image",
                ),
            }),
        }
    }
}
