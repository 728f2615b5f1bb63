//! Image processing in pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from content) |
//! | **Resize** | `DynamicImage::resize_exact` with Lanczos3 |
//! | **Crop** | `DynamicImage::crop_imm` |
//! | **Paste** | `image::imageops::replace` |
//!
//! The module is split into:
//! - **Parameters**: [`ConversionSettings`] and its validation
//! - **Calculations**: Pure functions for dimension and offset math (unit testable)
//! - **Decode**: Bytes → [`SourceImage`], with explicit truncated-data leniency
//! - **Convert**: Strategy selection and pixel work

pub mod calculations;
pub mod convert;
pub mod decode;
mod params;

pub use convert::{Strategy, convert, create_default_image, plan};
pub use decode::{DecodeError, SourceImage, decode_bytes};
pub use params::{
    Anchor, ConversionSettings, MIN_DIMENSION, SettingsBuilder, SettingsError, parse_format,
};
