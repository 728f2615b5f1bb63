//! Decoding raw bytes into a [`SourceImage`].
//!
//! Truncated-file leniency is an explicit argument rather than a process-wide
//! switch, so two workers decoding at the same time can never disagree about
//! it. When enabled, a decode that runs out of data keeps whatever rows were
//! produced and leaves the rest zeroed.
//!
//! Not every decoder reports running out of data. The JPEG decoder pads a
//! truncated scan without error, so a cut-off JPEG decodes successfully
//! whether or not leniency is enabled. The switch only matters for formats
//! that surface truncation, such as PNG.

use image::{
    ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageError, ImageFormat, ImageReader,
};
use std::io::{Cursor, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unrecognized image format")]
    UnknownFormat,
    #[error("decode failed: {0}")]
    Image(#[from] ImageError),
    #[error("cannot salvage truncated {0:?} image")]
    UnsupportedColor(ColorType),
}

/// A decoded image together with the container format it was read from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

impl SourceImage {
    pub fn new(image: DynamicImage, format: Option<ImageFormat>) -> Self {
        Self { image, format }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Decode `bytes`, sniffing the format from the content.
pub fn decode_bytes(bytes: &[u8], allow_truncated: bool) -> Result<SourceImage, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format().ok_or(DecodeError::UnknownFormat)?;

    if !allow_truncated {
        let image = reader.decode()?;
        return Ok(SourceImage::new(image, Some(format)));
    }

    let decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();
    let color = decoder.color_type();
    let mut buf = vec![0u8; decoder.total_bytes() as usize];

    match decoder.read_image(&mut buf) {
        Ok(()) => {}
        Err(e) if is_truncation(&e) => {
            tracing::warn!("keeping partial {format:?} image after truncated read: {e}");
        }
        Err(e) => return Err(e.into()),
    }

    let image = from_raw(width, height, color, buf)?;
    Ok(SourceImage::new(image, Some(format)))
}

/// Whether a decode error means the data simply ran out.
pub fn is_truncation(err: &ImageError) -> bool {
    match err {
        ImageError::IoError(io) => io.kind() == ErrorKind::UnexpectedEof,
        ImageError::Decoding(d) => {
            let msg = d.to_string().to_ascii_lowercase();
            ["unexpected end", "end of file", "eof", "truncated", "not enough data"]
                .iter()
                .any(|needle| msg.contains(needle))
        }
        _ => false,
    }
}

fn from_raw(
    width: u32,
    height: u32,
    color: ColorType,
    buf: Vec<u8>,
) -> Result<DynamicImage, DecodeError> {
    let image = match color {
        ColorType::L8 => ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageLuma8),
        ColorType::La8 => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
        }
        ColorType::Rgb8 => ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageRgb8),
        ColorType::Rgba8 => {
            ImageBuffer::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
        }
        ColorType::L16 => ImageBuffer::from_raw(width, height, widen(&buf))
            .map(DynamicImage::ImageLuma16),
        ColorType::La16 => ImageBuffer::from_raw(width, height, widen(&buf))
            .map(DynamicImage::ImageLumaA16),
        ColorType::Rgb16 => ImageBuffer::from_raw(width, height, widen(&buf))
            .map(DynamicImage::ImageRgb16),
        ColorType::Rgba16 => ImageBuffer::from_raw(width, height, widen(&buf))
            .map(DynamicImage::ImageRgba16),
        other => return Err(DecodeError::UnsupportedColor(other)),
    };
    image.ok_or(DecodeError::UnsupportedColor(color))
}

/// Decoders write 16-bit samples in native byte order.
fn widen(buf: &[u8]) -> Vec<u16> {
    buf.chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{encode, solid};
    use image::error::{DecodingError, ImageFormatHint};

    #[test]
    fn decodes_png_and_reports_format() {
        let bytes = encode(&solid(30, 20, [10, 20, 30, 255]), ImageFormat::Png);
        let src = decode_bytes(&bytes, false).unwrap();
        assert_eq!(src.dimensions(), (30, 20));
        assert_eq!(src.format, Some(ImageFormat::Png));
        assert_eq!(src.image.to_rgba8().get_pixel(5, 5).0, [10, 20, 30, 255]);
    }

    #[test]
    fn lenient_decode_of_complete_file_is_identical() {
        let bytes = encode(&solid(12, 12, [200, 100, 50, 255]), ImageFormat::Png);
        let strict = decode_bytes(&bytes, false).unwrap();
        let lenient = decode_bytes(&bytes, true).unwrap();
        assert_eq!(strict.image.to_rgba8(), lenient.image.to_rgba8());
    }

    #[test]
    fn garbage_is_unknown_format() {
        let result = decode_bytes(b"definitely not an image", false);
        assert!(matches!(result, Err(DecodeError::UnknownFormat)));
    }

    #[test]
    fn truncated_png_fails_when_not_allowed() {
        let bytes = encode(&crate::test_helpers::noise(64, 64), ImageFormat::Png);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(decode_bytes(truncated, false).is_err());
    }

    #[test]
    fn truncated_png_is_salvaged_when_allowed() {
        let bytes = encode(&crate::test_helpers::noise(64, 64), ImageFormat::Png);
        let truncated = &bytes[..bytes.len() / 2];

        let src = decode_bytes(truncated, true).unwrap();
        assert_eq!(src.dimensions(), (64, 64));
        assert_eq!(src.format, Some(ImageFormat::Png));
    }

    #[test]
    fn eof_errors_are_truncation() {
        let io = ImageError::IoError(std::io::Error::from(ErrorKind::UnexpectedEof));
        assert!(is_truncation(&io));

        let decoding = ImageError::Decoding(DecodingError::new(
            ImageFormatHint::Exact(ImageFormat::Png),
            "Unexpected end of data before image end",
        ));
        assert!(is_truncation(&decoding));
    }

    #[test]
    fn other_errors_are_not_truncation() {
        let io = ImageError::IoError(std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(!is_truncation(&io));

        let decoding = ImageError::Decoding(DecodingError::new(
            ImageFormatHint::Exact(ImageFormat::Png),
            "invalid filter method",
        ));
        assert!(!is_truncation(&decoding));
    }
}
