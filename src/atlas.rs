//! Laying converted images out on a grid and describing where each one went.
//!
//! ## Layout
//!
//! With `N` images the grid is `ceil(sqrt(N))` cells on each side. Cells are
//! filled row-major in input order; cells past `N` keep the opaque white
//! background.
//!
//! ```text
//! N = 5, side = 3
//! ┌───┬───┬───┐
//! │ 0 │ 1 │ 2 │
//! ├───┼───┼───┤
//! │ 3 │ 4 │   │
//! ├───┼───┼───┤
//! │   │   │   │
//! └───┴───┴───┘
//! ```
//!
//! Failed images are drawn with the default image and their manifest entry
//! carries the failure reason in `error`.

use crate::imaging::calculations::grid_side;
use crate::process::FetchResult;
use image::{DynamicImage, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Background of atlas cells that no image occupies.
pub const ATLAS_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Error, Debug, PartialEq)]
pub enum AtlasError {
    #[error("got {images} images but {paths} source paths")]
    LengthMismatch { images: usize, paths: usize },
    #[error("image {index} ({path}) is {actual:?}, expected {expected:?}: input images are not all the same size")]
    SizeMismatch {
        index: usize,
        path: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("default image is {actual:?}, expected {expected:?}")]
    DefaultSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("no image was retrieved and converted successfully")]
    NoSuccessfulImages,
    #[error("not implemented: {0}")]
    Unsupported(String),
}

/// Atlas shape requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtlasSettings {
    /// Explicit `(columns, rows)`. Not supported; `None` picks a square grid.
    pub grid: Option<(u32, u32)>,
}

/// One manifest line: where an image landed in the atlas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// File name component of the source location.
    pub image_name: String,
    /// Location exactly as listed in the source list.
    pub source_path: String,
    pub offset_x: u32,
    pub offset_y: u32,
    /// Why the default image was used instead, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A finished sprite atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct Atlas {
    pub image: RgbaImage,
    pub manifest: Vec<ManifestEntry>,
    /// Cells per side.
    pub grid_side: u32,
    /// Pixel size of one cell.
    pub cell_size: (u32, u32),
}

impl Atlas {
    pub fn failures(&self) -> usize {
        self.manifest.iter().filter(|e| e.error.is_some()).count()
    }
}

/// File name of a location (path or URL), falling back to the whole string.
pub fn image_name(location: &str) -> String {
    let trimmed = location.trim_end_matches('/');
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    Path::new(without_query)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(without_query)
        .to_string()
}

/// Reject atlas shapes that [`assemble`] cannot produce.
pub fn check_settings(settings: &AtlasSettings) -> Result<(), AtlasError> {
    match settings.grid {
        Some((cols, rows)) => Err(AtlasError::Unsupported(format!(
            "explicit atlas size {cols}x{rows} (multiple atlases) is not supported"
        ))),
        None => Ok(()),
    }
}

/// Assemble `results` (one per entry of `source_paths`) into a single atlas.
pub fn assemble(
    results: &[FetchResult],
    source_paths: &[String],
    default_image: &DynamicImage,
    settings: &AtlasSettings,
) -> Result<Atlas, AtlasError> {
    check_settings(settings)?;

    if results.len() != source_paths.len() {
        return Err(AtlasError::LengthMismatch {
            images: results.len(),
            paths: source_paths.len(),
        });
    }

    let cell = results
        .iter()
        .find_map(FetchResult::image)
        .map(|img| (img.width(), img.height()))
        .ok_or(AtlasError::NoSuccessfulImages)?;

    for (index, result) in results.iter().enumerate() {
        if let Some(img) = result.image() {
            let actual = (img.width(), img.height());
            if actual != cell {
                return Err(AtlasError::SizeMismatch {
                    index,
                    path: source_paths[index].clone(),
                    expected: cell,
                    actual,
                });
            }
        }
    }

    let default_size = (default_image.width(), default_image.height());
    if default_size != cell {
        return Err(AtlasError::DefaultSizeMismatch {
            expected: cell,
            actual: default_size,
        });
    }

    let side = grid_side(results.len());
    let mut canvas = RgbaImage::from_pixel(side * cell.0, side * cell.1, ATLAS_BACKGROUND);
    let default_rgba = default_image.to_rgba8();
    let mut manifest = Vec::with_capacity(results.len());

    for (index, (result, path)) in results.iter().zip(source_paths).enumerate() {
        let col = index as u32 % side;
        let row = index as u32 / side;
        let (x, y) = (col * cell.0, row * cell.1);

        match result {
            FetchResult::Success(img) => {
                imageops::replace(&mut canvas, &img.to_rgba8(), i64::from(x), i64::from(y));
            }
            FetchResult::Failure(_) => {
                imageops::replace(&mut canvas, &default_rgba, i64::from(x), i64::from(y));
            }
        }

        manifest.push(ManifestEntry {
            image_name: image_name(path),
            source_path: path.clone(),
            offset_x: x,
            offset_y: y,
            error: result.error().map(str::to_string),
        });
    }

    tracing::info!(
        "assembled {} images into a {side}x{side} grid of {}x{} cells",
        results.len(),
        cell.0,
        cell.1
    );

    Ok(Atlas {
        image: canvas,
        manifest,
        grid_side: side,
        cell_size: cell,
    })
}
