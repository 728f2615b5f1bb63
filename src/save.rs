//! Writing the atlas image and its manifest to disk.
//!
//! ## Output Structure
//!
//! ```text
//! <output_dir>/
//! ├── spriteatlas.png     # Atlas in the configured format
//! └── spriteatlas.json    # One JSON object per line, in atlas order
//! ```

use crate::atlas::{Atlas, ManifestEntry};
use image::{DynamicImage, ImageError, ImageFormat};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const PROBE_FILE: &str = ".atlasmaker-write-test";

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot encode atlas as {format:?}: {source}")]
    Encode {
        format: ImageFormat,
        source: image::ImageError,
    },
}

/// Paths of the files written by [`save_atlas_and_manifest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFiles {
    pub atlas: PathBuf,
    pub manifest: PathBuf,
}

/// Create `dir` if needed and prove it is writable with a probe file.
pub fn ensure_writable_dir(dir: &Path) -> Result<(), SaveError> {
    if !dir.is_dir() {
        tracing::info!("output dir {} doesn't exist, creating it", dir.display());
        std::fs::create_dir_all(dir)?;
    }
    let probe = dir.join(PROBE_FILE);
    std::fs::write(&probe, b"")?;
    std::fs::remove_file(&probe)?;
    tracing::debug!("confirmed write access to {}", dir.display());
    Ok(())
}

/// Write `<base_name>.<ext>` and `<base_name>.json` into `dir`.
pub fn save_atlas_and_manifest(
    atlas: &Atlas,
    dir: &Path,
    base_name: &str,
    format: ImageFormat,
) -> Result<SavedFiles, SaveError> {
    let ext = format.extensions_str().first().copied().unwrap_or("img");
    let atlas_path = dir.join(format!("{base_name}.{ext}"));
    let manifest_path = dir.join(format!("{base_name}.json"));

    save_image(&DynamicImage::ImageRgba8(atlas.image.clone()), &atlas_path, format)?;
    write_manifest(&atlas.manifest, &manifest_path)?;

    Ok(SavedFiles {
        atlas: atlas_path,
        manifest: manifest_path,
    })
}

/// Save `img` as `format`, retrying as RGB when the encoder rejects alpha.
///
/// Only an unsupported colour type earns the retry; I/O failures are
/// returned as they are.
pub fn save_image(img: &DynamicImage, path: &Path, format: ImageFormat) -> Result<(), SaveError> {
    match img.save_with_format(path, format) {
        Ok(()) => Ok(()),
        Err(ImageError::Unsupported(first)) => {
            tracing::warn!("cannot save {format:?} with alpha ({first}); retrying as RGB");
            DynamicImage::ImageRgb8(img.to_rgb8())
                .save_with_format(path, format)
                .map_err(|source| SaveError::Encode { format, source })?;
            tracing::info!("saved {} in RGB color space", path.display());
            Ok(())
        }
        Err(ImageError::IoError(e)) => Err(SaveError::Io(e)),
        Err(source) => Err(SaveError::Encode { format, source }),
    }
}

/// Write one JSON object per line, replacing any existing file.
pub fn write_manifest(entries: &[ManifestEntry], path: &Path) -> Result<(), SaveError> {
    let mut out = BufWriter::new(File::create(path)?);
    for entry in entries {
        serde_json::to_writer(&mut out, entry)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::TempDir;

    fn sample_atlas() -> Atlas {
        Atlas {
            image: RgbaImage::from_pixel(20, 20, image::Rgba([10, 20, 30, 128])),
            manifest: vec![
                ManifestEntry {
                    image_name: "a.png".into(),
                    source_path: "in/a.png".into(),
                    offset_x: 0,
                    offset_y: 0,
                    error: None,
                },
                ManifestEntry {
                    image_name: "b.png".into(),
                    source_path: "in/b.png".into(),
                    offset_x: 10,
                    offset_y: 0,
                    error: Some("timed out".into()),
                },
            ],
            grid_side: 2,
            cell_size: (10, 10),
        }
    }

    #[test]
    fn creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested/out");
        ensure_writable_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert!(!dir.join(PROBE_FILE).exists());
    }

    #[test]
    fn writes_png_and_ndjson_manifest() {
        let tmp = TempDir::new().unwrap();
        let saved =
            save_atlas_and_manifest(&sample_atlas(), tmp.path(), "spriteatlas", ImageFormat::Png)
                .unwrap();

        assert_eq!(saved.atlas, tmp.path().join("spriteatlas.png"));
        let reloaded = image::open(&saved.atlas).unwrap().to_rgba8();
        assert_eq!(reloaded.get_pixel(3, 3).0, [10, 20, 30, 128]);

        let text = std::fs::read_to_string(&saved.manifest).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: ManifestEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.offset_x, 10);
        assert_eq!(second.error.as_deref(), Some("timed out"));
        assert!(!lines[0].contains("error"));
    }

    #[test]
    fn jpeg_falls_back_to_rgb() {
        let tmp = TempDir::new().unwrap();
        let saved =
            save_atlas_and_manifest(&sample_atlas(), tmp.path(), "atlas", ImageFormat::Jpeg)
                .unwrap();

        assert_eq!(saved.atlas, tmp.path().join("atlas.jpg"));
        let reloaded = image::open(&saved.atlas).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (20, 20));
    }

    #[test]
    fn io_failure_is_not_retried_as_rgb() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing-dir/atlas.jpg");
        let img = DynamicImage::ImageRgba8(sample_atlas().image);

        let err = save_image(&img, &path, ImageFormat::Jpeg).unwrap_err();
        assert!(matches!(err, SaveError::Io(_)), "unexpected error: {err}");
        assert!(!path.exists());
    }

    #[test]
    fn manifest_overwrites_previous_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("m.json");
        std::fs::write(&path, "stale\nstale\nstale\n").unwrap();

        write_manifest(&sample_atlas().manifest[..1], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
