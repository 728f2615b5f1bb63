//! End-to-end atlas build: source list in, atlas image and manifest out.
//!
//! ```text
//! 1. Validate   config        →  ConversionSettings, FetchConfig, AtlasSettings
//! 2. Prepare    output_dir    →  created and proven writable
//! 3. Read       source list   →  ordered locations (duplicate policy applied)
//! 4. Default    image         →  fetched and converted, or a blank cell
//! 5. Fetch      locations     →  one FetchResult per location (parallel)
//! 6. Assemble   results       →  Atlas + manifest
//! 7. Save       atlas         →  <name>.<ext> and <name>.json
//! ```
//!
//! Everything up to step 5 fails fast. From step 5 on, a broken location only
//! costs its own cell.

use crate::atlas::{self, AtlasError, ManifestEntry};
use crate::config::{AtlasConfig, ConfigError};
use crate::fetch::{FetchError, ImageFetcher, ImageSource, is_remote};
use crate::imaging::{ConversionSettings, create_default_image};
use crate::process::{self, ProcessError};
use crate::save::{self, SaveError, SavedFiles};
use crate::sources::{self, SourceListError};
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Sources(#[from] SourceListError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Atlas(#[from] AtlasError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// What a finished build produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub saved: SavedFiles,
    /// Manifest entries in atlas order, failures included.
    pub entries: Vec<ManifestEntry>,
    pub grid_side: u32,
    pub cell_size: (u32, u32),
}

impl BuildReport {
    pub fn failures(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| e.error.is_some())
    }
}

/// What `check` found without fetching anything.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub locations: Vec<String>,
    pub remote: usize,
    pub cell_size: (u32, u32),
    pub format: String,
}

/// Build an atlas, fetching over HTTP(S) or from disk.
pub fn build(
    sourcelist: &Path,
    output_dir: &Path,
    config: &AtlasConfig,
) -> Result<BuildReport, PipelineError> {
    let fetcher = ImageFetcher::new(&config.fetch_config()?)?;
    build_with_source(&fetcher, sourcelist, output_dir, config)
}

/// Build an atlas, fetching every location through `source`.
pub fn build_with_source(
    source: &impl ImageSource,
    sourcelist: &Path,
    output_dir: &Path,
    config: &AtlasConfig,
) -> Result<BuildReport, PipelineError> {
    let settings = config.conversion_settings()?;
    let atlas_settings = config.atlas_settings();
    atlas::check_settings(&atlas_settings)?;

    save::ensure_writable_dir(output_dir)?;
    let locations = sources::read_source_list(sourcelist, config.atlas.handle_dups)?;

    let options = config.run_options();
    let default_image = default_image(source, config, &settings)?;
    let results = process::run_all(source, &locations, &settings, options)?;

    let atlas = atlas::assemble(&results, &locations, &default_image, &atlas_settings)?;
    let saved = save::save_atlas_and_manifest(
        &atlas,
        output_dir,
        &config.atlas.name,
        settings.format(),
    )?;
    tracing::info!("wrote {} and {}", saved.atlas.display(), saved.manifest.display());

    Ok(BuildReport {
        saved,
        entries: atlas.manifest,
        grid_side: atlas.grid_side,
        cell_size: atlas.cell_size,
    })
}

/// Validate the configuration and source list without fetching or writing.
pub fn check(sourcelist: &Path, config: &AtlasConfig) -> Result<CheckReport, PipelineError> {
    let settings = config.conversion_settings()?;
    config.fetch_config()?;
    atlas::check_settings(&config.atlas_settings())?;
    let locations = sources::read_source_list(sourcelist, config.atlas.handle_dups)?;
    let remote = locations.iter().filter(|l| is_remote(l)).count();

    Ok(CheckReport {
        remote,
        locations,
        cell_size: settings.target_size(),
        format: settings.extension().to_string(),
    })
}

fn default_image(
    source: &impl ImageSource,
    config: &AtlasConfig,
    settings: &ConversionSettings,
) -> Result<DynamicImage, PipelineError> {
    match &config.atlas.default_image {
        Some(location) => {
            tracing::info!("loading default image {location}");
            Ok(process::load_default_image(
                source,
                location,
                settings,
                config.image.allow_truncated,
            )?)
        }
        None => Ok(create_default_image(settings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockSource, solid};
    use tempfile::TempDir;

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn small_config() -> AtlasConfig {
        let mut config = AtlasConfig::default();
        config.image.width = 10;
        config.image.height = 10;
        config
    }

    fn write_list(dir: &Path, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join("sources.csv");
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn builds_from_mock_source() {
        let tmp = TempDir::new().unwrap();
        let list = write_list(tmp.path(), &["a.png", "b.png", "c.png"]);
        let source = MockSource::new()
            .with_image("a.png", solid(20, 20, RED))
            .with_image("c.png", solid(20, 20, RED));
        let out = tmp.path().join("out");

        let report = build_with_source(&source, &list, &out, &small_config()).unwrap();

        assert_eq!(report.grid_side, 2);
        assert_eq!(report.cell_size, (10, 10));
        assert_eq!(report.entries.len(), 3);
        let failed: Vec<&str> = report.failures().map(|e| e.source_path.as_str()).collect();
        assert_eq!(failed, vec!["b.png"]);
        assert!(report.saved.atlas.exists());
        assert!(report.saved.manifest.exists());
    }

    #[test]
    fn missing_default_image_aborts_before_fetching() {
        let tmp = TempDir::new().unwrap();
        let list = write_list(tmp.path(), &["a.png"]);
        let source = MockSource::new().with_image("a.png", solid(10, 10, RED));
        let mut config = small_config();
        config.atlas.default_image = Some("nope.png".into());

        let err = build_with_source(&source, &list, tmp.path(), &config).unwrap_err();
        assert!(matches!(err, PipelineError::Process(ProcessError::DefaultImage { .. })));
        assert_eq!(source.calls(), vec!["nope.png"]);
    }

    #[test]
    fn invalid_settings_fail_before_touching_output() {
        let tmp = TempDir::new().unwrap();
        let list = write_list(tmp.path(), &["a.png"]);
        let out = tmp.path().join("never-created");
        let mut config = small_config();
        config.image.width = 2;

        let err = build_with_source(&MockSource::new(), &list, &out, &config).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(!out.exists());
    }

    #[test]
    fn explicit_atlas_size_is_unsupported() {
        let tmp = TempDir::new().unwrap();
        let list = write_list(tmp.path(), &["a.png"]);
        let mut config = small_config();
        config.atlas.width = Some(2);
        config.atlas.height = Some(2);

        let err = build_with_source(&MockSource::new(), &list, tmp.path(), &config).unwrap_err();
        assert!(matches!(err, PipelineError::Atlas(AtlasError::Unsupported(_))));
    }

    #[test]
    fn all_failures_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let list = write_list(tmp.path(), &["a.png", "b.png"]);

        let err =
            build_with_source(&MockSource::new(), &list, tmp.path(), &small_config()).unwrap_err();
        assert!(matches!(err, PipelineError::Atlas(AtlasError::NoSuccessfulImages)));
    }

    #[test]
    fn check_counts_remote_locations() {
        let tmp = TempDir::new().unwrap();
        let list = write_list(
            tmp.path(),
            &["http://example.com/a.png", "local/b.png", "https://example.com/c.jpg"],
        );

        let report = check(&list, &small_config()).unwrap();
        assert_eq!(report.locations.len(), 3);
        assert_eq!(report.remote, 2);
        assert_eq!(report.cell_size, (10, 10));
        assert_eq!(report.format, "png");
    }
}
