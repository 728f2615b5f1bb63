//! Atlas configuration module.
//!
//! Handles loading, validating, and merging an `atlasmaker.toml` file.
//! Stock defaults are overridden by the user's file, and command-line flags
//! override both (see `main.rs`).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [image]
//! format = "png"              # Output encoding for cells and atlas
//! width = 100                 # Cell width in pixels (>= 10)
//! height = 100                # Cell height in pixels (>= 10)
//! keep_aspect_ratio = true    # Pad instead of distorting
//! resize_if_larger = false    # Enlarge images smaller than the cell
//! position = [0.5, 0.5]       # Anchor of content inside leftover space
//! bg_color_rgb = [0, 0, 0]    # Background / default image colour
//! # bg_color_name = "white"   # Alternative to bg_color_rgb
//! opacity = 0                 # Background alpha (0-255)
//! allow_truncated = false     # Keep partially decoded images
//!
//! [network]
//! request_timeout = 60.0      # Seconds per attempt
//! http_max_retries = 2        # Total attempts for timed-out downloads
//! http_retry_interval = 3.0   # Seconds between attempts
//!
//! [processing]
//! max_processes = 0           # Parallel fetch workers (0 = CPU cores)
//!
//! [atlas]
//! name = "spriteatlas"        # Base file name of atlas and manifest
//! handle_dups = "ignore"      # ignore | fail | unique
//! # default_image = "missing.png"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::atlas::AtlasSettings;
use crate::fetch::FetchConfig;
use crate::imaging::{Anchor, ConversionSettings, SettingsError};
use crate::process::RunOptions;
use crate::sources::DuplicatePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Full tool configuration loaded from `atlasmaker.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtlasConfig {
    /// Per-image conversion settings.
    pub image: ImageConfig,
    /// Download timeout and retry settings.
    pub network: NetworkConfig,
    /// Parallel fetch settings.
    pub processing: ProcessingConfig,
    /// Atlas output settings.
    pub atlas: AtlasOutputConfig,
}

/// Per-image conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub keep_aspect_ratio: bool,
    pub resize_if_larger: bool,
    /// Anchor `[x, y]`, each between 0 and 1.
    pub position: [f64; 2],
    /// Background `[r, g, b]`. Wide integers so bad values are reported, not wrapped.
    pub bg_color_rgb: [i64; 3],
    /// Named or hex colour; wins over `bg_color_rgb` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color_name: Option<String>,
    pub opacity: i64,
    pub allow_truncated: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            width: 100,
            height: 100,
            keep_aspect_ratio: true,
            resize_if_larger: false,
            position: [0.5, 0.5],
            bg_color_rgb: [0, 0, 0],
            bg_color_name: None,
            opacity: 0,
            allow_truncated: false,
        }
    }
}

/// Download timeout and retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Seconds before a single request attempt is abandoned.
    pub request_timeout: f64,
    /// Total attempts for a download that keeps timing out.
    pub http_max_retries: u32,
    /// Seconds to wait between attempts.
    pub http_retry_interval: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout: 60.0,
            http_max_retries: 2,
            http_retry_interval: 3.0,
        }
    }
}

/// Parallel fetch settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Worker threads for fetching and converting. `0` = one per CPU core.
    pub max_processes: usize,
}

/// Atlas output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtlasOutputConfig {
    /// Base name shared by the atlas image and manifest files.
    pub name: String,
    pub handle_dups: DuplicatePolicy,
    /// Image to draw in place of failures. Background colour when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_image: Option<String>,
    /// Atlas width in cells. Not supported yet; rejected when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Atlas height in cells. Not supported yet; rejected when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Default for AtlasOutputConfig {
    fn default() -> Self {
        Self {
            name: "spriteatlas".to_string(),
            handle_dups: DuplicatePolicy::Ignore,
            default_image: None,
            width: None,
            height: None,
        }
    }
}

impl AtlasConfig {
    /// Validate values that the typed settings constructors don't cover.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.http_max_retries < 1 {
            return Err(ConfigError::Validation(
                "network.http_max_retries must be 1 or greater".into(),
            ));
        }
        seconds("network.request_timeout", self.network.request_timeout)?;
        seconds("network.http_retry_interval", self.network.http_retry_interval)?;
        if self.atlas.name.trim().is_empty() {
            return Err(ConfigError::Validation("atlas.name must not be empty".into()));
        }
        Ok(())
    }

    /// Background `[r, g, b, alpha]` resolved from the colour name or RGB list.
    pub fn background(&self) -> Result<[i64; 4], ConfigError> {
        let [r, g, b] = match &self.image.bg_color_name {
            Some(name) => parse_color(name)?.map(i64::from),
            None => self.image.bg_color_rgb,
        };
        Ok([r, g, b, self.image.opacity])
    }

    /// Build validated conversion settings from the `[image]` section.
    pub fn conversion_settings(&self) -> Result<ConversionSettings, ConfigError> {
        let image = &self.image;
        Ok(
            ConversionSettings::builder(&image.format, image.width, image.height)
                .anchor(Anchor::new(image.position[0], image.position[1]))
                .background(self.background()?)
                .preserve_aspect_ratio(image.keep_aspect_ratio)
                .upscale_if_smaller(image.resize_if_larger)
                .build()?,
        )
    }

    pub fn fetch_config(&self) -> Result<FetchConfig, ConfigError> {
        Ok(FetchConfig {
            timeout: seconds("network.request_timeout", self.network.request_timeout)?,
            max_retries: self.network.http_max_retries,
            retry_interval: seconds(
                "network.http_retry_interval",
                self.network.http_retry_interval,
            )?,
        })
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            concurrency: self.processing.max_processes,
            allow_truncated: self.image.allow_truncated,
        }
    }

    /// Either atlas dimension being set counts as an explicit grid request.
    pub fn atlas_settings(&self) -> AtlasSettings {
        let grid = match (self.atlas.width, self.atlas.height) {
            (None, None) => None,
            (w, h) => Some((w.unwrap_or(0), h.unwrap_or(0))),
        };
        AtlasSettings { grid }
    }
}

fn seconds(key: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ConfigError::Validation(format!("{key} must be 0 or more seconds, got {value}"))
    })
}

// =============================================================================
// Colours
// =============================================================================

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("aqua", [0, 255, 255]),
    ("black", [0, 0, 0]),
    ("blue", [0, 0, 255]),
    ("brown", [165, 42, 42]),
    ("cyan", [0, 255, 255]),
    ("fuchsia", [255, 0, 255]),
    ("gold", [255, 215, 0]),
    ("gray", [128, 128, 128]),
    ("green", [0, 128, 0]),
    ("grey", [128, 128, 128]),
    ("lightgray", [211, 211, 211]),
    ("lightgrey", [211, 211, 211]),
    ("lime", [0, 255, 0]),
    ("magenta", [255, 0, 255]),
    ("maroon", [128, 0, 0]),
    ("navy", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("orange", [255, 165, 0]),
    ("pink", [255, 192, 203]),
    ("purple", [128, 0, 128]),
    ("red", [255, 0, 0]),
    ("silver", [192, 192, 192]),
    ("teal", [0, 128, 128]),
    ("white", [255, 255, 255]),
    ("yellow", [255, 255, 0]),
];

/// Parse a colour name (`"orange"`), `#rgb`, `#rrggbb` or `rgb(r, g, b)`.
pub fn parse_color(spec: &str) -> Result<[u8; 3], ConfigError> {
    let spec = spec.trim().to_ascii_lowercase();
    let invalid = || ConfigError::Validation(format!("unknown color specifier: '{spec}'"));

    if let Some(hex) = spec.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(invalid)?;
        return match digits.as_slice() {
            [r, g, b] => Ok([r * 17, g * 17, b * 17]),
            [r1, r2, g1, g2, b1, b2] => Ok([r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2]),
            _ => Err(invalid()),
        };
    }

    if let Some(inner) = spec.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        let channels: Vec<u8> = inner
            .split(',')
            .map(|c| c.trim().parse::<u8>().ok())
            .collect::<Option<_>>()
            .ok_or_else(invalid)?;
        return match channels.as_slice() {
            [r, g, b] => Ok([*r, *g, *b]),
            _ => Err(invalid()),
        };
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == spec)
        .map(|(_, rgb)| *rgb)
        .ok_or_else(invalid)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AtlasConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AtlasConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AtlasConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path` (if any) on top of stock defaults.
pub fn load_config(path: Option<&Path>) -> Result<AtlasConfig, ConfigError> {
    let overlay = match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `atlasmaker.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# atlasmaker configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Per-image conversion
# ---------------------------------------------------------------------------
[image]
# Output encoding: png, jpg, webp, gif, bmp, tiff, avif.
format = "png"

# Cell size in pixels. Each must be at least 10.
width = 100
height = 100

# Keep the source aspect ratio (pad) instead of cropping to fill.
keep_aspect_ratio = true

# Enlarge images smaller than the cell on both axes.
resize_if_larger = false

# Where content sits in leftover space: [0, 0] top-left, [1, 1] bottom-right.
position = [0.5, 0.5]

# Background and default image colour, plus its alpha (0-255).
bg_color_rgb = [0, 0, 0]
# bg_color_name = "white"
opacity = 0

# Keep partially decoded images instead of failing them.
allow_truncated = false

# ---------------------------------------------------------------------------
# Downloads
# ---------------------------------------------------------------------------
[network]
# Seconds per request attempt.
request_timeout = 60.0

# Total attempts for downloads that time out (other errors never retry).
http_max_retries = 2

# Seconds to wait between attempts.
http_retry_interval = 3.0

# ---------------------------------------------------------------------------
# Parallelism
# ---------------------------------------------------------------------------
[processing]
# Fetch workers. 0 = one per CPU core.
max_processes = 0

# ---------------------------------------------------------------------------
# Atlas output
# ---------------------------------------------------------------------------
[atlas]
# Base name of <name>.<format> and <name>.json.
name = "spriteatlas"

# Duplicate locations in the source list: ignore, fail or unique.
handle_dups = "ignore"

# Image drawn in place of failures (background colour when unset).
# default_image = "missing.png"
"##
}
