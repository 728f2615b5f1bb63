use atlasmaker::config::{self, AtlasConfig};
use atlasmaker::sources::DuplicatePolicy;
use atlasmaker::{output, pipeline};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "atlasmaker")]
#[command(about = "Build a sprite atlas from local or remote images")]
#[command(long_about = "\
Build a sprite atlas from local or remote images

Every location in the source list (one per line, a path or an http(s) URL)
is fetched, converted to the cell size, and placed on a square grid in list
order. Images that cannot be fetched or decoded are replaced by the default
image and reported in the manifest.

Output:

  <output-dir>/
  ├── spriteatlas.png     # The atlas (format follows --image-format)
  └── spriteatlas.json    # One line per image: name, source, offset, error

Settings come from stock defaults, then --config FILE, then flags.
Run 'atlasmaker gen-config' to generate a documented atlasmaker.toml.")]
#[command(version = version_string())]
struct Cli {
    /// More log output (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every listed image and write the atlas and manifest
    Build {
        /// Output directory (created if missing)
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Validate settings and the source list without fetching anything
    Check {
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Print a stock atlasmaker.toml with all options documented
    GenConfig,
}

/// Flags shared by `build` and `check`. Each one overrides the config file.
#[derive(clap::Args, Clone)]
struct SettingsArgs {
    /// File listing one image location per line
    #[arg(long)]
    sourcelist: PathBuf,

    /// atlasmaker.toml to load on top of the stock defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cell width in pixels
    #[arg(long)]
    image_width: Option<u32>,

    /// Cell height in pixels
    #[arg(long)]
    image_height: Option<u32>,

    /// Output format (png, jpg, webp, ...)
    #[arg(long)]
    image_format: Option<String>,

    /// Background colour as R,G,B
    #[arg(long, value_parser = parse_rgb, conflicts_with = "bg_color_name")]
    bg_color_rgb: Option<[i64; 3]>,

    /// Background colour as a name or #hex
    #[arg(long)]
    bg_color_name: Option<String>,

    /// Background alpha (0 transparent, 255 opaque)
    #[arg(long)]
    image_opacity: Option<i64>,

    /// Keep the aspect ratio by padding (true) or crop to fill (false)
    #[arg(long)]
    keep_aspect_ratio: Option<bool>,

    /// Enlarge images smaller than the cell
    #[arg(long)]
    resize_if_larger: bool,

    /// Anchor of content in leftover space as X,Y (each 0..1)
    #[arg(long, value_parser = parse_position)]
    position: Option<[f64; 2]>,

    /// Parallel fetch workers (0 = one per CPU core)
    #[arg(long)]
    num_parallel_jobs: Option<usize>,

    /// Seconds per HTTP request attempt
    #[arg(long)]
    request_timeout: Option<f64>,

    /// Total attempts for downloads that time out
    #[arg(long)]
    http_max_retries: Option<u32>,

    /// Seconds between HTTP attempts
    #[arg(long)]
    http_retry_interval: Option<f64>,

    /// Image drawn in place of failed images
    #[arg(long)]
    default_image_path: Option<String>,

    /// Duplicate locations: ignore, fail or unique
    #[arg(long)]
    handle_dups: Option<DuplicatePolicy>,

    /// Keep partially decoded images
    #[arg(long)]
    allow_truncated_images: bool,

    /// Atlas width in cells (not supported yet)
    #[arg(long)]
    atlas_width: Option<u32>,

    /// Atlas height in cells (not supported yet)
    #[arg(long)]
    atlas_height: Option<u32>,

    /// Base name of the atlas and manifest files
    #[arg(long)]
    atlas_name: Option<String>,
}

impl SettingsArgs {
    /// Stock defaults, then the config file, then these flags.
    fn resolve(&self) -> Result<AtlasConfig, config::ConfigError> {
        let mut cfg = config::load_config(self.config.as_deref())?;

        let image = &mut cfg.image;
        set(&mut image.width, self.image_width);
        set(&mut image.height, self.image_height);
        set(&mut image.format, self.image_format.clone());
        set(&mut image.opacity, self.image_opacity);
        set(&mut image.keep_aspect_ratio, self.keep_aspect_ratio);
        set(&mut image.position, self.position);
        image.resize_if_larger |= self.resize_if_larger;
        image.allow_truncated |= self.allow_truncated_images;
        if let Some(rgb) = self.bg_color_rgb {
            image.bg_color_rgb = rgb;
            image.bg_color_name = None;
        }
        if self.bg_color_name.is_some() {
            image.bg_color_name = self.bg_color_name.clone();
        }

        let network = &mut cfg.network;
        set(&mut network.request_timeout, self.request_timeout);
        set(&mut network.http_max_retries, self.http_max_retries);
        set(&mut network.http_retry_interval, self.http_retry_interval);

        set(&mut cfg.processing.max_processes, self.num_parallel_jobs);

        let atlas = &mut cfg.atlas;
        set(&mut atlas.handle_dups, self.handle_dups);
        set(&mut atlas.name, self.atlas_name.clone());
        if self.default_image_path.is_some() {
            atlas.default_image = self.default_image_path.clone();
        }
        if self.atlas_width.is_some() {
            atlas.width = self.atlas_width;
        }
        if self.atlas_height.is_some() {
            atlas.height = self.atlas_height;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

fn parse_rgb(s: &str) -> Result<[i64; 3], String> {
    let parts: Vec<i64> = s
        .split(',')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid R,G,B value '{s}': {e}"))?;
    <[i64; 3]>::try_from(parts).map_err(|_| format!("expected three values R,G,B, got '{s}'"))
}

fn parse_position(s: &str) -> Result<[f64; 2], String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid X,Y value '{s}': {e}"))?;
    <[f64; 2]>::try_from(parts).map_err(|_| format!("expected two values X,Y, got '{s}'"))
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Build {
            output_dir,
            settings,
        } => {
            let cfg = settings.resolve()?;
            println!(
                "==> Building atlas from {} → {}",
                settings.sourcelist.display(),
                output_dir.display()
            );
            let report = pipeline::build(&settings.sourcelist, &output_dir, &cfg)?;
            output::print_build_output(&report);
            println!("==> Build complete: {}", report.saved.atlas.display());
        }
        Command::Check { settings } => {
            let cfg = settings.resolve()?;
            println!("==> Checking {}", settings.sourcelist.display());
            let report = pipeline::check(&settings.sourcelist, &cfg)?;
            output::print_check_output(&report);
            println!("==> Settings and source list are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
