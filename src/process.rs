//! Fetching and converting every source image in parallel.
//!
//! Each location becomes one task: fetch, decode, convert. A task never
//! raises; whatever goes wrong is recorded as [`FetchResult::Failure`] with a
//! readable reason, so one broken URL cannot sink the batch.
//!
//! ## Parallel Processing
//!
//! Tasks run on a dedicated [rayon](https://docs.rs/rayon) pool sized by
//! [`RunOptions::concurrency`]. Fetches block their worker thread; there is no
//! async runtime. `par_iter().collect()` keeps results in input order no
//! matter which worker finishes first.
//!
//! The default image is the exception to failure tolerance: it is fetched
//! eagerly with [`load_default_image`] and any failure aborts the run, since
//! nothing could stand in for it.

use crate::fetch::ImageSource;
use crate::imaging::{ConversionSettings, convert};
use image::DynamicImage;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("unable to retrieve and convert default image {location}: {reason}")]
    DefaultImage { location: String, reason: String },
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Outcome of one fetch-and-convert task.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Converted image, already at the target size.
    Success(DynamicImage),
    /// Human-readable reason the image could not be used.
    Failure(String),
}

impl FetchResult {
    pub fn image(&self) -> Option<&DynamicImage> {
        match self {
            FetchResult::Success(img) => Some(img),
            FetchResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchResult::Success(_) => None,
            FetchResult::Failure(reason) => Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }
}

/// Fetch `location` and convert it. Never fails; errors become `Failure`.
pub fn fetch_and_convert(
    source: &impl ImageSource,
    location: &str,
    settings: &ConversionSettings,
    allow_truncated: bool,
) -> FetchResult {
    match source.fetch(location, allow_truncated) {
        Ok(image) => {
            let converted = convert(image, settings);
            tracing::debug!("converted {location}");
            FetchResult::Success(converted)
        }
        Err(e) => {
            tracing::warn!("retrieval of {location} failed: {e}");
            FetchResult::Failure(e.to_string())
        }
    }
}

/// Fetch and convert the image that replaces failures. Fails fast.
pub fn load_default_image(
    source: &impl ImageSource,
    location: &str,
    settings: &ConversionSettings,
    allow_truncated: bool,
) -> Result<DynamicImage, ProcessError> {
    match fetch_and_convert(source, location, settings, allow_truncated) {
        FetchResult::Success(image) => Ok(image),
        FetchResult::Failure(reason) => Err(ProcessError::DefaultImage {
            location: location.to_string(),
            reason,
        }),
    }
}

/// Knobs for [`run_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Worker threads; `0` means one per available CPU core.
    pub concurrency: usize,
    /// Keep partially decoded images instead of failing them.
    pub allow_truncated: bool,
}

/// Resolve the worker count: `0` → available cores, otherwise as given.
///
/// Unlike CPU-bound work, fetches mostly wait on the network, so requests
/// above the core count are honoured.
pub fn effective_workers(concurrency: usize) -> usize {
    if concurrency > 0 {
        return concurrency;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Fetch and convert every location in parallel.
///
/// Returns exactly one result per location, in the same order as `locations`.
pub fn run_all(
    source: &impl ImageSource,
    locations: &[String],
    settings: &ConversionSettings,
    options: RunOptions,
) -> Result<Vec<FetchResult>, ProcessError> {
    let workers = effective_workers(options.concurrency);
    tracing::info!(
        "fetching {} images with {} workers",
        locations.len(),
        workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("atlas-fetch-{i}"))
        .build()?;

    let results: Vec<FetchResult> = pool.install(|| {
        locations
            .par_iter()
            .map(|location| fetch_and_convert(source, location, settings, options.allow_truncated))
            .collect()
    });

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        tracing::warn!("{failed} of {} images failed", results.len());
    }
    Ok(results)
}
