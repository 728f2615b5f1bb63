//! # atlasmaker
//!
//! Builds a sprite atlas from a list of image locations. Every image is fetched
//! (HTTP(S) or local disk), normalized to one cell size, and placed on a square
//! grid. A manifest records where each image landed and, for images that could
//! not be used, why the default image sits in their cell instead.
//!
//! # Pipeline
//!
//! ```text
//! sources.csv ──► fetch ──► decode ──► convert ──┐   (parallel, per image)
//!                                                 ▼
//!                       spriteatlas.png ◄── assemble ──► spriteatlas.json
//! ```
//!
//! Per-image failures never abort a run: they become
//! [`process::FetchResult::Failure`] and the default image takes their cell.
//! Configuration mistakes, an unreachable default image, or an unwritable
//! output directory abort before any download starts.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Conversion settings, geometry, decoding, and the resize/pad/crop converter |
//! | [`retry`] | Pure retry state machine and the driver that runs it |
//! | [`fetch`] | `ImageSource` trait and the HTTP/filesystem fetcher |
//! | [`process`] | Fetch-and-convert tasks and the ordered parallel runner |
//! | [`atlas`] | Grid layout, atlas assembly, manifest entries |
//! | [`sources`] | Source list reading and duplicate handling |
//! | [`save`] | Output directory checks, atlas and manifest files |
//! | [`config`] | `atlasmaker.toml` loading, merging, and validation |
//! | [`pipeline`] | End-to-end `build` and `check` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Blocking Fetches on a Thread Pool
//!
//! Downloads run on a dedicated rayon pool with a blocking `reqwest` client.
//! A batch is a few hundred requests at most; workers simply wait on the
//! socket, and `par_iter().collect()` hands results back in source order.
//!
//! ## Retry as Data
//!
//! The retry policy is a state machine ([`retry::RetryPolicy::transition`])
//! with no I/O of its own. Sleeping and fetching are passed in, so the whole
//! policy is tested without a network or a clock.
//!
//! ## One Cell Size
//!
//! Every image is converted to exactly the configured cell size before
//! assembly. The assembler only checks sizes; it never resizes.

pub mod atlas;
pub mod config;
pub mod fetch;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod retry;
pub mod save;
pub mod sources;

#[cfg(test)]
pub(crate) mod test_helpers;
