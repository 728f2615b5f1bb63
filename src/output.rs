//! CLI output formatting for `build` and `check`.
//!
//! Output lists images by their position in the atlas, which is also their
//! position in the source list. Failures are shown inline under the image
//! they replaced, so a long run can be scanned for `Error:` lines.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Atlas
//!     out/spriteatlas.png (2x2 cells of 100x100)
//!     Manifest: out/spriteatlas.json
//!
//! Images
//! 001 dawn.jpg @ 0,0
//! 002 dusk.jpg @ 100,0
//!     Error: request timed out: operation timed out
//! 003 noon.png @ 0,100
//!
//! Placed 3 images, 1 replaced by the default image
//! ```
//!
//! ## Check
//!
//! ```text
//! Sources
//! 001 dawn.jpg
//!     Location: https://example.com/dawn.jpg
//! 002 noon.png
//!     Location: photos/noon.png
//!
//! 2 images (1 remote), 100x100 png cells
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::atlas::image_name;
use crate::pipeline::{BuildReport, CheckReport};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format the result of a finished build.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let (cell_w, cell_h) = report.cell_size;
    let mut lines = vec![
        "Atlas".to_string(),
        format!(
            "{}{} ({side}x{side} cells of {cell_w}x{cell_h})",
            indent(1),
            report.saved.atlas.display(),
            side = report.grid_side
        ),
        format!("{}Manifest: {}", indent(1), report.saved.manifest.display()),
        String::new(),
        "Images".to_string(),
    ];

    for (i, entry) in report.entries.iter().enumerate() {
        lines.push(format!(
            "{} {} @ {},{}",
            format_index(i + 1),
            entry.image_name,
            entry.offset_x,
            entry.offset_y
        ));
        if let Some(err) = &entry.error {
            lines.push(format!("{}Error: {}", indent(1), err));
        }
    }

    let failed = report.failures().count();
    lines.push(String::new());
    lines.push(if failed == 0 {
        format!("Placed {}", plural(report.entries.len(), "image"))
    } else {
        format!(
            "Placed {}, {} replaced by the default image",
            plural(report.entries.len(), "image"),
            failed
        )
    });
    lines
}

pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the result of `check`: each listed location and a summary.
pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec!["Sources".to_string()];
    for (i, location) in report.locations.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), image_name(location)));
        lines.push(format!("{}Location: {}", indent(1), location));
    }

    let (w, h) = report.cell_size;
    lines.push(String::new());
    lines.push(format!(
        "{} ({} remote), {w}x{h} {} cells",
        plural(report.locations.len(), "image"),
        report.remote,
        report.format
    ));
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::ManifestEntry;
    use crate::save::SavedFiles;
    use std::path::PathBuf;

    fn entry(name: &str, x: u32, y: u32, error: Option<&str>) -> ManifestEntry {
        ManifestEntry {
            image_name: name.to_string(),
            source_path: format!("in/{name}"),
            offset_x: x,
            offset_y: y,
            error: error.map(str::to_string),
        }
    }

    fn report(entries: Vec<ManifestEntry>) -> BuildReport {
        BuildReport {
            saved: SavedFiles {
                atlas: PathBuf::from("out/spriteatlas.png"),
                manifest: PathBuf::from("out/spriteatlas.json"),
            },
            entries,
            grid_side: 2,
            cell_size: (100, 100),
        }
    }

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn build_output_lists_images_in_atlas_order() {
        let lines = format_build_output(&report(vec![
            entry("dawn.jpg", 0, 0, None),
            entry("dusk.jpg", 100, 0, Some("request timed out")),
            entry("noon.png", 0, 100, None),
        ]));

        assert_eq!(lines[0], "Atlas");
        assert_eq!(lines[1], "    out/spriteatlas.png (2x2 cells of 100x100)");
        assert_eq!(lines[2], "    Manifest: out/spriteatlas.json");
        assert_eq!(
            &lines[4..9],
            &[
                "Images",
                "001 dawn.jpg @ 0,0",
                "002 dusk.jpg @ 100,0",
                "    Error: request timed out",
                "003 noon.png @ 0,100",
            ]
        );
        assert_eq!(
            lines.last().unwrap(),
            "Placed 3 images, 1 replaced by the default image"
        );
    }

    #[test]
    fn build_output_without_failures() {
        let lines = format_build_output(&report(vec![entry("a.png", 0, 0, None)]));
        assert_eq!(lines.last().unwrap(), "Placed 1 image");
        assert!(!lines.iter().any(|l| l.contains("Error:")));
    }

    #[test]
    fn check_output_shows_locations_and_summary() {
        let lines = format_check_output(&CheckReport {
            locations: vec![
                "https://example.com/dawn.jpg?size=large".into(),
                "photos/noon.png".into(),
            ],
            remote: 1,
            cell_size: (64, 32),
            format: "webp".into(),
        });

        assert_eq!(
            lines,
            vec![
                "Sources",
                "001 dawn.jpg",
                "    Location: https://example.com/dawn.jpg?size=large",
                "002 noon.png",
                "    Location: photos/noon.png",
                "",
                "2 images (1 remote), 64x32 webp cells",
            ]
        );
    }
}
