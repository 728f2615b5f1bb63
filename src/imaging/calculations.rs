//! Pure calculation functions for canvas geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Sizes are `(width, height)` tuples; offsets are signed because they are
//! handed straight to `image::imageops::replace`.

use super::params::Anchor;

/// Shrink `source` so it fits inside `target`, preserving aspect ratio.
///
/// Never enlarges: a source that already fits is returned unchanged. Each
/// output side is at least 1 pixel and never exceeds the matching target side.
///
/// # Examples
/// ```
/// # use atlasmaker::imaging::calculations::fit_within;
/// assert_eq!(fit_within((200, 100), (50, 50)), (50, 25));
/// assert_eq!(fit_within((30, 20), (50, 50)), (30, 20));
/// ```
pub fn fit_within(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let scale = (tgt_w as f64 / src_w as f64).min(tgt_h as f64 / src_h as f64);
    if scale >= 1.0 {
        return source;
    }

    scaled(source, scale, target)
}

/// Enlarge `source` by the smaller of the two axis ratios so one axis matches
/// `target` exactly and the other fits inside it.
pub fn scale_to_fit(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let scale = (tgt_w as f64 / src_w as f64).min(tgt_h as f64 / src_h as f64);
    scaled(source, scale, target)
}

fn scaled(source: (u32, u32), scale: f64, bound: (u32, u32)) -> (u32, u32) {
    let w = ((source.0 as f64 * scale).round() as u32).clamp(1, bound.0);
    let h = ((source.1 as f64 * scale).round() as u32).clamp(1, bound.1);
    (w, h)
}

/// Offset that places `inner` in the middle of `outer`.
pub fn centered_offset(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    anchored_offset(outer, inner, Anchor::CENTER)
}

/// Offset of `inner` inside `outer`: `round((outer - inner) * anchor)` per axis.
///
/// Works in both directions: with `inner` larger than `outer` the offset is
/// negative (used when positioning a crop window is expressed as a paste).
pub fn anchored_offset(outer: (u32, u32), inner: (u32, u32), anchor: Anchor) -> (i64, i64) {
    let dx = outer.0 as f64 - inner.0 as f64;
    let dy = outer.1 as f64 - inner.1 as f64;
    ((dx * anchor.x).round() as i64, (dy * anchor.y).round() as i64)
}

/// A rectangular region of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Largest window with the target's aspect ratio that fits in `source`,
/// positioned by `anchor` along the axis that has slack.
///
/// Resizing this window to `target` fills it exactly without distortion.
pub fn crop_window(source: (u32, u32), target: (u32, u32), anchor: Anchor) -> CropWindow {
    let (src_w, src_h) = source;
    let target_aspect = target.0 as f64 / target.1 as f64;
    let source_aspect = src_w as f64 / src_h as f64;

    let (width, height) = if source_aspect > target_aspect {
        // Source is wider: keep full height, trim width
        let w = (src_h as f64 * target_aspect).round() as u32;
        (w.clamp(1, src_w), src_h)
    } else {
        // Source is taller (or equal): keep full width, trim height
        let h = (src_w as f64 / target_aspect).round() as u32;
        (src_w, h.clamp(1, src_h))
    };

    let (x, y) = anchored_offset(source, (width, height), anchor);
    CropWindow {
        x: x as u32,
        y: y as u32,
        width,
        height,
    }
}

/// Cells per side of the smallest square grid holding `count` images.
///
/// Equivalent to `ceil(sqrt(count))`, computed in integers.
pub fn grid_side(count: usize) -> u32 {
    let mut side = (count as f64).sqrt() as u32;
    while (side as usize) * (side as usize) < count {
        side += 1;
    }
    while side > 0 && ((side - 1) as usize) * ((side - 1) as usize) >= count {
        side -= 1;
    }
    side
}
