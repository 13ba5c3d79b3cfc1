// ============================================================================
// TONE ADJUSTMENTS - fade, intensify and invert
// ============================================================================
//
// Unlike the kernels in filters.rs these touch every pixel, border included.
// Alpha is preserved.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

use super::limit_0_255;

/// Apply an integer per-channel transform to R, G and B of every pixel.
/// `transform` receives a channel value and returns the unclamped result.
fn apply_channel_transform<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(i32) -> i32 + Sync,
{
    let w = src.width() as usize;
    let mut out = src.clone();
    if w == 0 || src.height() == 0 {
        return out;
    }

    out.par_chunks_mut(w * 4).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            px[0] = limit_0_255(transform(px[0] as i32));
            px[1] = limit_0_255(transform(px[1] as i32));
            px[2] = limit_0_255(transform(px[2] as i32));
        }
    });
    out
}

/// Fade toward white: `c / 2 + fade_degree`.
pub fn fade(src: &RgbaImage, fade_degree: i32) -> RgbaImage {
    apply_channel_transform(src, |c| c / 2 + fade_degree)
}

/// Intensify toward black: `(c - fade_degree) * 2`.
/// Approximately the opposite of [`fade`]; the halving there is lossy.
pub fn intensify(src: &RgbaImage, fade_degree: i32) -> RgbaImage {
    apply_channel_transform(src, |c| (c - fade_degree) * 2)
}

/// Invert all color channels.
pub fn invert(src: &RgbaImage) -> RgbaImage {
    apply_channel_transform(src, |c| 255 - c)
}
