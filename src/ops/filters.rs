// ============================================================================
// CONVOLUTION FILTERS - fixed 3x3 kernels applied over the pixel buffer
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;
use std::str::FromStr;

/// A 3x3 weight matrix, row-major. `k[row][col]` weights the neighbour at
/// vertical offset `row - 1` and horizontal offset `col - 1`.
pub type Kernel3x3 = [[f32; 3]; 3];

pub const IDENTITY: Kernel3x3 = [
    [0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0],
];

pub const BLUR: Kernel3x3 = [
    [0.1111111, 0.1111111, 0.1111111],
    [0.1111111, 0.1111111, 0.1111111],
    [0.1111111, 0.1111111, 0.1111111],
];

pub const SHARPEN: Kernel3x3 = [
    [-0.117647, -0.117647, -0.117647],
    [-0.117647, 1.941176, -0.117647],
    [-0.117647, -0.117647, -0.117647],
];

/// Laplacian-of-Gaussian variant.
pub const LAP_OF_GAUSS: Kernel3x3 = [
    [-0.05, -0.07, -0.05],
    [-0.07, 1.58, -0.07],
    [-0.05, -0.07, -0.05],
];

pub const EDGE_DETECT_X: Kernel3x3 = [
    [0.0, 0.0, 0.0],
    [-0.25, 1.5, -0.25],
    [0.0, 0.0, 0.0],
];

pub const EDGE_DETECT_Y: Kernel3x3 = [
    [0.0, -0.25, 0.0],
    [0.0, 1.5, 0.0],
    [0.0, -0.25, 0.0],
];

pub const SOBEL: Kernel3x3 = [
    [0.5, 1.5, 0.5],
    [0.0, 1.0, 0.0],
    [-0.5, -1.5, -0.5],
];

pub const LAPLACIAN: Kernel3x3 = [
    [0.75, -2.25, 0.75],
    [-2.25, 4.0, -2.25],
    [0.75, -2.25, 0.75],
];

pub const LAPLACIAN2: Kernel3x3 = [
    [0.25, -0.75, 0.25],
    [-0.75, 1.0, -0.75],
    [0.25, -0.75, 0.25],
];

/// Sums closer than this to a whole level snap to it before truncation.
const SNAP_EPSILON: f32 = 1e-3;

/// Named convolution kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConvolutionKind {
    Fade,
    Intensify,
    Blur,
    Sharpen,
    LapOfGauss,
    EdgeDetectX,
    EdgeDetectY,
    Sobel,
    Laplacian,
    Laplacian2,
}

impl ConvolutionKind {
    /// Weights for this kernel. Fade and intensify pass through.
    pub fn kernel(&self) -> &'static Kernel3x3 {
        match self {
            ConvolutionKind::Fade | ConvolutionKind::Intensify => &IDENTITY,
            ConvolutionKind::Blur => &BLUR,
            ConvolutionKind::Sharpen => &SHARPEN,
            ConvolutionKind::LapOfGauss => &LAP_OF_GAUSS,
            ConvolutionKind::EdgeDetectX => &EDGE_DETECT_X,
            ConvolutionKind::EdgeDetectY => &EDGE_DETECT_Y,
            ConvolutionKind::Sobel => &SOBEL,
            ConvolutionKind::Laplacian => &LAPLACIAN,
            ConvolutionKind::Laplacian2 => &LAPLACIAN2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConvolutionKind::Fade => "fade",
            ConvolutionKind::Intensify => "intensify",
            ConvolutionKind::Blur => "blur",
            ConvolutionKind::Sharpen => "sharpen",
            ConvolutionKind::LapOfGauss => "lap-of-gauss",
            ConvolutionKind::EdgeDetectX => "edge-detect-x",
            ConvolutionKind::EdgeDetectY => "edge-detect-y",
            ConvolutionKind::Sobel => "sobel",
            ConvolutionKind::Laplacian => "laplacian",
            ConvolutionKind::Laplacian2 => "laplacian2",
        }
    }

    pub fn all() -> &'static [ConvolutionKind] {
        &[
            ConvolutionKind::Fade,
            ConvolutionKind::Intensify,
            ConvolutionKind::Blur,
            ConvolutionKind::Sharpen,
            ConvolutionKind::LapOfGauss,
            ConvolutionKind::EdgeDetectX,
            ConvolutionKind::EdgeDetectY,
            ConvolutionKind::Sobel,
            ConvolutionKind::Laplacian,
            ConvolutionKind::Laplacian2,
        ]
    }
}

impl FromStr for ConvolutionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('_', "-");
        let key = match key.as_str() {
            "lapofgauss" => "lap-of-gauss".to_string(),
            "edgedetectx" => "edge-detect-x".to_string(),
            "edgedetecty" => "edge-detect-y".to_string(),
            _ => key,
        };
        ConvolutionKind::all()
            .iter()
            .copied()
            .find(|k| k.label() == key)
            .ok_or_else(|| format!("unknown kernel '{}'", s))
    }
}

/// Truncate an accumulated channel toward zero and clamp to 0..=255.
///
/// A sum within [`SNAP_EPSILON`] of an integer snaps to it first, so f32
/// error in unit-sum kernels cannot knock a flat field down a level. This
/// rounds up near-integers a plain truncation would drop: 9.9995 becomes 10,
/// not 9.
#[inline]
fn truncate_channel(sum: f32) -> u8 {
    let nearest = sum.round();
    let v = if (sum - nearest).abs() < SNAP_EPSILON { nearest } else { sum.trunc() };
    super::limit_0_255(v as i32)
}

/// Convolve `src` with `kernel` into a new buffer of the same size.
///
/// Only pixels with `1 <= x <= w - 3` and `1 <= y <= h - 3` are written; the
/// border keeps its original values. Neighbourhoods are always read from
/// `src`, never from partially written output. Alpha is preserved.
pub fn convolve(src: &RgbaImage, kernel: &Kernel3x3) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let mut out = src.clone();
    if w < 3 || h < 3 {
        return out;
    }

    let stride = w * 4;
    let src_raw = src.as_raw();

    out.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        if y < 1 || y + 2 >= h {
            return;
        }
        for x in 1..w - 2 {
            let mut rgb = [0.0f32; 3];
            for (ky, krow) in kernel.iter().enumerate() {
                let row_start = (y + ky - 1) * stride;
                for (kx, &weight) in krow.iter().enumerate() {
                    let idx = row_start + (x + kx - 1) * 4;
                    rgb[0] += src_raw[idx] as f32 * weight;
                    rgb[1] += src_raw[idx + 1] as f32 * weight;
                    rgb[2] += src_raw[idx + 2] as f32 * weight;
                }
            }
            let pi = x * 4;
            row_out[pi] = truncate_channel(rgb[0]);
            row_out[pi + 1] = truncate_channel(rgb[1]);
            row_out[pi + 2] = truncate_channel(rgb[2]);
        }
    });

    out
}

/// Convolve with a named kernel.
pub fn apply_kernel(src: &RgbaImage, kind: ConvolutionKind) -> RgbaImage {
    convolve(src, kind.kernel())
}
