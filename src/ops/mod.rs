// ============================================================================
// OPS - image manipulation and drawing engines
// ============================================================================
//
//   filters.rs     - 3x3 convolution kernels
//   adjustments.rs - fade / intensify / invert tone passes
//   shapes.rs      - tool geometry: vertices and per-vertex colors
//   raster.rs      - CPU rasterizer for tool primitives
// ============================================================================

pub mod adjustments;
pub mod filters;
pub mod raster;
pub mod shapes;

pub use crate::components::colors::limit_0_255;
