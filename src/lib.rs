//! SplatterBoard: the drawing core of a small raster paint program.
//!
//! [`canvas::Canvas`] owns the pixel buffer and routes pointer input through
//! the tool geometry in [`ops::shapes`]. Whole-buffer passes live in
//! [`ops::filters`] and [`ops::adjustments`].

#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod ops;
pub mod settings;

pub use canvas::{Canvas, PixelBuffer};
pub use components::colors::{Color, Rgb8};
pub use components::tools::Tool;
pub use io::{ImageIoError, SaveFormat};
pub use ops::filters::ConvolutionKind;
pub use ops::raster::{Rasterizer, SoftwareRasterizer};
pub use ops::shapes::Primitive;
pub use settings::CanvasSettings;
