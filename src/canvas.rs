// ============================================================================
// CANVAS - owns the pixel buffer, the style state and the pointer session
// ============================================================================
//
// The buffer only ever holds committed work. While a rubber-band tool is
// dragged, the transient shape lives in `preview` and is layered on top by
// `composite()`; it reaches the buffer on release.
// ============================================================================

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::components::colors::{derive_triple, Color, ColorTriple, Rgb8};
use crate::components::tools::{PointerAction, StyleParameters, Tool, ToolSession};
use crate::io::{self, ImageIoError, SaveFormat};
use crate::ops::adjustments;
use crate::ops::filters::{self, ConvolutionKind};
use crate::ops::raster::{self, Rasterizer, SoftwareRasterizer};
use crate::ops::shapes::{build_primitive, Primitive, ShapeStyle};
use crate::settings::CanvasSettings;

/// Committed pixels of the drawing surface.
pub type PixelBuffer = RgbaImage;

pub struct Canvas {
    buffer: PixelBuffer,
    style: StyleParameters,
    pen_color: Rgb8,
    fill_color: Rgb8,
    background_color: Rgb8,
    circle_points_per_pi: u32,
    session: ToolSession,
    preview: Option<Primitive>,
    rasterizer: Box<dyn Rasterizer>,
    /// Committed primitives since the last `take_committed()`, in order.
    committed: Vec<Primitive>,
    dirty: bool,
    /// Incremented on every mark; consumers compare to detect changes.
    dirty_generation: u64,
}

impl Canvas {
    /// Blank canvas of `width` x `height` with default style.
    pub fn new(width: u32, height: u32) -> Self {
        let settings = CanvasSettings { width, height, ..Default::default() };
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &CanvasSettings) -> Self {
        let mut style = StyleParameters::default();
        style.set_brush_size(settings.brush_size);
        style.set_gradient_degree(settings.gradient_degree);
        style.set_fade_degree(settings.fade_degree);

        let width = settings.width.max(1);
        let height = settings.height.max(1);
        Self {
            buffer: RgbaImage::from_pixel(width, height, settings.background_color.to_rgba(255)),
            style,
            pen_color: settings.pen_color,
            fill_color: settings.fill_color,
            background_color: settings.background_color,
            circle_points_per_pi: settings.circle_points_per_pi.max(1),
            session: ToolSession::default(),
            preview: None,
            rasterizer: Box::new(SoftwareRasterizer),
            committed: Vec::new(),
            dirty: true,
            dirty_generation: 0,
        }
    }

    /// Swap the backend that turns primitives into pixels.
    pub fn with_rasterizer(mut self, rasterizer: Box<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn active_tool(&self) -> Tool {
        self.session.active
    }

    pub fn is_drawing(&self) -> bool {
        self.session.is_drawing()
    }

    pub fn style(&self) -> StyleParameters {
        self.style
    }

    pub fn pen_color(&self) -> Rgb8 {
        self.pen_color
    }

    pub fn fill_color(&self) -> Rgb8 {
        self.fill_color
    }

    pub fn background_color(&self) -> Rgb8 {
        self.background_color
    }

    pub fn brush_size(&self) -> u32 {
        self.style.brush_size
    }

    pub fn gradient_degree(&self) -> i32 {
        self.style.gradient_degree
    }

    pub fn fade_degree(&self) -> i32 {
        self.style.fade_degree
    }

    pub fn circle_points_per_pi(&self) -> u32 {
        self.circle_points_per_pi
    }

    /// The live rubber-band primitive, if a drag is in progress.
    pub fn preview(&self) -> Option<&Primitive> {
        self.preview.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn dirty_generation(&self) -> u64 {
        self.dirty_generation
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.dirty_generation = self.dirty_generation.wrapping_add(1);
    }

    /// Called by the consumer once it has presented the current state.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Drain the primitives committed since the last call.
    pub fn take_committed(&mut self) -> Vec<Primitive> {
        std::mem::take(&mut self.committed)
    }

    // ------------------------------------------------------------------
    // Style
    // ------------------------------------------------------------------

    pub fn activate_tool(&mut self, tool: Tool) {
        self.session.active = tool;
    }

    pub fn set_pen_color(&mut self, color: Rgb8) {
        self.pen_color = color;
    }

    pub fn set_fill_color(&mut self, color: Rgb8) {
        self.fill_color = color;
    }

    pub fn set_background_color(&mut self, color: Rgb8) {
        self.background_color = color;
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.style.set_brush_size(size);
    }

    pub fn set_gradient_degree(&mut self, degree: i32) {
        self.style.set_gradient_degree(degree);
    }

    pub fn set_fade_degree(&mut self, degree: i32) {
        self.style.set_fade_degree(degree);
    }

    fn shape_style(&self) -> ShapeStyle {
        ShapeStyle::from_parameters(&self.style, self.circle_points_per_pi)
    }

    fn color_triples(&self, shape: &ShapeStyle) -> (ColorTriple, ColorTriple) {
        (
            derive_triple(Color::from(self.pen_color), shape.gradient),
            derive_triple(Color::from(self.fill_color), shape.gradient),
        )
    }

    fn current_primitive(&self) -> Primitive {
        let shape = self.shape_style();
        let (pen, fill) = self.color_triples(&shape);
        build_primitive(self.session.active, &self.session.anchors, &shape, &pen, &fill)
    }

    // ------------------------------------------------------------------
    // Pointer input (top-left origin, flipped to canvas space)
    // ------------------------------------------------------------------

    pub fn on_press(&mut self, x: f32, y: f32) {
        let height = self.height();
        self.session.press(x, y, height);
    }

    pub fn on_move(&mut self, x: f32, y: f32) {
        let height = self.height();
        match self.session.motion(x, y, height) {
            PointerAction::CommitSegment => {
                let primitive = self.current_primitive();
                self.commit(primitive);
                self.mark_dirty();
            }
            PointerAction::UpdatePreview => {
                self.preview = Some(self.current_primitive());
                self.mark_dirty();
            }
            _ => {}
        }
    }

    pub fn on_release(&mut self) {
        match self.session.release() {
            PointerAction::Commit => {
                self.preview = None;
                let primitive = self.current_primitive();
                crate::log_info!(
                    "Committed {} ({} vertices)",
                    primitive.tool.label(),
                    primitive.vertex_count()
                );
                self.commit(primitive);
                self.mark_dirty();
            }
            PointerAction::Finish => {
                self.preview = None;
                self.mark_dirty();
            }
            _ => {}
        }
    }

    fn commit(&mut self, primitive: Primitive) {
        if primitive.is_empty() {
            return;
        }
        self.rasterizer.draw(&mut self.buffer, &primitive);
        self.committed.push(primitive);
    }

    /// Committed buffer with the live preview drawn on top. The buffer
    /// itself is left untouched.
    pub fn composite(&mut self) -> PixelBuffer {
        let mut out = self.buffer.clone();
        if let Some(preview) = &self.preview {
            self.rasterizer.draw(&mut out, preview);
        }
        out
    }

    // ------------------------------------------------------------------
    // Whole-buffer operations
    // ------------------------------------------------------------------

    /// Fill with the background color.
    pub fn clear(&mut self) {
        raster::fill(&mut self.buffer, self.background_color.to_rgba(255));
        crate::log_info!("Cleared canvas to {}", self.background_color);
        self.mark_dirty();
    }

    pub fn convolute(&mut self, kind: ConvolutionKind) {
        self.buffer = filters::apply_kernel(&self.buffer, kind);
        crate::log_info!("Applied {} kernel", kind.label());
        self.mark_dirty();
    }

    pub fn fade(&mut self) {
        self.buffer = adjustments::fade(&self.buffer, self.style.fade_degree);
        crate::log_info!("Faded (degree {})", self.style.fade_degree);
        self.mark_dirty();
    }

    pub fn intensify(&mut self) {
        self.buffer = adjustments::intensify(&self.buffer, self.style.fade_degree);
        crate::log_info!("Intensified (degree {})", self.style.fade_degree);
        self.mark_dirty();
    }

    pub fn invert(&mut self) {
        self.buffer = adjustments::invert(&self.buffer);
        crate::log_info!("Inverted colors");
        self.mark_dirty();
    }

    /// Resample to `width` x `height` with a triangle filter.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == self.buffer.dimensions() {
            return;
        }
        crate::log_info!(
            "Resizing {}x{} -> {}x{}",
            self.width(),
            self.height(),
            width,
            height
        );
        self.buffer = imageops::resize(&self.buffer, width, height, FilterType::Triangle);
        self.preview = None;
        self.mark_dirty();
    }

    // ------------------------------------------------------------------
    // File IO
    // ------------------------------------------------------------------

    /// Replace the buffer with the image at `path`. On failure the buffer is
    /// unchanged.
    pub fn open(&mut self, path: &Path) -> Result<(), ImageIoError> {
        match io::load_image(path) {
            Ok(img) => {
                crate::log_info!("Opened {} ({}x{})", path.display(), img.width(), img.height());
                self.replace_buffer(img);
                Ok(())
            }
            Err(e) => {
                crate::log_err!("Failed to open {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    pub fn open_bytes(&mut self, data: &[u8]) -> Result<(), ImageIoError> {
        let img = io::decode_image(data)?;
        crate::log_info!("Decoded {} bytes ({}x{})", data.len(), img.width(), img.height());
        self.replace_buffer(img);
        Ok(())
    }

    fn replace_buffer(&mut self, img: PixelBuffer) {
        self.buffer = img;
        self.preview = None;
        self.mark_dirty();
    }

    pub fn save(&self, path: &Path, format: SaveFormat) -> Result<(), ImageIoError> {
        match io::encode_and_write(&self.buffer, path, format) {
            Ok(()) => {
                crate::log_info!("Saved {} as {}", path.display(), format.extension());
                Ok(())
            }
            Err(e) => {
                crate::log_err!("Failed to save {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    pub fn encode(&self, format: SaveFormat) -> Result<Vec<u8>, ImageIoError> {
        io::encode_image(&self.buffer, format)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::from_settings(&CanvasSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BG: [u8; 4] = [214, 236, 233, 255];

    fn all_background(img: &PixelBuffer) -> bool {
        img.pixels().all(|p| p.0 == BG)
    }

    /// Counts draws so tests can see when the canvas rasterizes.
    struct CountingRasterizer(std::rc::Rc<std::cell::Cell<usize>>);

    impl Rasterizer for CountingRasterizer {
        fn draw(&mut self, target: &mut RgbaImage, primitive: &Primitive) {
            self.0.set(self.0.get() + 1);
            SoftwareRasterizer.draw(target, primitive);
        }
    }

    #[test]
    fn new_canvas_is_background() {
        let canvas = Canvas::new(40, 30);
        assert_eq!((canvas.width(), canvas.height()), (40, 30));
        assert!(all_background(canvas.buffer()));
        assert_eq!(canvas.active_tool(), Tool::None);
    }

    #[test]
    fn rubber_band_preview_stays_out_of_the_buffer() {
        let mut canvas = Canvas::new(50, 50);
        canvas.activate_tool(Tool::RectangleFilled);
        canvas.on_press(10.0, 10.0);
        canvas.on_move(30.0, 30.0);
        canvas.on_move(40.0, 40.0);

        assert!(canvas.is_drawing());
        assert!(canvas.preview().is_some());
        assert!(all_background(canvas.buffer()));
        assert!(!all_background(&canvas.composite()));
        assert!(all_background(canvas.buffer()));

        canvas.on_release();
        assert!(!canvas.is_drawing());
        assert!(canvas.preview().is_none());
        assert!(!all_background(canvas.buffer()));
        // Interior of the filled rectangle.
        assert_ne!(canvas.buffer().get_pixel(25, 25).0, BG);

        let committed = canvas.take_committed();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].tool, Tool::RectangleFilled);
        assert!(canvas.take_committed().is_empty());
    }

    #[test]
    fn pen_commits_every_segment() {
        let draws = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut canvas = Canvas::new(40, 40).with_rasterizer(Box::new(CountingRasterizer(draws.clone())));
        canvas.activate_tool(Tool::Pen);
        canvas.on_press(5.0, 5.0);
        canvas.on_move(10.0, 5.0);
        canvas.on_move(15.0, 8.0);
        assert_eq!(draws.get(), 2);
        assert!(canvas.preview().is_none());
        assert!(!all_background(canvas.buffer()));

        canvas.on_release();
        assert_eq!(draws.get(), 2);
        let committed = canvas.take_committed();
        assert_eq!(committed.len(), 2);
        // The second segment starts where the first ended (flipped y).
        let second = &committed[1].commands.last().expect("line").vertices;
        assert_eq!((second[0].position.x, second[0].position.y), (10.0, 35.0));
    }

    #[test]
    fn moves_without_press_do_nothing() {
        let mut canvas = Canvas::new(20, 20);
        canvas.activate_tool(Tool::Line);
        canvas.mark_clean();
        canvas.on_move(5.0, 5.0);
        canvas.on_release();
        assert!(!canvas.is_dirty());
        assert!(all_background(canvas.buffer()));
    }

    #[test]
    fn no_tool_drag_leaves_buffer_alone() {
        let mut canvas = Canvas::new(20, 20);
        canvas.on_press(1.0, 1.0);
        canvas.on_move(15.0, 15.0);
        canvas.on_release();
        assert!(all_background(canvas.buffer()));
        assert!(canvas.take_committed().is_empty());
    }

    #[test]
    fn clear_fills_with_current_background() {
        let mut canvas = Canvas::new(8, 8);
        canvas.set_background_color(Rgb8::new(1, 2, 3));
        assert!(all_background(canvas.buffer()));
        canvas.clear();
        assert!(canvas.buffer().pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn dirty_flag_and_generation() {
        let mut canvas = Canvas::new(8, 8);
        assert!(canvas.is_dirty());
        canvas.mark_clean();
        assert!(!canvas.is_dirty());
        let g = canvas.dirty_generation();
        canvas.invert();
        assert!(canvas.is_dirty());
        assert_eq!(canvas.dirty_generation(), g + 1);
        canvas.set_brush_size(3);
        assert_eq!(canvas.dirty_generation(), g + 1);
    }

    #[test]
    fn setters_clamp() {
        let mut canvas = Canvas::new(4, 4);
        canvas.set_brush_size(0);
        assert_eq!(canvas.brush_size(), 1);
        canvas.set_brush_size(99);
        assert_eq!(canvas.brush_size(), 11);
        canvas.set_gradient_degree(-1000);
        assert_eq!(canvas.gradient_degree(), -255);
        canvas.set_fade_degree(300);
        assert_eq!(canvas.fade_degree(), 255);
    }

    #[test]
    fn fade_kind_convolution_is_identity() {
        let mut canvas = Canvas::new(9, 9);
        canvas.convolute(ConvolutionKind::Fade);
        canvas.convolute(ConvolutionKind::Sharpen);
        assert!(all_background(canvas.buffer()));
        canvas.fade();
        assert_eq!(canvas.buffer().get_pixel(0, 0).0, [235, 246, 244, 255]);
    }

    #[test]
    fn failed_open_keeps_buffer() {
        let mut canvas = Canvas::new(6, 6);
        canvas.invert();
        let before = canvas.buffer().clone();
        let missing = std::env::temp_dir().join("splatterboard-no-such-image.png");
        assert!(canvas.open(&missing).is_err());
        assert!(canvas.open_bytes(b"nope").is_err());
        assert_eq!(canvas.buffer(), &before);
    }

    #[test]
    fn open_bytes_replaces_buffer() {
        let img = RgbaImage::from_pixel(3, 7, Rgba([5, 6, 7, 255]));
        let bytes = io::encode_image(&img, SaveFormat::Png).expect("encode");
        let mut canvas = Canvas::new(10, 10);
        canvas.open_bytes(&bytes).expect("open");
        assert_eq!(canvas.buffer(), &img);
        assert_eq!(canvas.encode(SaveFormat::Png).expect("encode"), bytes);
    }

    #[test]
    fn resize_resamples() {
        let mut canvas = Canvas::new(10, 10);
        canvas.resize(20, 5);
        assert_eq!((canvas.width(), canvas.height()), (20, 5));
        assert!(all_background(canvas.buffer()));
        canvas.resize(0, 0);
        assert_eq!((canvas.width(), canvas.height()), (1, 1));
    }

    #[test]
    fn resize_blends_across_a_color_edge() {
        let src = RgbaImage::from_fn(4, 1, |x, _| {
            if x < 2 { Rgba([0, 0, 0, 255]) } else { Rgba([200, 200, 200, 255]) }
        });
        let mut canvas = Canvas::new(1, 1);
        canvas
            .open_bytes(&io::encode_image(&src, SaveFormat::Png).expect("encode"))
            .expect("open");
        canvas.resize(8, 1);

        let img = canvas.buffer();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(7, 0).0, [200, 200, 200, 255]);
        for x in [3, 4] {
            let p = img.get_pixel(x, 0).0;
            assert!(p[0] > 0 && p[0] < 200, "x={} got {:?}", x, p);
            assert_eq!(p[3], 255);
        }
        assert!(img.get_pixel(3, 0).0[0] < img.get_pixel(4, 0).0[0]);
    }
}
