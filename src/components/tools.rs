// ============================================================================
// TOOL STATE - active tool, anchor points, style values and pointer session
// ============================================================================

use serde::Serialize;
use std::str::FromStr;

/// Drawing tools. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    None,
    Pen,
    Line,
    Rectangle,
    RectangleFilled,
    Circle,
    CircleFilled,
    Triangle,
    TriangleFilled,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::None => "none",
            Tool::Pen => "pen",
            Tool::Line => "line",
            Tool::Rectangle => "rectangle",
            Tool::RectangleFilled => "rectangle-filled",
            Tool::Circle => "circle",
            Tool::CircleFilled => "circle-filled",
            Tool::Triangle => "triangle",
            Tool::TriangleFilled => "triangle-filled",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[
            Tool::None,
            Tool::Pen,
            Tool::Line,
            Tool::Rectangle,
            Tool::RectangleFilled,
            Tool::Circle,
            Tool::CircleFilled,
            Tool::Triangle,
            Tool::TriangleFilled,
        ]
    }

    /// Rubber-banding tools preview while dragging and commit on release.
    /// The pen commits every segment as it goes.
    pub fn is_rubber_band(&self) -> bool {
        !matches!(self, Tool::None | Tool::Pen)
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('_', "-");
        Tool::all()
            .iter()
            .copied()
            .find(|t| t.label() == key)
            .ok_or_else(|| format!("unknown tool '{}'", s))
    }
}

/// A point in canvas coordinates (origin bottom-left).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The anchor fixed on press and the live point that follows the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct AnchorPair {
    pub anchor: Point,
    pub live: Point,
}

impl AnchorPair {
    pub fn new(anchor: Point, live: Point) -> Self {
        Self { anchor, live }
    }

    pub fn dx(&self) -> f32 {
        self.live.x - self.anchor.x
    }

    pub fn dy(&self) -> f32 {
        self.live.y - self.anchor.y
    }
}

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 11;
pub const MIN_GRADIENT_DEGREE: i32 = -255;
pub const MAX_GRADIENT_DEGREE: i32 = 255;
pub const MAX_FADE_DEGREE: i32 = 255;

/// Style values that shape every primitive and tone pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleParameters {
    /// Point/line width; corner and end markers only appear above 1.
    pub brush_size: u32,
    /// Raw UI degree, scaled by 1/255 when a primitive is built.
    pub gradient_degree: i32,
    /// Midpoint used by fade/intensify.
    pub fade_degree: i32,
}

impl Default for StyleParameters {
    fn default() -> Self {
        Self {
            brush_size: 6,
            gradient_degree: 95,
            fade_degree: 128,
        }
    }
}

impl StyleParameters {
    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn set_gradient_degree(&mut self, degree: i32) {
        self.gradient_degree = degree.clamp(MIN_GRADIENT_DEGREE, MAX_GRADIENT_DEGREE);
    }

    pub fn set_fade_degree(&mut self, degree: i32) {
        self.fade_degree = degree.clamp(0, MAX_FADE_DEGREE);
    }
}

/// What a pointer event asks the canvas to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerAction {
    /// Nothing to draw.
    Ignore,
    /// Commit the segment between the anchors right away (pen).
    CommitSegment,
    /// Rebuild the transient preview.
    UpdatePreview,
    /// Drop the preview and commit the final primitive.
    Commit,
    /// Drawing ended without a primitive.
    Finish,
}

/// Pointer state machine: "not drawing" or "drawing with the active tool
/// from the anchor". Coordinates handed in are raw input coordinates with a
/// top-left origin; they are flipped to canvas space here.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToolSession {
    pub active: Tool,
    pub anchors: AnchorPair,
    pressed: bool,
}

impl ToolSession {
    pub fn is_drawing(&self) -> bool {
        self.pressed
    }

    fn to_canvas(x: f32, y: f32, viewport_height: u32) -> Point {
        Point::new(x, viewport_height as f32 - y)
    }

    pub fn press(&mut self, x: f32, y: f32, viewport_height: u32) -> PointerAction {
        let p = Self::to_canvas(x, y, viewport_height);
        self.pressed = true;
        self.anchors = AnchorPair::new(p, p);
        PointerAction::Ignore
    }

    pub fn motion(&mut self, x: f32, y: f32, viewport_height: u32) -> PointerAction {
        if !self.pressed {
            return PointerAction::Ignore;
        }
        let p = Self::to_canvas(x, y, viewport_height);
        match self.active {
            Tool::Pen => {
                self.anchors.anchor = self.anchors.live;
                self.anchors.live = p;
                PointerAction::CommitSegment
            }
            Tool::None => {
                self.anchors.live = p;
                PointerAction::Ignore
            }
            _ => {
                self.anchors.live = p;
                PointerAction::UpdatePreview
            }
        }
    }

    pub fn release(&mut self) -> PointerAction {
        if !self.pressed {
            return PointerAction::Ignore;
        }
        self.pressed = false;
        if self.active.is_rubber_band() {
            PointerAction::Commit
        } else {
            PointerAction::Finish
        }
    }
}
