// ============================================================================
// TOOL GEOMETRY - vertex and color lists for every drawing tool
// ============================================================================
//
// Angles are in radians. Quadrants around the anchor:
//
//            HALF_PI
//               |
//             2 | 1
//     PI   -----+-----  0, TWO_PI
//             3 | 4
//               |
//          3 * HALF_PI
//
// Nothing here touches pixels; the rasterizer turns a `Primitive` into them.
// ============================================================================

use serde::Serialize;

use crate::components::colors::{Color, ColorTriple};
use crate::components::tools::{AnchorPair, Point, StyleParameters, Tool};

pub const PI: f32 = std::f32::consts::PI;
pub const TWO_PI: f32 = PI * 2.0;
pub const HALF_PI: f32 = PI / 2.0;

/// Circle perimeter samples per half-turn.
pub const CIRCLE_POINTS_PER_PI: u32 = 24;
/// Stand-in for a zero horizontal leg when computing the circle orientation.
pub const CIRCLE_DX_EPSILON: f32 = 0.0001;
/// Point sizes relative to the brush, per tool.
pub const PEN_POINT_FACTOR: f32 = 0.5;
pub const LINE_POINT_FACTOR: f32 = 0.6;
pub const RECT_POINT_FACTOR: f32 = 1.0;
/// End and corner markers are only drawn for brushes larger than this.
pub const MIN_POINT_SIZE: u32 = 1;

/// `atan(0.5)`, the fixed half-angle setting the triangle's base/height ratio.
#[inline]
pub fn triangle_half_angle() -> f32 {
    0.5f32.atan()
}

/// How a command's vertices are assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Points,
    LineStrip,
    Polygon,
}

/// Shape of a point marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCap {
    #[default]
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Vertex {
    pub position: Point,
    pub color: Color,
}

impl Vertex {
    pub fn new(position: Point, color: Color) -> Self {
        Self { position, color }
    }
}

/// One draw call: vertices plus the raster state to draw them with.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawCommand {
    pub kind: PrimitiveKind,
    pub vertices: Vec<Vertex>,
    pub point_size: f32,
    pub line_width: f32,
    pub point_cap: PointCap,
}

/// Everything a tool emits for one anchor pair, in draw order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Primitive {
    pub tool: Tool,
    pub commands: Vec<DrawCommand>,
}

impl Primitive {
    pub fn is_empty(&self) -> bool {
        self.commands.iter().all(|c| c.vertices.is_empty())
    }

    pub fn vertex_count(&self) -> usize {
        self.commands.iter().map(|c| c.vertices.len()).sum()
    }
}

/// Style values resolved for geometry: the gradient degree is already
/// scaled into `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeStyle {
    pub brush_size: u32,
    pub gradient: f32,
    pub circle_points_per_pi: u32,
}

impl ShapeStyle {
    /// Scale the raw UI degree by 1/255. Done once per build.
    pub fn from_parameters(style: &StyleParameters, circle_points_per_pi: u32) -> Self {
        Self {
            brush_size: style.brush_size,
            gradient: style.gradient_degree as f32 / 255.0,
            circle_points_per_pi: circle_points_per_pi.max(1),
        }
    }

    fn line_width(&self) -> f32 {
        self.brush_size as f32
    }

    fn draws_markers(&self) -> bool {
        self.brush_size > MIN_POINT_SIZE
    }
}

/// Per-primitive command builder carrying the shared raster state.
struct Builder<'a> {
    style: &'a ShapeStyle,
    commands: Vec<DrawCommand>,
}

impl<'a> Builder<'a> {
    fn new(style: &'a ShapeStyle) -> Self {
        Self { style, commands: Vec::new() }
    }

    fn points(&mut self, factor: f32, cap: PointCap, vertices: Vec<Vertex>) {
        if !self.style.draws_markers() {
            return;
        }
        self.push(PrimitiveKind::Points, factor, cap, vertices);
    }

    fn line_strip(&mut self, vertices: Vec<Vertex>) {
        self.push(PrimitiveKind::LineStrip, 1.0, PointCap::Round, vertices);
    }

    fn polygon(&mut self, vertices: Vec<Vertex>) {
        self.push(PrimitiveKind::Polygon, 1.0, PointCap::Round, vertices);
    }

    fn push(&mut self, kind: PrimitiveKind, factor: f32, cap: PointCap, vertices: Vec<Vertex>) {
        self.commands.push(DrawCommand {
            kind,
            vertices,
            point_size: self.style.brush_size as f32 * factor,
            line_width: self.style.line_width(),
            point_cap: cap,
        });
    }

    fn finish(self, tool: Tool) -> Primitive {
        Primitive { tool, commands: self.commands }
    }
}

/// Build the primitive for `tool` spanned by `anchors`.
pub fn build_primitive(
    tool: Tool,
    anchors: &AnchorPair,
    style: &ShapeStyle,
    pen: &ColorTriple,
    fill: &ColorTriple,
) -> Primitive {
    let mut b = Builder::new(style);
    match tool {
        Tool::None => {}
        Tool::Pen => pen_segment(&mut b, anchors, pen),
        Tool::Line => gradient_line(&mut b, anchors, pen),
        Tool::Rectangle => {
            rectangle_points(&mut b, anchors, pen);
            b.line_strip(rectangle_outline(anchors, pen));
        }
        Tool::RectangleFilled => {
            b.polygon(rectangle_corners(anchors, fill).to_vec());
            rectangle_points(&mut b, anchors, pen);
            b.line_strip(rectangle_outline(anchors, pen));
        }
        Tool::Circle => {
            let ring = CircleRing::new(anchors);
            b.line_strip(ring.shaded(style, pen.base, -style.gradient));
        }
        Tool::CircleFilled => {
            let ring = CircleRing::new(anchors);
            b.polygon(ring.shaded(style, fill.base, style.gradient));
            b.line_strip(ring.shaded(style, pen.base, -style.gradient));
        }
        Tool::Triangle => {
            if let Some(tri) = triangle_vertices(anchors) {
                b.line_strip(triangle_outline(&tri, pen));
            }
        }
        Tool::TriangleFilled => {
            if let Some(tri) = triangle_vertices(anchors) {
                b.polygon(vec![
                    Vertex::new(tri.apex, fill.light),
                    Vertex::new(tri.base_a, fill.dark),
                    Vertex::new(tri.base_b, fill.dark),
                ]);
                b.line_strip(triangle_outline(&tri, pen));
            }
        }
    }
    b.finish(tool)
}

// ---------------------------------------------------------------------------
//  Pen and line
// ---------------------------------------------------------------------------

fn pen_segment(b: &mut Builder<'_>, anchors: &AnchorPair, pen: &ColorTriple) {
    let start = Vertex::new(anchors.anchor, pen.base);
    let end = Vertex::new(anchors.live, pen.base);
    b.points(PEN_POINT_FACTOR, PointCap::Round, vec![start, end]);
    b.line_strip(vec![start, end]);
}

fn gradient_line(b: &mut Builder<'_>, anchors: &AnchorPair, pen: &ColorTriple) {
    let start = Vertex::new(anchors.anchor, pen.light);
    let end = Vertex::new(anchors.live, pen.dark);
    b.points(LINE_POINT_FACTOR, PointCap::Round, vec![start]);
    b.line_strip(vec![start, end]);
    b.points(LINE_POINT_FACTOR, PointCap::Round, vec![end]);
}

// ---------------------------------------------------------------------------
//  Rectangle
// ---------------------------------------------------------------------------

/// Corners going around from the anchor, colored light, base, dark, base.
fn rectangle_corners(anchors: &AnchorPair, triple: &ColorTriple) -> [Vertex; 4] {
    let (a, l) = (anchors.anchor, anchors.live);
    [
        Vertex::new(Point::new(a.x, a.y), triple.light),
        Vertex::new(Point::new(l.x, a.y), triple.base),
        Vertex::new(Point::new(l.x, l.y), triple.dark),
        Vertex::new(Point::new(a.x, l.y), triple.base),
    ]
}

fn rectangle_points(b: &mut Builder<'_>, anchors: &AnchorPair, pen: &ColorTriple) {
    b.points(RECT_POINT_FACTOR, PointCap::Square, rectangle_corners(anchors, pen).to_vec());
}

fn rectangle_outline(anchors: &AnchorPair, pen: &ColorTriple) -> Vec<Vertex> {
    let corners = rectangle_corners(anchors, pen);
    let mut strip = corners.to_vec();
    strip.push(corners[0]);
    strip
}

// ---------------------------------------------------------------------------
//  Circle
// ---------------------------------------------------------------------------

/// Direction from `anchor` to `live`, placed in the correct quadrant.
///
/// `atan(|dy| / |dx|)` only covers the first quadrant; the sign of each leg
/// decides how it is reflected or rotated into the others.
pub fn orientation_angle(anchors: &AnchorPair) -> f32 {
    let (a, l) = (anchors.anchor, anchors.live);
    let mut x_len = (a.x - l.x).abs();
    let y_len = (a.y - l.y).abs();
    if x_len == 0.0 {
        x_len = CIRCLE_DX_EPSILON;
    }
    let angle = (y_len / x_len).atan();

    if l.y > a.y {
        if l.x < a.x {
            PI - angle // quadrant 2
        } else {
            angle // quadrant 1
        }
    } else if l.x > a.x {
        TWO_PI - angle // quadrant 4
    } else {
        angle + PI // quadrant 3
    }
}

struct CircleRing {
    centre: Point,
    radius: f32,
    orientation: f32,
}

impl CircleRing {
    fn new(anchors: &AnchorPair) -> Self {
        let radius = (anchors.dx() * anchors.dx() + anchors.dy() * anchors.dy()).sqrt();
        Self {
            centre: anchors.anchor,
            radius,
            orientation: orientation_angle(anchors),
        }
    }

    /// Closed ring of vertices; vertex `k` is shaded `base + sign_degree * cos(k * step)`.
    fn shaded(&self, style: &ShapeStyle, base: Color, sign_degree: f32) -> Vec<Vertex> {
        let per_pi = style.circle_points_per_pi;
        let step = PI / per_pi as f32;
        (0..=2 * per_pi)
            .map(|k| {
                let angle = k as f32 * step;
                let shade = sign_degree * angle.cos();
                let theta = angle + self.orientation;
                Vertex::new(
                    Point::new(
                        self.centre.x + self.radius * theta.cos(),
                        self.centre.y + self.radius * theta.sin(),
                    ),
                    base.offset(shade),
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
//  Triangle
// ---------------------------------------------------------------------------

/// Apex at the live point; the base is centred on the anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleVertices {
    pub apex: Point,
    pub base_a: Point,
    pub base_b: Point,
}

/// Construct the triangle, or `None` when anchor and live coincide.
pub fn triangle_vertices(anchors: &AnchorPair) -> Option<TriangleVertices> {
    let (a, l) = (anchors.anchor, anchors.live);
    let x_dist = (l.x - a.x).abs();
    let y_dist = (l.y - a.y).abs();
    let hyp_len = (x_dist * x_dist + y_dist * y_dist).sqrt();
    let long_hyp_len = hyp_len / triangle_half_angle().cos();
    if long_hyp_len == 0.0 {
        return None;
    }

    let angle = (x_dist / hyp_len).clamp(-1.0, 1.0).acos();
    let small_hyp_len = long_hyp_len / 2.0;
    let angle_m = HALF_PI - angle;
    let sx = small_hyp_len * angle_m.cos();
    let sy = small_hyp_len * angle_m.sin();

    // Pick the offsets so the base lies across the anchor→live direction.
    let (base_a, base_b) = if l.y <= a.y && l.x >= a.x {
        (Point::new(a.x - sx, a.y - sy), Point::new(a.x + sx, a.y + sy))
    } else if l.y <= a.y {
        (Point::new(a.x - sx, a.y + sy), Point::new(a.x + sx, a.y - sy))
    } else if l.x >= a.x {
        (Point::new(a.x - sx, a.y + sy), Point::new(a.x + sx, a.y - sy))
    } else {
        (Point::new(a.x - sx, a.y - sy), Point::new(a.x + sx, a.y + sy))
    };

    Some(TriangleVertices { apex: l, base_a, base_b })
}

fn triangle_outline(tri: &TriangleVertices, pen: &ColorTriple) -> Vec<Vertex> {
    vec![
        Vertex::new(tri.apex, pen.dark),
        Vertex::new(tri.base_a, pen.light),
        Vertex::new(tri.base_b, pen.light),
        Vertex::new(tri.apex, pen.dark),
    ]
}
