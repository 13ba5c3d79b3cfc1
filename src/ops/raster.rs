// ============================================================================
// SOFTWARE RASTERIZER - draws tool primitives into a pixel buffer
// ============================================================================
//
// Canvas coordinates have their origin at the bottom-left; image rows run
// top-down, so a canvas point (x, y) lands on column x, row `height - y`.
// Colors are interpolated per vertex (Gouraud), pixels are written opaque.
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::components::colors::Color;
use crate::ops::shapes::{DrawCommand, PointCap, Primitive, PrimitiveKind, Vertex};

/// Anything that can turn a [`Primitive`] into pixels.
pub trait Rasterizer {
    fn draw(&mut self, target: &mut RgbaImage, primitive: &Primitive);
}

/// CPU reference backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareRasterizer;

impl Rasterizer for SoftwareRasterizer {
    fn draw(&mut self, target: &mut RgbaImage, primitive: &Primitive) {
        for cmd in &primitive.commands {
            draw_command(target, cmd);
        }
    }
}

pub fn draw_command(target: &mut RgbaImage, cmd: &DrawCommand) {
    match cmd.kind {
        PrimitiveKind::Points => {
            for v in &cmd.vertices {
                let (x, y) = to_image(target, v);
                stamp(target, x, y, cmd.point_size, cmd.point_cap, v.color);
            }
        }
        PrimitiveKind::LineStrip => {
            for seg in cmd.vertices.windows(2) {
                draw_segment(target, &seg[0], &seg[1], cmd.line_width);
            }
        }
        PrimitiveKind::Polygon => {
            if cmd.vertices.len() < 3 {
                return;
            }
            let first = &cmd.vertices[0];
            for pair in cmd.vertices[1..].windows(2) {
                fill_triangle(target, first, &pair[0], &pair[1]);
            }
        }
    }
}

#[inline]
fn to_image(target: &RgbaImage, v: &Vertex) -> (f32, f32) {
    (v.position.x, target.height() as f32 - v.position.y)
}

#[inline]
fn put(target: &mut RgbaImage, x: i64, y: i64, color: Color) {
    if x < 0 || y < 0 || x >= target.width() as i64 || y >= target.height() as i64 {
        return;
    }
    target.put_pixel(x as u32, y as u32, color.to_rgb8().to_rgba(255));
}

/// Stamp a square or disc of diameter `size` centred on (cx, cy).
fn stamp(target: &mut RgbaImage, cx: f32, cy: f32, size: f32, cap: PointCap, color: Color) {
    let size = size.max(1.0);
    let half = size / 2.0;
    let x0 = (cx - half).floor() as i64;
    let x1 = (cx + half).ceil() as i64;
    let y0 = (cy - half).floor() as i64;
    let y1 = (cy + half).ceil() as i64;
    let r2 = half * half;

    for y in y0..y1 {
        for x in x0..x1 {
            // Sample at the pixel centre.
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let inside = match cap {
                PointCap::Square => dx.abs() <= half && dy.abs() <= half,
                PointCap::Round => dx * dx + dy * dy <= r2,
            };
            // A 1px stamp always covers the pixel it lands in.
            if inside || (size <= 1.0 && dx.abs() <= 0.5 && dy.abs() <= 0.5) {
                put(target, x, y, color);
            }
        }
    }
}

/// Dense sub-pixel stepping along the segment, stamping a square of the
/// line width with the interpolated color. Only the part of the segment
/// that can touch the target is stepped.
fn draw_segment(target: &mut RgbaImage, a: &Vertex, b: &Vertex, width: f32) {
    let (x0, y0) = to_image(target, a);
    let (x1, y1) = to_image(target, b);
    let margin = width.max(1.0) / 2.0 + 1.0;
    let Some((t_start, t_end)) = clip_segment(
        (x0 as f64, y0 as f64),
        (x1 as f64, y1 as f64),
        target.width() as f64,
        target.height() as f64,
        margin as f64,
    ) else {
        return;
    };

    let lerp = |t: f64| (x0 as f64 + (x1 - x0) as f64 * t, y0 as f64 + (y1 - y0) as f64 * t);
    let (sx, sy) = lerp(t_start);
    let (ex, ey) = lerp(t_end);
    let (dx, dy) = (ex - sx, ey - sy);
    let distance = (dx * dx + dy * dy).sqrt();
    let steps = (distance * 2.0).ceil().max(1.0) as usize;

    for i in 0..=steps {
        let s = i as f64 / steps as f64;
        let t = t_start + (t_end - t_start) * s;
        let color = a.color.lerp(b.color, t as f32);
        let (px, py) = (sx + dx * s, sy + dy * s);
        stamp(target, px as f32, py as f32, width, PointCap::Square, color);
    }
}

/// Liang-Barsky: the parameter range of `p0 -> p1` inside the target grown
/// by `margin` on every side, or `None` when the segment misses it.
fn clip_segment(p0: (f64, f64), p1: (f64, f64), w: f64, h: f64, margin: f64) -> Option<(f64, f64)> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let edges = [
        (-dx, p0.0 + margin),
        (dx, w + margin - p0.0),
        (-dy, p0.1 + margin),
        (dy, h + margin - p0.1),
    ];
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

/// Twice the signed area of (a, b, p).
#[inline]
fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Fill a triangle with barycentric color interpolation.
fn fill_triangle(target: &mut RgbaImage, a: &Vertex, b: &Vertex, c: &Vertex) {
    let pa = to_image(target, a);
    let pb = to_image(target, b);
    let pc = to_image(target, c);
    let area = edge(pa, pb, pc);
    if area == 0.0 || !area.is_finite() {
        return;
    }

    let w = target.width() as i64;
    let h = target.height() as i64;
    let min_x = (pa.0.min(pb.0).min(pc.0).floor() as i64).max(0);
    let max_x = (pa.0.max(pb.0).max(pc.0).ceil() as i64).min(w);
    let min_y = (pa.1.min(pb.1).min(pc.1).floor() as i64).max(0);
    let max_y = (pa.1.max(pb.1).max(pc.1).ceil() as i64).min(h);

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let wa = edge(pb, pc, p) / area;
            let wb = edge(pc, pa, p) / area;
            let wc = edge(pa, pb, p) / area;
            if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                continue;
            }
            let mut rgb = [0.0f32; 3];
            for (i, ch) in rgb.iter_mut().enumerate() {
                *ch = a.color.0[i] * wa + b.color.0[i] * wb + c.color.0[i] * wc;
            }
            put(target, x, y, Color(rgb));
        }
    }
}

/// Fill `target` completely with `color`.
pub fn fill(target: &mut RgbaImage, color: Rgba<u8>) {
    for p in target.pixels_mut() {
        *p = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tools::Point;

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]))
    }

    fn cmd(kind: PrimitiveKind, vertices: Vec<Vertex>, size: f32) -> DrawCommand {
        DrawCommand { kind, vertices, point_size: size, line_width: size, point_cap: PointCap::Square }
    }

    fn white_at(x: f32, y: f32) -> Vertex {
        Vertex::new(Point::new(x, y), Color::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn point_lands_on_flipped_row() {
        let mut img = blank(10, 10);
        draw_command(&mut img, &cmd(PrimitiveKind::Points, vec![white_at(2.5, 7.5)], 1.0));
        // canvas y = 7.5 from the bottom is image row 2.
        assert_eq!(img.get_pixel(2, 2).0, [255, 255, 255, 255]);
        assert_eq!(img.pixels().filter(|p| p.0[0] == 255).count(), 1);
    }

    #[test]
    fn square_point_covers_its_size() {
        let mut img = blank(20, 20);
        draw_command(&mut img, &cmd(PrimitiveKind::Points, vec![white_at(10.0, 10.0)], 4.0));
        assert_eq!(img.pixels().filter(|p| p.0[0] == 255).count(), 16);
    }

    #[test]
    fn line_interpolates_colors() {
        let mut img = blank(21, 3);
        let a = Vertex::new(Point::new(0.5, 1.5), Color::new(1.0, 0.0, 0.0));
        let b = Vertex::new(Point::new(20.5, 1.5), Color::new(0.0, 0.0, 1.0));
        draw_command(&mut img, &cmd(PrimitiveKind::LineStrip, vec![a, b], 1.0));
        let left = img.get_pixel(0, 1).0;
        let right = img.get_pixel(20, 1).0;
        let mid = img.get_pixel(10, 1).0;
        assert!(left[0] > 240 && left[2] < 15);
        assert!(right[2] > 240 && right[0] < 15);
        assert!(mid[0] > 100 && mid[2] > 100);
        // Rows above and below stay untouched.
        assert_eq!(img.get_pixel(10, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn polygon_fills_interior() {
        let mut img = blank(10, 10);
        let quad = vec![white_at(2.0, 2.0), white_at(8.0, 2.0), white_at(8.0, 8.0), white_at(2.0, 8.0)];
        draw_command(&mut img, &cmd(PrimitiveKind::Polygon, quad, 1.0));
        assert_eq!(img.get_pixel(5, 5).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.pixels().filter(|p| p.0[0] == 255).count(), 36);
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let mut img = blank(4, 4);
        let seg = vec![white_at(-50.0, -50.0), white_at(50.0, 50.0)];
        draw_command(&mut img, &cmd(PrimitiveKind::LineStrip, seg, 3.0));
        let tri = vec![white_at(-10.0, -10.0), white_at(100.0, -10.0), white_at(-10.0, 100.0)];
        draw_command(&mut img, &cmd(PrimitiveKind::Polygon, tri, 1.0));
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn far_off_canvas_segments_cost_nothing() {
        let mut img = blank(4, 4);
        let start = std::time::Instant::now();
        let miss = vec![white_at(0.0, 50.0), white_at(1.0e9, 50.0)];
        draw_command(&mut img, &cmd(PrimitiveKind::LineStrip, miss, 3.0));
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 255]));

        // Crosses the canvas between two far away endpoints.
        let across = vec![white_at(-1.0e9, 2.5), white_at(1.0e9, 2.5)];
        draw_command(&mut img, &cmd(PrimitiveKind::LineStrip, across, 1.0));
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
        for x in 0..4 {
            assert_eq!(img.get_pixel(x, 1).0, [255, 255, 255, 255]);
        }
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn clip_keeps_only_the_visible_range() {
        assert_eq!(clip_segment((0.0, 5.0), (10.0, 5.0), 10.0, 10.0, 0.0), Some((0.0, 1.0)));
        let (t0, t1) = clip_segment((-10.0, 5.0), (20.0, 5.0), 10.0, 10.0, 0.0).expect("crosses");
        assert!((t0 - 1.0 / 3.0).abs() < 1e-12 && (t1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(clip_segment((-10.0, -1.0), (20.0, -1.0), 10.0, 10.0, 0.5), None);
    }

    #[test]
    fn degenerate_polygon_draws_nothing() {
        let mut img = blank(5, 5);
        let flat = vec![white_at(0.0, 0.0), white_at(2.0, 2.0), white_at(4.0, 4.0)];
        draw_command(&mut img, &cmd(PrimitiveKind::Polygon, flat, 1.0));
        draw_command(&mut img, &cmd(PrimitiveKind::Polygon, vec![white_at(1.0, 1.0)], 1.0));
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }
}
