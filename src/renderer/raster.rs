use crate::error::Result;
use crate::renderer::frame_buffer::FrameBuffer;
use crate::renderer::scene_graph::{
    Color, FrameVisual, Node, Paint, Point, Shape, Stroke, Transform,
};
use unicode_segmentation::UnicodeSegmentation;

const CURVE_SEGMENTS: usize = 16;

/// Swappable rasterization backend
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, visual: &FrameVisual) -> Result<FrameBuffer>;

    fn name(&self) -> &'static str;
}

/// Software rasterizer drawing into a [`FrameBuffer`]
///
/// Each pixel center is sampled once, mapped back into the node's local
/// space, so shape tests run in the coordinates the compositor emitted.
#[derive(Debug, Clone, Copy)]
pub struct CpuRasterizer {
    clear_color: Color,
}

impl CpuRasterizer {
    pub fn new() -> Self {
        Self {
            clear_color: Color::WHITE,
        }
    }

    pub fn with_clear_color(clear_color: Color) -> Self {
        Self { clear_color }
    }

    fn draw_node(&self, buffer: &mut FrameBuffer, node: &Node) {
        let opacity = node.transform.opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        for shape in &node.shapes {
            draw_shape(buffer, &node.transform, shape, opacity);
        }
    }
}

impl Default for CpuRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for CpuRasterizer {
    fn rasterize(&self, visual: &FrameVisual) -> Result<FrameBuffer> {
        let mut buffer = FrameBuffer::new(visual.width, visual.height);
        buffer.clear(self.clear_color.as_array());
        for node in &visual.nodes {
            self.draw_node(&mut buffer, node);
        }
        Ok(buffer)
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn of(points: impl IntoIterator<Item = Point>) -> Self {
        let mut b = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for p in points {
            b.min_x = b.min_x.min(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_x = b.max_x.max(p.x);
            b.max_y = b.max_y.max(p.y);
        }
        b
    }

    fn grow(self, by: f64) -> Self {
        Bounds {
            min_x: self.min_x - by,
            min_y: self.min_y - by,
            max_x: self.max_x + by,
            max_y: self.max_y + by,
        }
    }

    fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.min_x, self.max_y),
            Point::new(self.max_x, self.max_y),
        ]
    }
}

fn shape_bounds(shape: &Shape) -> Bounds {
    let half = |s: Option<&Stroke>| s.map_or(0.0, |s| s.width / 2.0);
    match shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
            stroke,
            ..
        } => Bounds::of([Point::new(*x, *y), Point::new(x + width, y + height)])
            .grow(half(stroke.as_ref())),
        Shape::Ellipse {
            cx,
            cy,
            rx,
            ry,
            stroke,
            ..
        } => Bounds::of([Point::new(cx - rx, cy - ry), Point::new(cx + rx, cy + ry)])
            .grow(half(stroke.as_ref())),
        Shape::Line { from, to, stroke } => Bounds::of([*from, *to]).grow(stroke.width / 2.0),
        Shape::Polygon { points, stroke, .. } => {
            Bounds::of(points.iter().copied()).grow(half(stroke.as_ref()))
        }
        Shape::Curve {
            from,
            ctrl,
            to,
            stroke,
        } => Bounds::of([*from, *ctrl, *to]).grow(stroke.width / 2.0),
        Shape::Text { x, y, size, content, .. } => {
            let advance = text_advance(*size);
            let width = content.graphemes(true).count() as f64 * advance;
            Bounds::of([Point::new(*x, y - size), Point::new(x + width, *y)])
        }
    }
}

fn text_advance(size: f64) -> f64 {
    size * 0.6
}

fn draw_shape(buffer: &mut FrameBuffer, transform: &Transform, shape: &Shape, opacity: f64) {
    let local = shape_bounds(shape);
    if !local.min_x.is_finite() || !local.max_x.is_finite() {
        return;
    }
    let canvas = Bounds::of(local.corners().into_iter().map(|p| transform.apply(p)));
    let (width, height) = buffer.dimensions();
    let x0 = canvas.min_x.floor().max(0.0) as u32;
    let y0 = canvas.min_y.floor().max(0.0) as u32;
    let x1 = (canvas.max_x.ceil().max(0.0) as u32).min(width);
    let y1 = (canvas.max_y.ceil().max(0.0) as u32).min(height);

    for py in y0..y1 {
        for px in x0..x1 {
            let Some(p) = transform.invert(Point::new(px as f64 + 0.5, py as f64 + 0.5)) else {
                return;
            };
            if let Some(color) = sample(shape, &local, p) {
                buffer.blend_pixel(px, py, color.with_opacity(opacity).as_array(), 1.0);
            }
        }
    }
}

/// Color of `shape` at local point `p`, if covered; strokes paint over fills
fn sample(shape: &Shape, bounds: &Bounds, p: Point) -> Option<Color> {
    match shape {
        Shape::Rect { x, y, width, height, corner_radius, fill, stroke } => {
            let d = rounded_rect_distance(p, *x, *y, *width, *height, *corner_radius);
            stroke_or_fill(d, stroke.as_ref(), fill.as_ref(), bounds, p)
        }
        Shape::Ellipse { cx, cy, rx, ry, fill, stroke } => {
            let d = ellipse_distance(p, *cx, *cy, *rx, *ry);
            stroke_or_fill(d, stroke.as_ref(), fill.as_ref(), bounds, p)
        }
        Shape::Line { from, to, stroke } => {
            (segment_distance(p, *from, *to) <= stroke.width / 2.0).then_some(stroke.color)
        }
        Shape::Polygon { points, fill, stroke } => {
            if let Some(s) = stroke {
                let edge = polygon_edge_distance(p, points);
                if edge <= s.width / 2.0 {
                    return Some(s.color);
                }
            }
            match fill {
                Some(paint) if point_in_polygon(p, points) => Some(paint_at(paint, bounds, p)),
                _ => None,
            }
        }
        Shape::Curve { from, ctrl, to, stroke } => {
            let mut prev = *from;
            for i in 1..=CURVE_SEGMENTS {
                let next = quad_point(*from, *ctrl, *to, i as f64 / CURVE_SEGMENTS as f64);
                if segment_distance(p, prev, next) <= stroke.width / 2.0 {
                    return Some(stroke.color);
                }
                prev = next;
            }
            None
        }
        Shape::Text { x, y, size, content, fill } => {
            // glyphs render as solid blocks
            let advance = text_advance(*size);
            if p.y < y - size * 0.7 || p.y > *y || p.x < *x {
                return None;
            }
            let slot = ((p.x - x) / advance) as usize;
            let within = (p.x - x) - slot as f64 * advance;
            let grapheme = content.graphemes(true).nth(slot)?;
            (!grapheme.trim().is_empty() && within < advance * 0.8).then_some(*fill)
        }
    }
}

/// Signed distance: negative inside the outline, positive outside
fn stroke_or_fill(
    distance: f64,
    stroke: Option<&Stroke>,
    fill: Option<&Paint>,
    bounds: &Bounds,
    p: Point,
) -> Option<Color> {
    if let Some(s) = stroke {
        if distance.abs() <= s.width / 2.0 {
            return Some(s.color);
        }
    }
    match fill {
        Some(paint) if distance <= 0.0 => Some(paint_at(paint, bounds, p)),
        _ => None,
    }
}

fn paint_at(paint: &Paint, bounds: &Bounds, p: Point) -> Color {
    match paint {
        Paint::Solid { color } => *color,
        Paint::VerticalGradient { top, bottom } => {
            let span = bounds.max_y - bounds.min_y;
            let t = if span > 0.0 { (p.y - bounds.min_y) / span } else { 0.0 };
            top.lerp(*bottom, t)
        }
    }
}

fn rounded_rect_distance(p: Point, x: f64, y: f64, w: f64, h: f64, radius: f64) -> f64 {
    let r = radius.max(0.0).min(w / 2.0).min(h / 2.0);
    let cx = x + w / 2.0;
    let cy = y + h / 2.0;
    let qx = (p.x - cx).abs() - (w / 2.0 - r);
    let qy = (p.y - cy).abs() - (h / 2.0 - r);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    outside + inside - r
}

// Approximate signed distance, exact for circles
fn ellipse_distance(p: Point, cx: f64, cy: f64, rx: f64, ry: f64) -> f64 {
    if rx <= 0.0 || ry <= 0.0 {
        return f64::INFINITY;
    }
    let nx = (p.x - cx) / rx;
    let ny = (p.y - cy) / ry;
    let k = (nx * nx + ny * ny).sqrt();
    (k - 1.0) * rx.min(ry)
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (ex, ey) = (a.x + t * dx - p.x, a.y + t * dy - p.y);
    (ex * ex + ey * ey).sqrt()
}

fn polygon_edge_distance(p: Point, points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| segment_distance(p, points[i], points[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Even-odd rule
fn point_in_polygon(p: Point, points: &[Point]) -> bool {
    let mut inside = false;
    let n = points.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn quad_point(a: Point, c: Point, b: Point, t: f64) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * a.x + 2.0 * u * t * c.x + t * t * b.x,
        u * u * a.y + 2.0 * u * t * c.y + t * t * b.y,
    )
}
