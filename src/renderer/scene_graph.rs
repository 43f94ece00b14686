use crate::animation::viseme::MouthShape;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Straight-alpha RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB`, `#RRGGBBAA` or `#RGB`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Some(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Color::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            8 => Some(Color::rgba(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
                channel(&digits[6..8])?,
            )),
            _ => None,
        }
    }

    /// Same color with alpha scaled by `opacity`
    pub fn with_opacity(self, opacity: f64) -> Self {
        let a = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn opacity(self) -> f64 {
        self.a as f64 / 255.0
    }

    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgba(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    pub fn as_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Fill paint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Paint {
    Solid { color: Color },
    /// Top-to-bottom gradient over the shape's bounding box
    VerticalGradient { top: Color, bottom: Color },
}

impl Paint {
    pub fn solid(color: Color) -> Self {
        Paint::Solid { color }
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Solid { color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }

    pub fn black(width: f64) -> Self {
        Self::new(Color::BLACK, width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A drawing primitive in its node's local coordinate space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        corner_radius: f64,
        fill: Option<Paint>,
        stroke: Option<Stroke>,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        fill: Option<Paint>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Point>,
        fill: Option<Paint>,
        stroke: Option<Stroke>,
    },
    /// Quadratic curve
    Curve {
        from: Point,
        ctrl: Point,
        to: Point,
        stroke: Stroke,
    },
    /// Text run; `x`/`y` locate the left end of the baseline
    Text {
        x: f64,
        y: f64,
        size: f64,
        content: String,
        fill: Color,
    },
}

impl Shape {
    pub fn rect(x: f64, y: f64, width: f64, height: f64, fill: impl Into<Paint>) -> Self {
        Shape::Rect {
            x,
            y,
            width,
            height,
            corner_radius: 0.0,
            fill: Some(fill.into()),
            stroke: None,
        }
    }

    pub fn circle(cx: f64, cy: f64, r: f64, fill: impl Into<Paint>) -> Self {
        Self::ellipse(cx, cy, r, r, fill)
    }

    pub fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64, fill: impl Into<Paint>) -> Self {
        Shape::Ellipse {
            cx,
            cy,
            rx,
            ry,
            fill: Some(fill.into()),
            stroke: None,
        }
    }

    pub fn outlined_circle(cx: f64, cy: f64, r: f64, stroke: Stroke) -> Self {
        Shape::Ellipse {
            cx,
            cy,
            rx: r,
            ry: r,
            fill: None,
            stroke: Some(stroke),
        }
    }

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64, stroke: Stroke) -> Self {
        Shape::Line {
            from: Point::new(x1, y1),
            to: Point::new(x2, y2),
            stroke,
        }
    }

    pub fn polygon(points: &[(f64, f64)], fill: impl Into<Paint>) -> Self {
        Shape::Polygon {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            fill: Some(fill.into()),
            stroke: None,
        }
    }

    pub fn curve(from: (f64, f64), ctrl: (f64, f64), to: (f64, f64), stroke: Stroke) -> Self {
        Shape::Curve {
            from: Point::new(from.0, from.1),
            ctrl: Point::new(ctrl.0, ctrl.1),
            to: Point::new(to.0, to.1),
            stroke,
        }
    }

    /// Attach an outline to a fillable shape; other shapes are returned unchanged
    pub fn stroked(mut self, outline: Stroke) -> Self {
        match &mut self {
            Shape::Rect { stroke, .. }
            | Shape::Ellipse { stroke, .. }
            | Shape::Polygon { stroke, .. } => *stroke = Some(outline),
            _ => {}
        }
        self
    }

    pub fn rounded(mut self, radius: f64) -> Self {
        if let Shape::Rect { corner_radius, .. } = &mut self {
            *corner_radius = radius;
        }
        self
    }
}

/// Node transform: scale, then rotate (degrees, clockwise), then translate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub opacity: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translate_x: 0.0,
        translate_y: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        opacity: 1.0,
    };

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            translate_x: x,
            translate_y: y,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            scale_x: sx,
            scale_y: sy,
            ..Self::IDENTITY
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let x = p.x * self.scale_x;
        let y = p.y * self.scale_y;
        Point::new(
            x * cos - y * sin + self.translate_x,
            x * sin + y * cos + self.translate_y,
        )
    }

    /// Map a canvas point back into node space; `None` for degenerate scales
    pub fn invert(&self, p: Point) -> Option<Point> {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            return None;
        }
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let dx = p.x - self.translate_x;
        let dy = p.y - self.translate_y;
        let x = dx * cos + dy * sin;
        let y = -dx * sin + dy * cos;
        Some(Point::new(x / self.scale_x, y / self.scale_y))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Background,
    Character,
    Overlay,
}

/// A group of shapes sharing one transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: LayerKind,
    pub id: String,
    pub transform: Transform,
    pub shapes: Vec<Shape>,
}

/// Complete visual description of one frame, in paint order
///
/// Emitted by the compositor; rasterization and SVG serialization consume it
/// as separate stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameVisual {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<Node>,
    pub mouth_shape: MouthShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_bubble: Option<Vec<String>>,
}

impl FrameVisual {
    /// Canonical serialized form
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// SHA-256 of the canonical serialized form, hex encoded
    pub fn digest(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        serde_json::to_writer(&mut hasher, self)?;
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn nodes_of(&self, kind: LayerKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }
}
