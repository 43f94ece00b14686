use crate::renderer::scene_graph::{Color, LayerKind, Node, Paint, Shape, Stroke, Transform};
use tracing::warn;

/// Backgrounds are authored in this coordinate space and scaled to the canvas
pub const DESIGN_WIDTH: f64 = 1280.0;
pub const DESIGN_HEIGHT: f64 = 720.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Forest,
    Castle,
    Village,
    Mountain,
    Ocean,
    Garden,
}

impl Background {
    pub const ALL: [Background; 6] = [
        Background::Forest,
        Background::Castle,
        Background::Village,
        Background::Mountain,
        Background::Ocean,
        Background::Garden,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "forest" => Some(Background::Forest),
            "castle" => Some(Background::Castle),
            "village" => Some(Background::Village),
            "mountain" => Some(Background::Mountain),
            "ocean" => Some(Background::Ocean),
            "garden" => Some(Background::Garden),
            _ => None,
        }
    }

    /// Look up a background, falling back to the forest for unknown keys
    pub fn resolve(key: &str) -> Self {
        Self::from_key(key).unwrap_or_else(|| {
            warn!("Unknown background '{}', using forest", key);
            Background::Forest
        })
    }

    pub fn key(&self) -> &'static str {
        match self {
            Background::Forest => "forest",
            Background::Castle => "castle",
            Background::Village => "village",
            Background::Mountain => "mountain",
            Background::Ocean => "ocean",
            Background::Garden => "garden",
        }
    }

    /// Background layer scaled to a `width` x `height` canvas
    pub fn node(&self, width: u32, height: u32) -> Node {
        let shapes = match self {
            Background::Forest => forest(),
            Background::Castle => castle(),
            Background::Village => village(),
            Background::Mountain => mountain(),
            Background::Ocean => ocean(),
            Background::Garden => garden(),
        };
        Node {
            kind: LayerKind::Background,
            id: format!("background-{}", self.key()),
            transform: Transform::scale(width as f64 / DESIGN_WIDTH, height as f64 / DESIGN_HEIGHT),
            shapes,
        }
    }
}

fn hex(code: &str) -> Color {
    Color::from_hex(code).unwrap_or(Color::BLACK)
}

fn sky(top: &str, bottom: &str) -> Shape {
    Shape::rect(
        0.0,
        0.0,
        DESIGN_WIDTH,
        DESIGN_HEIGHT,
        Paint::VerticalGradient {
            top: hex(top),
            bottom: hex(bottom),
        },
    )
}

fn ground(y: f64, color: &str) -> Shape {
    Shape::rect(0.0, y, DESIGN_WIDTH, DESIGN_HEIGHT - y, hex(color))
}

fn sun(cx: f64, cy: f64, r: f64, opacity: f64) -> Shape {
    Shape::circle(cx, cy, r, hex("#FFD700").with_opacity(opacity))
}

fn forest() -> Vec<Shape> {
    let mut shapes = vec![sky("#87CEEB", "#E0F6FF"), sun(1100.0, 80.0, 40.0, 0.8)];

    let trees = [
        (0.0, 0.0, "#228B22"),
        (250.0, 0.0, "#2d5016"),
        (500.0, 20.0, "#228B22"),
        (750.0, 0.0, "#2d5016"),
        (1000.0, 30.0, "#228B22"),
    ];
    for (dx, dy, leaves) in trees {
        shapes.push(Shape::rect(80.0 + dx, 350.0 + dy, 30.0, 150.0, hex("#8B4513")));
        shapes.push(Shape::circle(95.0 + dx, 300.0 + dy, 70.0, hex(leaves)));
        shapes.push(Shape::circle(55.0 + dx, 320.0 + dy, 55.0, hex(leaves)));
        shapes.push(Shape::circle(135.0 + dx, 320.0 + dy, 55.0, hex(leaves)));
    }

    shapes.push(ground(500.0, "#90EE90"));
    for i in 1..=12 {
        shapes.push(Shape::ellipse(i as f64 * 100.0, 500.0, 8.0, 12.0, hex("#7CCD7C")));
    }
    shapes
}

fn castle() -> Vec<Shape> {
    let cloud = Color::WHITE.with_opacity(0.7);
    let mut shapes = vec![
        sky("#4A90E2", "#87CEEB"),
        Shape::ellipse(150.0, 100.0, 60.0, 30.0, cloud),
        Shape::ellipse(200.0, 110.0, 50.0, 25.0, cloud),
        Shape::ellipse(900.0, 150.0, 70.0, 35.0, cloud),
        Shape::ellipse(970.0, 165.0, 60.0, 30.0, cloud),
        Shape::rect(350.0, 200.0, 580.0, 300.0, hex("#A9A9A9")).stroked(Stroke::black(3.0)),
    ];

    for x in [280.0, 900.0] {
        let tower = Shape::rect(x, 180.0, 100.0, 360.0, hex("#808080"));
        shapes.push(tower.stroked(Stroke::black(2.0)));
        let spire = [(x, 180.0), (x + 50.0, 80.0), (x + 100.0, 180.0)];
        shapes.push(Shape::polygon(&spire, hex("#696969")));
    }

    shapes.extend([
        Shape::rect(620.0, 350.0, 80.0, 150.0, hex("#4A4A4A")).stroked(Stroke::black(2.0)),
        Shape::rect(635.0, 360.0, 50.0, 90.0, hex("#2F2F2F")),
        Shape::line(660.0, 100.0, 660.0, 200.0, Stroke::black(3.0)),
        Shape::polygon(&[(660.0, 100.0), (660.0, 130.0), (720.0, 115.0)], hex("#FF0000")),
        ground(560.0, "#8B7355"),
        Shape::rect(600.0, 500.0, 80.0, 60.0, hex("#696969")),
        Shape::line(640.0, 500.0, 640.0, 560.0, Stroke::new(Color::BLACK.with_opacity(0.5), 1.0)),
        Shape::line(600.0, 530.0, 680.0, 530.0, Stroke::new(Color::BLACK.with_opacity(0.5), 1.0)),
    ]);
    shapes
}

fn village() -> Vec<Shape> {
    let mut shapes = vec![
        sky("#87CEEB", "#FFE4B5"),
        sun(1080.0, 90.0, 45.0, 0.85),
        ground(520.0, "#C2B280"),
    ];

    let houses = [
        (120.0, "#F4A460", "#8B0000"),
        (470.0, "#FFDEAD", "#A52A2A"),
        (860.0, "#DEB887", "#8B4513"),
    ];
    let glass = hex("#ADD8E6");
    for (x, wall, roof) in houses {
        let roof_line = [(x - 20.0, 380.0), (x + 100.0, 290.0), (x + 220.0, 380.0)];
        shapes.push(Shape::rect(x, 380.0, 200.0, 140.0, hex(wall)).stroked(Stroke::black(2.0)));
        shapes.push(Shape::polygon(&roof_line, hex(roof)).stroked(Stroke::black(2.0)));
        shapes.push(Shape::rect(x + 80.0, 440.0, 40.0, 80.0, hex("#5C4033")));
        shapes.push(Shape::rect(x + 25.0, 405.0, 35.0, 30.0, glass).stroked(Stroke::black(1.5)));
        shapes.push(Shape::rect(x + 140.0, 405.0, 35.0, 30.0, glass).stroked(Stroke::black(1.5)));
    }

    let path = [(560.0, 720.0), (720.0, 720.0), (660.0, 520.0), (620.0, 520.0)];
    shapes.push(Shape::polygon(&path, hex("#D2B48C")));
    shapes
}

fn mountain() -> Vec<Shape> {
    let outline = Stroke::black(2.0);
    vec![
        sky("#87CEEB", "#E0F6FF"),
        sun(1050.0, 80.0, 40.0, 0.8),
        Shape::polygon(&[(100.0, 600.0), (400.0, 200.0), (700.0, 600.0)], hex("#8B7355"))
            .stroked(outline),
        Shape::polygon(&[(500.0, 650.0), (800.0, 250.0), (1100.0, 650.0)], hex("#A0826D"))
            .stroked(outline),
        Shape::polygon(&[(1000.0, 600.0), (1280.0, 300.0), (1560.0, 600.0)], hex("#8B7355"))
            .stroked(outline),
        Shape::polygon(&[(400.0, 200.0), (370.0, 280.0), (430.0, 280.0)], Color::WHITE),
        Shape::polygon(&[(800.0, 250.0), (760.0, 340.0), (840.0, 340.0)], Color::WHITE),
        Shape::polygon(&[(1280.0, 300.0), (1240.0, 400.0), (1320.0, 400.0)], Color::WHITE),
        ground(600.0, "#90EE90"),
    ]
}

fn ocean() -> Vec<Shape> {
    let mut shapes = vec![
        sky("#87CEEB", "#E0F6FF"),
        sun(200.0, 100.0, 50.0, 0.9),
    ];

    for (x, y) in [(400.0, 100.0), (600.0, 80.0), (800.0, 120.0)] {
        let wing = Stroke::black(2.0);
        shapes.push(Shape::curve((x - 12.0, y), (x - 6.0, y - 8.0), (x, y), wing));
        shapes.push(Shape::curve((x, y), (x + 6.0, y - 8.0), (x + 12.0, y), wing));
    }

    shapes.push(Shape::rect(
        0.0,
        350.0,
        DESIGN_WIDTH,
        DESIGN_HEIGHT - 350.0,
        Paint::VerticalGradient {
            top: hex("#1E90FF"),
            bottom: hex("#000080"),
        },
    ));

    for (y, width, opacity) in [(350.0, 3.0, 1.0), (400.0, 2.0, 0.6), (450.0, 2.0, 0.3)] {
        let stroke = Stroke::new(Color::WHITE.with_opacity(opacity), width);
        let mut x = 0.0;
        let mut crest = true;
        while x < DESIGN_WIDTH {
            let dip = if crest { -20.0 } else { 20.0 };
            shapes.push(Shape::curve((x, y), (x + 150.0, y + dip), (x + 300.0, y), stroke));
            x += 300.0;
            crest = !crest;
        }
    }
    shapes
}

fn garden() -> Vec<Shape> {
    let mut shapes = vec![
        sky("#87CEEB", "#E0F6FF"),
        ground(500.0, "#90EE90"),
        Shape::rect(580.0, 450.0, 120.0, 270.0, hex("#D2B48C"))
            .stroked(Stroke::new(hex("#8B7355"), 2.0)),
    ];

    let flowers = [
        (200.0, 400.0, "#FF69B4", "#FFB6C1"),
        (500.0, 420.0, "#FFD700", "#FFFF00"),
        (800.0, 410.0, "#FF1493", "#FF69B4"),
        (1100.0, 400.0, "#9370DB", "#DDA0DD"),
    ];
    let petals = [
        (0.0, -10.0),
        (10.0, -5.0),
        (10.0, 5.0),
        (0.0, 10.0),
        (-10.0, 5.0),
        (-10.0, -5.0),
    ];
    for (fx, fy, center, petal) in flowers {
        shapes.push(Shape::line(fx, fy, fx, fy + 30.0, Stroke::new(hex("#228B22"), 2.0)));
        for (px, py) in petals {
            shapes.push(Shape::circle(fx + px, fy + py, 6.0, hex(petal)));
        }
        shapes.push(Shape::circle(fx, fy, 8.0, hex(center)));
    }
    shapes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_background_falls_back() {
        assert_eq!(Background::resolve("moon base"), Background::Forest);
        assert_eq!(Background::resolve("Castle"), Background::Castle);
        assert_eq!(Background::from_key(""), None);
    }

    #[test]
    fn test_every_background_has_sky() {
        for bg in Background::ALL {
            let node = bg.node(1280, 720);
            assert_eq!(node.kind, LayerKind::Background);
            assert!(node.shapes.len() > 3, "{} is too sparse", bg.key());
            match &node.shapes[0] {
                Shape::Rect { width, height, fill: Some(Paint::VerticalGradient { .. }), .. } => {
                    assert_eq!(*width, DESIGN_WIDTH);
                    assert_eq!(*height, DESIGN_HEIGHT);
                }
                other => panic!("expected sky gradient, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_background_scales_to_canvas() {
        let node = Background::Ocean.node(640, 360);
        assert_eq!(node.transform.scale_x, 0.5);
        assert_eq!(node.transform.scale_y, 0.5);
        assert_eq!(node.id, "background-ocean");
    }
}
