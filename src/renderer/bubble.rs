use crate::renderer::scene_graph::{Color, LayerKind, Node, Shape, Stroke, Transform};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

const FONT_SIZE: f64 = 16.0;
const LINE_HEIGHT: f64 = 22.0;
/// Average glyph advance relative to the font size
const GLYPH_ADVANCE: f64 = 0.6;
const PADDING: f64 = 12.0;
const TAIL_HEIGHT: f64 = 16.0;
const MARGIN: f64 = 8.0;

/// Speech bubble layout settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BubbleConfig {
    /// Maximum characters per line
    pub wrap_width: usize,
    /// Lines kept; the rest of the narration is dropped
    pub max_lines: usize,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            wrap_width: 28,
            max_lines: 3,
        }
    }
}

fn text_width(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Greedy word wrap, measured in graphemes.
///
/// Words longer than `width` get a line of their own. Output stops at
/// `max_lines`; remaining text is dropped without an ellipsis.
pub fn wrap(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if text_width(&current) + 1 + text_width(word) <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            if lines.len() >= max_lines {
                return lines;
            }
            current.push_str(word);
        }
    }

    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }
    lines
}

/// Overlay node holding a bubble whose tail points at `anchor` (canvas pixels).
///
/// `scale` sizes the bubble relative to a 720-pixel-high canvas. The body is
/// kept inside the canvas even when the anchor sits near an edge.
pub fn bubble_node(lines: &[String], anchor: (f64, f64), canvas: (u32, u32), scale: f64) -> Node {
    let (canvas_w, canvas_h) = (canvas.0 as f64, canvas.1 as f64);
    let font_size = FONT_SIZE * scale;
    let line_height = LINE_HEIGHT * scale;
    let padding = PADDING * scale;
    let tail = TAIL_HEIGHT * scale;
    let margin = MARGIN * scale;

    let longest = lines.iter().map(|l| text_width(l)).max().unwrap_or(0) as f64;
    let width = longest * font_size * GLYPH_ADVANCE + 2.0 * padding;
    let height = lines.len() as f64 * line_height + 2.0 * padding;

    let max_x = (canvas_w - width - margin).max(margin);
    let x = (anchor.0 - width / 2.0).clamp(margin, max_x);
    let max_y = (canvas_h - height - margin).max(margin);
    let y = (anchor.1 - tail - height).clamp(margin, max_y);

    let tail_x = anchor.0.clamp(x + padding, (x + width - padding).max(x + padding));
    let base_y = y + height;
    let tip_y = anchor.1.max(base_y);

    let mut shapes = vec![
        Shape::rect(x, y, width, height, Color::WHITE)
            .rounded(10.0 * scale)
            .stroked(Stroke::black(2.0 * scale)),
        Shape::polygon(
            &[
                (tail_x - 8.0 * scale, base_y - 1.0),
                (tail_x + 8.0 * scale, base_y - 1.0),
                (tail_x, tip_y),
            ],
            Color::WHITE,
        )
        .stroked(Stroke::black(2.0 * scale)),
    ];

    for (i, line) in lines.iter().enumerate() {
        shapes.push(Shape::Text {
            x: x + padding,
            y: y + padding + (i as f64 + 0.75) * line_height,
            size: font_size,
            content: line.clone(),
            fill: Color::BLACK,
        });
    }

    Node {
        kind: LayerKind::Overlay,
        id: "speech-bubble".to_string(),
        transform: Transform::IDENTITY,
        shapes,
    }
}
