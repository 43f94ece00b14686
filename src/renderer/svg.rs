use crate::renderer::scene_graph::{Color, FrameVisual, Node, Paint, Shape, Stroke, Transform};
use std::fmt::Write;

/// Serialize a frame as a standalone SVG document
pub fn to_svg(visual: &FrameVisual) -> String {
    let mut out = String::new();
    let mut gradients = 0usize;
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = visual.width,
        h = visual.height
    );
    for node in &visual.nodes {
        write_node(&mut out, node, &mut gradients);
    }
    out.push_str("</svg>\n");
    out
}

fn write_node(out: &mut String, node: &Node, gradients: &mut usize) {
    let _ = writeln!(
        out,
        r#"  <g id="{}" transform="{}" opacity="{}">"#,
        escape(&node.id),
        transform_attr(&node.transform),
        fmt(node.transform.opacity)
    );
    for shape in &node.shapes {
        out.push_str("    ");
        write_shape(out, shape, gradients);
        out.push('\n');
    }
    out.push_str("  </g>\n");
}

fn transform_attr(t: &Transform) -> String {
    format!(
        "translate({} {}) rotate({}) scale({} {})",
        fmt(t.translate_x),
        fmt(t.translate_y),
        fmt(t.rotation),
        fmt(t.scale_x),
        fmt(t.scale_y)
    )
}

fn write_shape(out: &mut String, shape: &Shape, gradients: &mut usize) {
    match shape {
        Shape::Rect { x, y, width, height, corner_radius, fill, stroke } => {
            let fill = fill_attr(out, fill.as_ref(), gradients);
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" {}{}/>"#,
                fmt(*x),
                fmt(*y),
                fmt(*width),
                fmt(*height),
                fmt(*corner_radius),
                fill,
                stroke_attr(stroke.as_ref())
            );
        }
        Shape::Ellipse { cx, cy, rx, ry, fill, stroke } => {
            let fill = fill_attr(out, fill.as_ref(), gradients);
            let _ = write!(
                out,
                r#"<ellipse cx="{}" cy="{}" rx="{}" ry="{}" {}{}/>"#,
                fmt(*cx),
                fmt(*cy),
                fmt(*rx),
                fmt(*ry),
                fill,
                stroke_attr(stroke.as_ref())
            );
        }
        Shape::Line { from, to, stroke } => {
            let _ = write!(
                out,
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke-linecap="round"{}/>"#,
                fmt(from.x),
                fmt(from.y),
                fmt(to.x),
                fmt(to.y),
                stroke_attr(Some(stroke))
            );
        }
        Shape::Polygon { points, fill, stroke } => {
            let fill = fill_attr(out, fill.as_ref(), gradients);
            let points: Vec<String> = points
                .iter()
                .map(|p| format!("{},{}", fmt(p.x), fmt(p.y)))
                .collect();
            let _ = write!(
                out,
                r#"<polygon points="{}" {}{}/>"#,
                points.join(" "),
                fill,
                stroke_attr(stroke.as_ref())
            );
        }
        Shape::Curve { from, ctrl, to, stroke } => {
            let _ = write!(
                out,
                r#"<path d="M {} {} Q {} {} {} {}" fill="none" stroke-linecap="round"{}/>"#,
                fmt(from.x),
                fmt(from.y),
                fmt(ctrl.x),
                fmt(ctrl.y),
                fmt(to.x),
                fmt(to.y),
                stroke_attr(Some(stroke))
            );
        }
        Shape::Text { x, y, size, content, fill } => {
            let _ = write!(
                out,
                r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="{}" {}>{}</text>"#,
                fmt(*x),
                fmt(*y),
                fmt(*size),
                color_attr("fill", *fill),
                escape(content)
            );
        }
    }
}

// Gradients are emitted inline as <defs> just before the shape using them
fn fill_attr(out: &mut String, fill: Option<&Paint>, gradients: &mut usize) -> String {
    match fill {
        None => r#"fill="none""#.to_string(),
        Some(Paint::Solid { color }) => color_attr("fill", *color),
        Some(Paint::VerticalGradient { top, bottom }) => {
            *gradients += 1;
            let id = format!("gradient-{}", gradients);
            let _ = write!(
                out,
                r#"<defs><linearGradient id="{id}" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="{}" stop-opacity="{}"/><stop offset="1" stop-color="{}" stop-opacity="{}"/></linearGradient></defs>"#,
                top.to_hex(),
                fmt(top.opacity()),
                bottom.to_hex(),
                fmt(bottom.opacity())
            );
            format!(r#"fill="url(#{id})""#)
        }
    }
}

fn stroke_attr(stroke: Option<&Stroke>) -> String {
    match stroke {
        None => String::new(),
        Some(s) => format!(r#" {} stroke-width="{}""#, color_attr("stroke", s.color), fmt(s.width)),
    }
}

fn color_attr(name: &str, color: Color) -> String {
    if color.a == 255 {
        format!(r#"{name}="{}""#, color.to_hex())
    } else {
        format!(r#"{name}="{}" {name}-opacity="{}""#, color.to_hex(), fmt(color.opacity()))
    }
}

/// Compact decimal without trailing zeros
fn fmt(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{:.3}", rounded);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
