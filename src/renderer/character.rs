use crate::animation::viseme::MouthShape;
use crate::renderer::scene_graph::{Color, Shape, Stroke};
use crate::script::{CharacterCatalog, Expression};
use tracing::debug;

/// Accent color for characters missing from the catalog or carrying an unusable color
pub const DEFAULT_ACCENT: Color = Color::rgb(0xFF, 0x6B, 0x6B);

/// Distance from the figure origin to the top of the hair, in figure units
pub const FIGURE_TOP: f64 = 62.0;

const MOUTH_FILL: Color = Color::rgb(0x5A, 0x1A, 0x1A);
const TEAR: Color = Color::rgb(0x87, 0xCE, 0xEB);

/// Catalog entry resolved for drawing
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCharacter {
    pub name: String,
    pub color: Color,
}

impl ResolvedCharacter {
    /// Resolve against the catalog; unknown ids become a placeholder named after the id
    pub fn resolve(catalog: &CharacterCatalog, character_id: &str) -> Self {
        match catalog.get(character_id) {
            Some(character) => Self {
                name: character.name.clone(),
                color: Color::from_hex(&character.color).unwrap_or(DEFAULT_ACCENT),
            },
            None => {
                debug!("Character '{}' not in catalog, using placeholder", character_id);
                Self {
                    name: character_id.to_string(),
                    color: DEFAULT_ACCENT,
                }
            }
        }
    }
}

/// Shapes for a standing figure centered on its origin (feet at +70, hair at -62).
///
/// `mouth` replaces the expression's resting mouth unless it is [`MouthShape::Rest`].
pub fn figure(color: Color, expression: Expression, mouth: MouthShape) -> Vec<Shape> {
    let outline = Stroke::black(2.5);
    let mut shapes = vec![
        Shape::ellipse(0.0, 70.0, 30.0, 8.0, Color::BLACK.with_opacity(0.2)),
        Shape::circle(0.0, -30.0, 28.0, color).stroked(outline),
        Shape::polygon(
            &[
                (-28.0, -35.0),
                (-31.0, -47.0),
                (-20.0, -58.0),
                (0.0, -62.0),
                (20.0, -58.0),
                (31.0, -47.0),
                (28.0, -35.0),
            ],
            color,
        )
        .stroked(Stroke::black(2.0)),
    ];

    shapes.extend(eyes(expression));
    shapes.extend(expression_marks(expression));
    if mouth == MouthShape::Rest {
        shapes.extend(resting_mouth(expression));
    } else {
        shapes.extend(viseme_mouth(mouth));
    }

    let limb = Stroke::new(color, 4.0);
    shapes.extend([
        Shape::rect(-18.0, 0.0, 36.0, 45.0, color).rounded(8.0).stroked(outline),
        Shape::rect(-16.0, 2.0, 32.0, 12.0, color.with_opacity(0.8)).stroked(Stroke::black(1.5)),
        Shape::line(-18.0, 12.0, -42.0, 18.0, limb),
        Shape::line(18.0, 12.0, 42.0, 18.0, limb),
        Shape::circle(-42.0, 18.0, 6.0, color).stroked(Stroke::black(2.0)),
        Shape::circle(42.0, 18.0, 6.0, color).stroked(Stroke::black(2.0)),
        Shape::line(-10.0, 45.0, -10.0, 65.0, limb),
        Shape::line(10.0, 45.0, 10.0, 65.0, limb),
        Shape::ellipse(-10.0, 68.0, 8.0, 5.0, Color::BLACK),
        Shape::ellipse(10.0, 68.0, 8.0, 5.0, Color::BLACK),
    ]);
    shapes
}

fn eyes(expression: Expression) -> Vec<Shape> {
    match expression {
        Expression::Surprised => vec![
            Shape::circle(-12.0, -35.0, 7.0, Color::WHITE).stroked(Stroke::black(2.0)),
            Shape::circle(12.0, -35.0, 7.0, Color::WHITE).stroked(Stroke::black(2.0)),
            Shape::circle(-12.0, -34.0, 4.0, Color::BLACK),
            Shape::circle(12.0, -34.0, 4.0, Color::BLACK),
        ],
        _ => vec![
            Shape::circle(-12.0, -35.0, 5.0, Color::WHITE).stroked(Stroke::black(1.5)),
            Shape::circle(12.0, -35.0, 5.0, Color::WHITE).stroked(Stroke::black(1.5)),
            Shape::circle(-10.0, -34.0, 3.0, Color::BLACK),
            Shape::circle(14.0, -34.0, 3.0, Color::BLACK),
        ],
    }
}

fn expression_marks(expression: Expression) -> Vec<Shape> {
    match expression {
        Expression::Happy => vec![
            Shape::curve((-18.0, -32.0), (-12.0, -28.0), (-6.0, -32.0), Stroke::black(2.0)),
            Shape::curve((6.0, -32.0), (12.0, -28.0), (18.0, -32.0), Stroke::black(2.0)),
        ],
        Expression::Sad => vec![
            Shape::line(-18.0, -30.0, -6.0, -34.0, Stroke::black(2.0)),
            Shape::line(6.0, -30.0, 18.0, -34.0, Stroke::black(2.0)),
            Shape::circle(-12.0, -25.0, 2.0, TEAR),
            Shape::circle(12.0, -25.0, 2.0, TEAR),
        ],
        Expression::Angry => vec![
            Shape::line(-18.0, -32.0, -6.0, -38.0, Stroke::black(2.5)),
            Shape::line(6.0, -38.0, 18.0, -32.0, Stroke::black(2.5)),
            Shape::line(-15.0, -42.0, -8.0, -40.0, Stroke::black(2.0)),
            Shape::line(15.0, -42.0, 8.0, -40.0, Stroke::black(2.0)),
        ],
        Expression::Surprised | Expression::Neutral => Vec::new(),
    }
}

fn resting_mouth(expression: Expression) -> Vec<Shape> {
    let lips = Stroke::black(2.5);
    match expression {
        Expression::Happy => vec![Shape::curve((-12.0, -18.0), (0.0, -12.0), (12.0, -18.0), lips)],
        Expression::Sad => vec![Shape::curve((-12.0, -14.0), (0.0, -20.0), (12.0, -14.0), lips)],
        Expression::Surprised => vec![Shape::outlined_circle(0.0, -18.0, 6.0, Stroke::black(2.5))],
        Expression::Angry => vec![Shape::line(-12.0, -15.0, 12.0, -15.0, Stroke::black(2.5))],
        Expression::Neutral => vec![Shape::line(-10.0, -18.0, 10.0, -18.0, Stroke::black(2.0))],
    }
}

fn viseme_mouth(mouth: MouthShape) -> Vec<Shape> {
    let lips = Stroke::black(2.0);
    match mouth {
        MouthShape::Rest => resting_mouth(Expression::Neutral),
        MouthShape::Open => vec![Shape::ellipse(0.0, -16.0, 7.0, 5.0, MOUTH_FILL).stroked(lips)],
        MouthShape::Narrow => vec![Shape::line(-6.0, -17.0, 6.0, -17.0, Stroke::black(3.0))],
        MouthShape::Wide => vec![Shape::ellipse(0.0, -17.0, 10.0, 3.0, MOUTH_FILL).stroked(lips)],
        MouthShape::Oh => vec![Shape::ellipse(0.0, -16.0, 5.0, 6.0, MOUTH_FILL).stroked(lips)],
        MouthShape::Teeth => vec![
            Shape::rect(-8.0, -20.0, 16.0, 6.0, Color::WHITE)
                .rounded(1.5)
                .stroked(Stroke::black(1.5)),
            Shape::line(-8.0, -17.0, 8.0, -17.0, Stroke::black(1.0)),
        ],
        MouthShape::Smile => vec![
            Shape::curve((-11.0, -19.0), (0.0, -10.0), (11.0, -19.0), Stroke::black(2.5)),
            Shape::line(-11.0, -19.0, 11.0, -19.0, Stroke::black(1.5)),
        ],
    }
}
