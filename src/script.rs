use crate::animation::keyframes::AnimationKind;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Scene duration used when the stored value is missing or unusable
pub const DEFAULT_SCENE_DURATION: f64 = 3.0;

/// Background used when a scene names none
pub const DEFAULT_BACKGROUND: &str = "forest";

/// A scene script: the ordered scenes of a project plus an optional character catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneScript {
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub characters: Option<CharacterCatalog>,
}

/// A scene in the story
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub sequence: i64,
    #[serde(default = "default_background", deserialize_with = "lenient_background")]
    pub background_type: String,
    #[serde(default, deserialize_with = "lenient_placements")]
    pub characters: Vec<CharacterPlacement>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub narration: String,
    #[serde(default = "default_duration", deserialize_with = "lenient_duration")]
    pub duration: f64,
    #[serde(default)]
    pub transitions: serde_json::Value,
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

fn default_duration() -> f64 {
    DEFAULT_SCENE_DURATION
}

impl Scene {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sequence: 0,
            background_type: default_background(),
            characters: Vec::new(),
            narration: String::new(),
            duration: DEFAULT_SCENE_DURATION,
            transitions: serde_json::Value::Null,
        }
    }

    /// Duration in seconds, falling back to the default for non-positive or non-finite values
    pub fn effective_duration(&self) -> f64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            self.duration
        } else {
            DEFAULT_SCENE_DURATION
        }
    }
}

/// A character placed in a scene
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterPlacement {
    pub character_id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub expression: Expression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationSpec>,
}

impl CharacterPlacement {
    pub fn new(
        character_id: impl Into<String>,
        position: Position,
        expression: Expression,
    ) -> Self {
        Self {
            character_id: character_id.into(),
            position,
            expression,
            animation: None,
        }
    }
}

/// Normalized position, origin top-left, both axes in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_normalized(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }

    /// Clamp into the unit square; non-finite components fall back to the default placement
    pub fn clamped(&self) -> Self {
        let fallback = Position::default();
        let fix = |v: f64, d: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { d };
        Self {
            x: fix(self.x, fallback.x),
            y: fix(self.y, fallback.y),
        }
    }

    /// Scale to pixel space for a canvas of the given size
    pub fn to_pixels(&self, width: u32, height: u32) -> (f64, f64) {
        (self.x * width as f64, self.y * height as f64)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 0.5, y: 0.7 }
    }
}

/// Facial expression of a placed character; unrecognized values read as neutral
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum Expression {
    #[default]
    Neutral,
    Happy,
    Sad,
    Surprised,
    Angry,
}

impl Expression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Surprised => "surprised",
            Expression::Angry => "angry",
        }
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "happy" => Expression::Happy,
            "sad" => Expression::Sad,
            "surprised" => Expression::Surprised,
            "angry" => Expression::Angry,
            _ => Expression::Neutral,
        }
    }
}

impl From<String> for Expression {
    fn from(value: String) -> Self {
        Expression::from(value.as_str())
    }
}

/// Optional motion attached to a placement, sampled over the scene duration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimationSpec {
    #[serde(rename = "type")]
    pub kind: AnimationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_position: Option<Position>,
}

/// Character catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Character {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, alias = "expressions")]
    pub allowed_expressions: Vec<String>,
}

/// Read-only character catalog keyed by character id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "BTreeMap<String, Character>")]
pub struct CharacterCatalog {
    #[serde(flatten)]
    entries: BTreeMap<String, Character>,
}

impl From<BTreeMap<String, Character>> for CharacterCatalog {
    fn from(mut entries: BTreeMap<String, Character>) -> Self {
        for (id, character) in entries.iter_mut() {
            character.id = id.clone();
        }
        Self { entries }
    }
}

impl CharacterCatalog {
    /// The stock cast available to every project
    pub fn builtin() -> Self {
        let cast = [
            ("hero", "Hero", "#FF6B6B", &["happy", "sad", "surprised", "neutral"][..]),
            ("friend", "Friend", "#4ECDC4", &["happy", "sad", "surprised", "neutral"][..]),
            ("villain", "Villain", "#95E1D3", &["angry", "sneaky", "evil", "neutral"][..]),
            ("wise_one", "Wise One", "#F38181", &["wise", "kind", "neutral"][..]),
        ];

        let entries = cast
            .iter()
            .map(|(id, name, color, expressions)| {
                (
                    id.to_string(),
                    Character {
                        id: id.to_string(),
                        name: name.to_string(),
                        color: color.to_string(),
                        allowed_expressions: expressions.iter().map(|e| e.to_string()).collect(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, character: Character) {
        self.entries.insert(character.id.clone(), character);
    }

    pub fn get(&self, id: &str) -> Option<&Character> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.entries.values()
    }
}

fn lenient_background<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(default_background))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_duration<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(DEFAULT_SCENE_DURATION))
}

// Stored placements may arrive as an array or as a JSON-encoded string; anything
// unparsable renders as an empty cast.
fn lenient_placements<'de, D>(deserializer: D) -> Result<Vec<CharacterPlacement>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_placements(value))
}

pub(crate) fn parse_placements(value: serde_json::Value) -> Vec<CharacterPlacement> {
    let value = match value {
        serde_json::Value::Null => return Vec::new(),
        serde_json::Value::String(raw) => {
            if raw.trim().is_empty() {
                return Vec::new();
            }
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(inner) => inner,
                Err(e) => {
                    warn!("Ignoring malformed character list: {}", e);
                    return Vec::new();
                }
            }
        }
        other => other,
    };

    match serde_json::from_value::<Vec<CharacterPlacement>>(value) {
        Ok(placements) => placements,
        Err(e) => {
            warn!("Ignoring malformed character list: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_defaults() {
        let scene: Scene = serde_json::from_str(r#"{"id": "s1"}"#).unwrap();
        assert_eq!(scene.sequence, 0);
        assert_eq!(scene.background_type, "forest");
        assert!(scene.characters.is_empty());
        assert_eq!(scene.narration, "");
        assert_eq!(scene.duration, 3.0);
        assert!(scene.transitions.is_null());
    }

    #[test]
    fn test_invalid_duration_defaults() {
        for raw in [r#""abc""#, "-2.0", "0", "null", r#""2.5""#] {
            let json = format!(r#"{{"id": "s1", "duration": {raw}}}"#);
            let scene: Scene = serde_json::from_str(&json).unwrap();
            let expected = if raw == r#""2.5""# { 2.5 } else { 3.0 };
            assert_eq!(scene.duration, expected, "duration {raw}");
        }

        let mut scene = Scene::new("manual");
        scene.duration = -1.0;
        assert_eq!(scene.effective_duration(), 3.0);
        scene.duration = f64::INFINITY;
        assert_eq!(scene.effective_duration(), 3.0);
    }

    #[test]
    fn test_placements_from_encoded_string() {
        let json = r#"{
            "id": "s1",
            "characters": "[{\"character_id\": \"hero\", \"position\": {\"x\": 0.3, \"y\": 0.7}, \"expression\": \"happy\"}]"
        }"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.characters.len(), 1);
        assert_eq!(scene.characters[0].character_id, "hero");
        assert_eq!(scene.characters[0].expression, Expression::Happy);
    }

    #[test]
    fn test_malformed_placements_become_empty() {
        let json = r#"{"id": "s1", "characters": "[{not json"}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert!(scene.characters.is_empty());

        let json = r#"{"id": "s1", "characters": {"character_id": "hero"}}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert!(scene.characters.is_empty());
    }

    #[test]
    fn test_unknown_expression_is_neutral() {
        let placement: CharacterPlacement =
            serde_json::from_str(r#"{"character_id": "villain", "expression": "sneaky"}"#).unwrap();
        assert_eq!(placement.expression, Expression::Neutral);
        assert_eq!(placement.position, Position::default());

        let serialized = serde_json::to_string(&Expression::Surprised).unwrap();
        assert_eq!(serialized, r#""surprised""#);
    }

    #[test]
    fn test_position_clamping() {
        let pos = Position::new(1.4, -0.2).clamped();
        assert_eq!(pos, Position::new(1.0, 0.0));
        assert!(pos.is_normalized());

        let pos = Position::new(f64::NAN, 0.3).clamped();
        assert_eq!(pos, Position::new(0.5, 0.3));

        assert_eq!(Position::new(0.5, 0.5).to_pixels(1280, 720), (640.0, 360.0));
    }

    #[test]
    fn test_catalog_deserialization_fills_ids() {
        let json = r##"{"hero": {"name": "Hero", "color": "#FF6B6B", "expressions": ["happy"]}}"##;
        let catalog: CharacterCatalog = serde_json::from_str(json).unwrap();
        let hero = catalog.get("hero").unwrap();
        assert_eq!(hero.id, "hero");
        assert_eq!(hero.allowed_expressions, vec!["happy".to_string()]);
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = CharacterCatalog::builtin();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get("wise_one").unwrap().name, "Wise One");
        assert!(catalog.get("dragon").is_none());
    }
}
