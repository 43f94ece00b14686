use crate::animation::keyframes::AnimationKind;
use crate::renderer::backgrounds::Background;
use crate::script::{CharacterCatalog, SceneScript};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Loads scene scripts from JSON
pub struct ScriptParser;

impl ScriptParser {
    /// Parse a JSON script file
    pub fn parse_json(path: &Path) -> Result<SceneScript> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script file: {}", path.display()))?;

        Self::parse_str(&content)
            .with_context(|| format!("Failed to parse JSON script: {}", path.display()))
    }

    /// Parse, normalize and validate a JSON script
    pub fn parse_str(content: &str) -> Result<SceneScript> {
        let mut script: SceneScript = serde_json::from_str(content)?;
        Self::normalize(&mut script);
        Self::validate_script(&script)?;
        Ok(script)
    }

    /// Pull out-of-range placements back onto the canvas and report visual fallbacks
    fn normalize(script: &mut SceneScript) {
        for scene in &mut script.scenes {
            if Background::from_key(&scene.background_type).is_none() {
                warn!(
                    "Scene '{}' uses unknown background '{}', rendering as forest",
                    scene.id, scene.background_type
                );
            }

            for placement in &mut scene.characters {
                if !placement.position.is_normalized() {
                    let clamped = placement.position.clamped();
                    warn!(
                        "Scene '{}': position ({}, {}) of '{}' clamped to ({}, {})",
                        scene.id,
                        placement.position.x,
                        placement.position.y,
                        placement.character_id,
                        clamped.x,
                        clamped.y
                    );
                    placement.position = clamped;
                }

                if let Some(animation) = &mut placement.animation {
                    if let AnimationKind::Unknown(name) = &animation.kind {
                        warn!(
                            "Scene '{}': unknown animation '{}' on '{}' renders static",
                            scene.id, name, placement.character_id
                        );
                    }
                    animation.end_position = animation.end_position.map(|p| p.clamped());
                }
            }
        }
    }

    /// Validate the script structure
    fn validate_script(script: &SceneScript) -> Result<()> {
        let mut seen = HashSet::new();
        for (idx, scene) in script.scenes.iter().enumerate() {
            if scene.id.trim().is_empty() {
                anyhow::bail!("Scene {} has empty ID", idx);
            }
            if !seen.insert(scene.id.as_str()) {
                anyhow::bail!("Duplicate scene ID '{}'", scene.id);
            }

            for placement in &scene.characters {
                if placement.character_id.trim().is_empty() {
                    anyhow::bail!("Scene '{}' places a character with an empty ID", scene.id);
                }
            }
        }

        if let Some(catalog) = &script.characters {
            for character in catalog.iter() {
                if character.name.trim().is_empty() {
                    anyhow::bail!("Character '{}' has an empty name", character.id);
                }
            }
        }

        Ok(())
    }

    /// The script's own catalog layered over the built-in cast
    pub fn catalog(script: &SceneScript) -> CharacterCatalog {
        let mut catalog = CharacterCatalog::builtin();
        if let Some(custom) = &script.characters {
            for character in custom.iter() {
                catalog.insert(character.clone());
            }
        }
        catalog
    }

    /// Get a summary of the script structure
    pub fn summarize(script: &SceneScript) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Scenes: {}\n", script.scenes.len()));

        let mut ordered: Vec<_> = script.scenes.iter().collect();
        ordered.sort_by_key(|s| s.sequence);
        for (idx, scene) in ordered.iter().enumerate() {
            summary.push_str(&format!(
                "  Scene {}: '{}' ({:.2}s, {}, {} characters)\n",
                idx + 1,
                scene.id,
                scene.effective_duration(),
                scene.background_type,
                scene.characters.len()
            ));
        }

        let total: f64 = script.scenes.iter().map(|s| s.effective_duration()).sum();
        summary.push_str(&format!("Duration: {:.2}s\n", total));

        if let Some(catalog) = &script.characters {
            summary.push_str(&format!("Custom characters: {}\n", catalog.len()));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Expression, Position};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCRIPT: &str = r##"
    {
        "scenes": [
            {
                "id": "meeting",
                "sequence": 2,
                "background_type": "village",
                "characters": [
                    {"character_id": "friend", "position": {"x": 0.7, "y": 0.7}, "expression": "happy"}
                ],
                "narration": "They met in the village.",
                "duration": 4.0
            },
            {
                "id": "intro",
                "sequence": 1,
                "characters": "[{\"character_id\": \"hero\", \"position\": {\"x\": 1.5, \"y\": 0.7}}]",
                "narration": "Hello"
            }
        ],
        "characters": {
            "dragon": {"name": "Dragon", "color": "#228B22", "expressions": ["angry"]}
        }
    }
    "##;

    #[test]
    fn test_parse_valid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SCRIPT.as_bytes()).unwrap();

        let script = ScriptParser::parse_json(file.path()).unwrap();
        assert_eq!(script.scenes.len(), 2);
        assert_eq!(script.scenes[1].duration, 3.0);
        assert_eq!(script.scenes[0].characters[0].expression, Expression::Happy);
    }

    #[test]
    fn test_positions_are_clamped() {
        let script = ScriptParser::parse_str(SCRIPT).unwrap();
        assert_eq!(script.scenes[1].characters[0].position, Position::new(1.0, 0.7));
    }

    #[test]
    fn test_catalog_merges_builtin_cast() {
        let script = ScriptParser::parse_str(SCRIPT).unwrap();
        let catalog = ScriptParser::catalog(&script);
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.get("dragon").unwrap().color, "#228B22");
        assert!(catalog.get("hero").is_some());
    }

    #[test]
    fn test_parse_invalid_json() {
        let json = r#"{"scenes": [{"id": "", "duration": 2.0}]}"#;
        let err = ScriptParser::parse_str(json).unwrap_err();
        assert!(err.to_string().contains("empty ID"));

        let json = r#"{"scenes": [{"id": "a"}, {"id": "a"}]}"#;
        let err = ScriptParser::parse_str(json).unwrap_err();
        assert!(err.to_string().contains("Duplicate scene ID"));

        assert!(ScriptParser::parse_str(r#"{"scenes": "nope"}"#).is_err());
    }

    #[test]
    fn test_unknown_values_are_accepted() {
        let json = r#"{"scenes": [{
            "id": "odd",
            "background_type": "moon",
            "characters": [{"character_id": "ghost", "expression": "sneaky",
                            "animation": {"type": "teleport"}}]
        }]}"#;
        let script = ScriptParser::parse_str(json).unwrap();
        let placement = &script.scenes[0].characters[0];
        assert_eq!(placement.expression, Expression::Neutral);
        assert_eq!(
            placement.animation.as_ref().unwrap().kind,
            AnimationKind::Unknown("teleport".into())
        );
    }

    #[test]
    fn test_summarize() {
        let script = ScriptParser::parse_str(SCRIPT).unwrap();
        let summary = ScriptParser::summarize(&script);
        assert!(summary.contains("Scenes: 2"));
        assert!(summary.contains("Scene 1: 'intro' (3.00s, forest, 1 characters)"));
        assert!(summary.contains("Scene 2: 'meeting' (4.00s, village, 1 characters)"));
        assert!(summary.contains("Duration: 7.00s"));
        assert!(summary.contains("Custom characters: 1"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = ScriptParser::parse_json(Path::new("/nonexistent/file.json"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read script file"));
    }
}
