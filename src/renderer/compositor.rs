use crate::animation::keyframes::{AnimationKind, KeyframeInterpolator};
use crate::animation::viseme::{MouthShape, VisemeMapper, VisemeParams};
use crate::config::{CompositorFeatures, FrameRate, RenderConfig};
use crate::renderer::backgrounds::{Background, DESIGN_HEIGHT};
use crate::renderer::bubble::{self, BubbleConfig};
use crate::renderer::character::{self, ResolvedCharacter, FIGURE_TOP};
use crate::renderer::scene_graph::{FrameVisual, LayerKind, Node, Transform};
use crate::script::{CharacterCatalog, CharacterPlacement, Expression, Scene};
use serde::Serialize;
use tracing::debug;

/// Everything the compositor needs besides the scene itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub features: CompositorFeatures,
    pub viseme: VisemeParams,
    pub bubble: BubbleConfig,
}

impl From<&RenderConfig> for RenderSettings {
    fn from(config: &RenderConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            frame_rate: config.frame_rate,
            features: config.features,
            viseme: config.viseme,
            bubble: config.bubble,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

/// A composited frame placed on the global timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub scene_id: String,
    pub local_frame_index: u64,
    pub global_frame_index: u64,
    pub visual: FrameVisual,
}

/// Builds the visual description of a frame from scene state.
///
/// Rendering is a pure function of `(scene, catalog, frame_index)` and the
/// settings the compositor was built with.
#[derive(Debug, Clone)]
pub struct Compositor {
    settings: RenderSettings,
    interpolator: KeyframeInterpolator,
}

impl Compositor {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            interpolator: KeyframeInterpolator::new(settings.frame_rate),
            settings,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Compose one frame of `scene`; `frame_index` is local to the scene
    pub fn render(
        &self,
        scene: &Scene,
        catalog: &CharacterCatalog,
        frame_index: u64,
    ) -> FrameVisual {
        let RenderSettings { width, height, .. } = self.settings;
        let features = self.settings.features;
        let figure_scale = height as f64 / DESIGN_HEIGHT;

        let mouth_shape = if features.mouth_animation {
            VisemeMapper::new(&scene.narration, self.settings.viseme).shape_at(frame_index)
        } else {
            MouthShape::Rest
        };

        let mut nodes = Vec::with_capacity(scene.characters.len() + 2);
        nodes.push(Background::resolve(&scene.background_type).node(width, height));

        let mut bubble_anchor = None;
        for (slot, placement) in scene.characters.iter().enumerate() {
            let node =
                self.character_node(scene, catalog, placement, slot, frame_index, mouth_shape);
            if slot == 0 {
                bubble_anchor = Some((
                    node.transform.translate_x,
                    node.transform.translate_y - FIGURE_TOP * figure_scale,
                ));
            }
            nodes.push(node);
        }

        let mut speech_bubble = None;
        if features.speech_bubble && !scene.narration.trim().is_empty() {
            if let Some(anchor) = bubble_anchor {
                let lines = bubble::wrap(
                    &scene.narration,
                    self.settings.bubble.wrap_width,
                    self.settings.bubble.max_lines,
                );
                if !lines.is_empty() {
                    nodes.push(bubble::bubble_node(&lines, anchor, (width, height), figure_scale));
                    speech_bubble = Some(lines);
                }
            }
        }

        FrameVisual {
            width,
            height,
            nodes,
            mouth_shape,
            speech_bubble,
        }
    }

    /// Compose a frame and tag it with its timeline position
    pub fn render_frame(
        &self,
        scene: &Scene,
        catalog: &CharacterCatalog,
        local_frame_index: u64,
        global_frame_index: u64,
    ) -> Frame {
        Frame {
            scene_id: scene.id.clone(),
            local_frame_index,
            global_frame_index,
            visual: self.render(scene, catalog, local_frame_index),
        }
    }

    fn character_node(
        &self,
        scene: &Scene,
        catalog: &CharacterCatalog,
        placement: &CharacterPlacement,
        slot: usize,
        frame_index: u64,
        mouth_shape: MouthShape,
    ) -> Node {
        let RenderSettings { width, height, .. } = self.settings;
        let resolved = ResolvedCharacter::resolve(catalog, &placement.character_id);
        let start = placement.position.clamped();

        let mut position = start;
        let mut opacity = 1.0;
        let mut rotation = 0.0;
        if let Some(spec) = &placement.animation {
            let sampled = self.interpolator.sample(
                &spec.kind,
                scene.effective_duration(),
                start,
                spec.end_position.map(|p| p.clamped()),
                frame_index,
            );
            match sampled {
                Some(keyframe) => {
                    position.x = keyframe.x;
                    position.y = keyframe.y;
                    opacity = keyframe.opacity;
                    rotation = keyframe.rotation;
                }
                None if matches!(spec.kind, AnimationKind::Unknown(_)) => {
                    debug!("Animation '{}' has no keyframes, rendering static", spec.kind.as_str());
                }
                None => {}
            }
        }

        let expression = if self.settings.features.expressions {
            placement.expression
        } else {
            Expression::Neutral
        };

        let scale = height as f64 / DESIGN_HEIGHT;
        let (x, y) = position.to_pixels(width, height);
        Node {
            kind: LayerKind::Character,
            id: format!("character-{}-{}", slot, resolved.name),
            transform: Transform {
                translate_x: x,
                translate_y: y,
                rotation,
                scale_x: scale,
                scale_y: scale,
                opacity,
            },
            shapes: character::figure(resolved.color, expression, mouth_shape),
        }
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}
