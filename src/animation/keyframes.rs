use crate::config::FrameRate;
use crate::script::Position;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Horizontal drift applied by `entrance`, in normalized units
const ENTRANCE_DRIFT: f64 = 0.1;
/// Default displacement of `movement` when no end position is given
const DEFAULT_MOVE_OFFSET: f64 = 0.2;
/// Peak height of the `celebration` bounce
const BOUNCE_HEIGHT: f64 = 0.1;
/// Number of half-periods of the `celebration` bounce
const BOUNCE_HALF_PERIODS: f64 = 3.0;

/// Motion preset applied to a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnimationKind {
    Entrance,
    Movement,
    Celebration,
    ExpressionChange,
    /// Unrecognized preset; renders as a static placement
    Unknown(String),
}

impl AnimationKind {
    pub fn as_str(&self) -> &str {
        match self {
            AnimationKind::Entrance => "entrance",
            AnimationKind::Movement => "movement",
            AnimationKind::Celebration => "celebration",
            AnimationKind::ExpressionChange => "expression_change",
            AnimationKind::Unknown(name) => name,
        }
    }
}

impl From<&str> for AnimationKind {
    fn from(value: &str) -> Self {
        match value {
            "entrance" => AnimationKind::Entrance,
            "movement" => AnimationKind::Movement,
            "celebration" => AnimationKind::Celebration,
            "expression_change" => AnimationKind::ExpressionChange,
            other => AnimationKind::Unknown(other.to_string()),
        }
    }
}

impl From<String> for AnimationKind {
    fn from(value: String) -> Self {
        AnimationKind::from(value.as_str())
    }
}

impl From<AnimationKind> for String {
    fn from(value: AnimationKind) -> Self {
        value.as_str().to_string()
    }
}

/// Sampled animation state at one local frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: u64,
    pub x: f64,
    pub y: f64,
    pub opacity: f64,
    pub rotation: f64,
}

/// Produces per-frame motion for character animations
#[derive(Debug, Clone, Copy)]
pub struct KeyframeInterpolator {
    frame_rate: FrameRate,
}

impl KeyframeInterpolator {
    pub fn new(frame_rate: FrameRate) -> Self {
        Self { frame_rate }
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Generate the full keyframe sequence for an animation.
    ///
    /// Returns an empty sequence when the duration covers no whole frame or
    /// when the animation kind is unknown.
    pub fn generate(
        &self,
        kind: &AnimationKind,
        duration_seconds: f64,
        start: Position,
        end: Option<Position>,
    ) -> Vec<Keyframe> {
        let frame_count = self.frame_rate.frame_count(duration_seconds);
        if matches!(kind, AnimationKind::Unknown(_)) {
            return Vec::new();
        }

        (0..frame_count)
            .filter_map(|frame| Self::keyframe_at(kind, frame, frame_count, start, end))
            .collect()
    }

    /// Sample a single frame without materializing the whole sequence
    pub fn sample(
        &self,
        kind: &AnimationKind,
        duration_seconds: f64,
        start: Position,
        end: Option<Position>,
        frame: u64,
    ) -> Option<Keyframe> {
        let frame_count = self.frame_rate.frame_count(duration_seconds);
        if frame >= frame_count {
            return None;
        }
        Self::keyframe_at(kind, frame, frame_count, start, end)
    }

    fn keyframe_at(
        kind: &AnimationKind,
        frame: u64,
        frame_count: u64,
        start: Position,
        end: Option<Position>,
    ) -> Option<Keyframe> {
        if frame_count == 0 {
            return None;
        }
        let progress = frame as f64 / frame_count as f64;

        let keyframe = match kind {
            AnimationKind::Entrance => Keyframe {
                frame,
                x: start.x + progress * ENTRANCE_DRIFT,
                y: start.y,
                opacity: progress,
                rotation: 0.0,
            },
            AnimationKind::Movement => {
                let end = end.unwrap_or(Position {
                    x: start.x + DEFAULT_MOVE_OFFSET,
                    y: start.y,
                });
                Keyframe {
                    frame,
                    x: start.x + (end.x - start.x) * progress,
                    y: start.y + (end.y - start.y) * progress,
                    opacity: 1.0,
                    rotation: 0.0,
                }
            }
            AnimationKind::Celebration => {
                let bounce = (progress * PI * BOUNCE_HALF_PERIODS).sin() * BOUNCE_HEIGHT;
                Keyframe {
                    frame,
                    x: start.x,
                    y: start.y - bounce,
                    opacity: 1.0,
                    rotation: (progress * 360.0) % 360.0,
                }
            }
            AnimationKind::ExpressionChange => Keyframe {
                frame,
                x: start.x,
                y: start.y,
                opacity: 1.0,
                rotation: 0.0,
            },
            AnimationKind::Unknown(_) => return None,
        };

        Some(keyframe)
    }
}

impl Default for KeyframeInterpolator {
    fn default() -> Self {
        Self::new(FrameRate::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn interpolator() -> KeyframeInterpolator {
        KeyframeInterpolator::default()
    }

    #[test]
    fn test_frame_count_matches_duration() {
        let frames = interpolator().generate(
            &AnimationKind::Entrance,
            2.0,
            Position::new(0.2, 0.7),
            None,
        );
        assert_eq!(frames.len(), 60);
        assert_eq!(frames[0].frame, 0);
        assert_eq!(frames[59].frame, 59);
    }

    #[test]
    fn test_zero_frames_is_empty() {
        let frames = interpolator().generate(
            &AnimationKind::Movement,
            0.01,
            Position::new(0.2, 0.7),
            None,
        );
        assert!(frames.is_empty());
    }

    #[test]
    fn test_entrance_fades_and_drifts() {
        let start = Position::new(0.2, 0.7);
        let frames = interpolator().generate(&AnimationKind::Entrance, 1.0, start, None);
        assert!((frames[0].opacity).abs() < EPS);
        assert!((frames[0].x - 0.2).abs() < EPS);
        assert!((frames[15].opacity - 0.5).abs() < EPS);
        assert!((frames[15].x - 0.25).abs() < EPS);
        assert!(frames.iter().all(|k| (k.y - 0.7).abs() < EPS && k.rotation == 0.0));
    }

    #[test]
    fn test_movement_interpolates_to_end() {
        let start = Position::new(0.1, 0.5);
        let end = Position::new(0.9, 0.3);
        let frames = interpolator().generate(&AnimationKind::Movement, 3.0, start, Some(end));

        assert!((frames[0].x - start.x).abs() < EPS);
        assert!((frames[0].y - start.y).abs() < EPS);

        let last = frames.last().unwrap();
        assert!((last.x - end.x).abs() < 0.01);
        assert!((last.y - end.y).abs() < 0.01);
        assert!(frames.iter().all(|k| k.opacity == 1.0));
    }

    #[test]
    fn test_movement_default_end() {
        let start = Position::new(0.3, 0.6);
        let mid = interpolator()
            .sample(&AnimationKind::Movement, 2.0, start, None, 30)
            .unwrap();
        assert!((mid.x - 0.4).abs() < EPS);
        assert!((mid.y - 0.6).abs() < EPS);
    }

    #[test]
    fn test_celebration_bounces_and_spins() {
        let start = Position::new(0.5, 0.7);
        let frames = interpolator().generate(&AnimationKind::Celebration, 1.0, start, None);
        // progress 1/6 puts sin(3*pi*p) at its first peak
        assert!((frames[5].y - 0.6).abs() < EPS);
        assert!((frames[15].rotation - 180.0).abs() < EPS);
        assert!(frames.iter().all(|k| k.rotation >= 0.0 && k.rotation < 360.0));
    }

    #[test]
    fn test_expression_change_is_static() {
        let start = Position::new(0.4, 0.8);
        let frames =
            interpolator().generate(&AnimationKind::ExpressionChange, 0.5, start, None);
        assert_eq!(frames.len(), 15);
        assert!(frames
            .iter()
            .all(|k| k.x == 0.4 && k.y == 0.8 && k.opacity == 1.0 && k.rotation == 0.0));
    }

    #[test]
    fn test_unknown_kind_is_empty() {
        let kind = AnimationKind::from("teleport");
        assert_eq!(kind, AnimationKind::Unknown("teleport".into()));
        let frames = interpolator().generate(&kind, 2.0, Position::default(), None);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_sample_matches_generate() {
        let start = Position::new(0.25, 0.75);
        let all = interpolator().generate(&AnimationKind::Celebration, 1.5, start, None);
        for (i, expected) in all.iter().enumerate() {
            let sampled = interpolator()
                .sample(&AnimationKind::Celebration, 1.5, start, None, i as u64)
                .unwrap();
            assert_eq!(&sampled, expected);
        }
        assert!(interpolator()
            .sample(&AnimationKind::Celebration, 1.5, start, None, all.len() as u64)
            .is_none());
    }

    #[test]
    fn test_kind_serde() {
        let kind: AnimationKind = serde_json::from_str(r#""expression_change""#).unwrap();
        assert_eq!(kind, AnimationKind::ExpressionChange);
        assert_eq!(
            serde_json::to_string(&AnimationKind::Celebration).unwrap(),
            r#""celebration""#
        );
    }
}
