pub mod keyframes;
pub mod viseme;

pub use keyframes::{AnimationKind, Keyframe, KeyframeInterpolator};
pub use viseme::{mouth_track, shape_for, MouthKeyframe, MouthShape, VisemeMapper, VisemeParams};
