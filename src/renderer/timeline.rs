use crate::config::FrameRate;
use crate::error::{Error, Result};
use crate::script::Scene;
use serde::Serialize;

/// Position of one frame on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRef {
    /// Index into [`Timeline::scenes`]
    pub scene_index: usize,
    pub scene_id: String,
    pub local_frame_index: u64,
    pub global_frame_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneSegment {
    pub scene_id: String,
    pub start_frame: u64,
    pub end_frame: u64,
}

impl SceneSegment {
    pub fn frame_count(&self) -> u64 {
        self.end_frame - self.start_frame
    }
}

/// Scenes laid end to end on one global frame counter
#[derive(Debug, Clone)]
pub struct Timeline {
    frame_rate: FrameRate,
    total_frames: u64,
    scenes: Vec<Scene>,
    segments: Vec<SceneSegment>,
}

impl Timeline {
    /// Order scenes by `sequence` (stable for ties) and assign frame ranges
    pub fn from_scenes(scenes: &[Scene], frame_rate: FrameRate) -> Result<Self> {
        if scenes.is_empty() {
            return Err(Error::not_found("no scenes to render"));
        }

        let mut ordered = scenes.to_vec();
        ordered.sort_by_key(|scene| scene.sequence);

        let mut segments = Vec::with_capacity(ordered.len());
        let mut current_frame = 0;
        for scene in &ordered {
            let scene_frames = frame_rate.frame_count(scene.effective_duration());
            segments.push(SceneSegment {
                scene_id: scene.id.clone(),
                start_frame: current_frame,
                end_frame: current_frame + scene_frames,
            });
            current_frame += scene_frames;
        }

        Ok(Self {
            frame_rate,
            total_frames: current_frame,
            scenes: ordered,
            segments,
        })
    }

    /// Scenes in playback order
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn segments(&self) -> &[SceneSegment] {
        &self.segments
    }

    /// Every frame in global order
    pub fn frames(&self) -> impl Iterator<Item = FrameRef> + '_ {
        self.segments
            .iter()
            .enumerate()
            .flat_map(|(scene_index, segment)| {
                (segment.start_frame..segment.end_frame).map(move |global| FrameRef {
                    scene_index,
                    scene_id: segment.scene_id.clone(),
                    local_frame_index: global - segment.start_frame,
                    global_frame_index: global,
                })
            })
    }

    /// Get scene at given frame number
    pub fn get_scene_at_frame(&self, frame: u64) -> Option<&Scene> {
        self.locate(frame).map(|r| &self.scenes[r.scene_index])
    }

    /// Resolve a global frame index to its scene and local index
    pub fn locate(&self, frame: u64) -> Option<FrameRef> {
        if frame >= self.total_frames {
            return None;
        }
        // segments are sorted by start frame; empty segments never match
        let idx = self.segments.partition_point(|s| s.end_frame <= frame);
        let segment = self.segments.get(idx)?;
        Some(FrameRef {
            scene_index: idx,
            scene_id: segment.scene_id.clone(),
            local_frame_index: frame - segment.start_frame,
            global_frame_index: frame,
        })
    }

    /// Get total frame count
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Convert frame number to time in seconds
    pub fn frame_to_time(&self, frame: u64) -> f64 {
        self.frame_rate.frame_to_time(frame)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_to_time(self.total_frames)
    }
}

/// Flatten scenes into `(scene_id, local, global)` frame positions
pub fn sequence(scenes: &[Scene], frame_rate: FrameRate) -> Result<Vec<FrameRef>> {
    Ok(Timeline::from_scenes(scenes, frame_rate)?.frames().collect())
}
