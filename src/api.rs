use crate::error::{Error, Result};
use crate::export::ExportReport;
use crate::renderer::compositor::{Compositor, RenderSettings};
use crate::renderer::scene_graph::FrameVisual;
use crate::renderer::timeline::Timeline;
use crate::script::{CharacterCatalog, Scene};
use serde::Serialize;
use std::path::PathBuf;

/// Response to a render request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSummary {
    pub total_frames: u64,
    pub frame_rate: u32,
    pub preview_frame: Option<FrameVisual>,
}

/// Response to an export request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExportResponse {
    Success {
        success: bool,
        output_path: PathBuf,
        file_size: u64,
    },
    Failure {
        success: bool,
        error: String,
        message: String,
    },
}

impl ExportResponse {
    pub fn success(report: &ExportReport) -> Self {
        ExportResponse::Success {
            success: true,
            output_path: report.output_path.clone(),
            file_size: report.file_size,
        }
    }

    pub fn failure(error: &Error) -> Self {
        ExportResponse::Failure {
            success: false,
            error: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExportResponse::Success { .. })
    }
}

impl From<&Result<ExportReport>> for ExportResponse {
    fn from(result: &Result<ExportReport>) -> Self {
        match result {
            Ok(report) => Self::success(report),
            Err(e) => Self::failure(e),
        }
    }
}

/// Frame count, frame rate and the first frame of a project
pub fn render_project(
    scenes: &[Scene],
    catalog: &CharacterCatalog,
    settings: RenderSettings,
) -> Result<RenderSummary> {
    let timeline = Timeline::from_scenes(scenes, settings.frame_rate)?;
    let compositor = Compositor::new(settings);
    let preview_frame = timeline
        .scenes()
        .first()
        .map(|scene| compositor.render(scene, catalog, 0));

    Ok(RenderSummary {
        total_frames: timeline.total_frames(),
        frame_rate: settings.frame_rate.fps(),
        preview_frame,
    })
}

/// Render one frame of the scene with `scene_id`
pub fn preview_scene(
    scenes: &[Scene],
    scene_id: &str,
    catalog: &CharacterCatalog,
    settings: RenderSettings,
    frame_index: u64,
) -> Result<FrameVisual> {
    let scene = scenes
        .iter()
        .find(|s| s.id == scene_id)
        .ok_or_else(|| Error::not_found(format!("scene '{scene_id}'")))?;
    Ok(Compositor::new(settings).render(scene, catalog, frame_index))
}
