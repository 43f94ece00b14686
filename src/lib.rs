pub mod animation;
pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod parser;
pub mod renderer;
pub mod script;

pub use animation::{KeyframeInterpolator, MouthShape, VisemeMapper};
pub use api::{preview_scene, render_project, ExportResponse, RenderSummary};
pub use audio::{SilentSynthesizer, SpeechSynthesizer};
pub use config::{AppConfig, FrameRate};
pub use error::{EncodeError, Error, Result};
pub use export::{
    CancellationToken, ExportJob, ExportRequest, ExportState, Exporter, FfmpegEncoder, VideoEncoder,
};
pub use parser::ScriptParser;
pub use renderer::{
    Compositor, CpuRasterizer, FrameBuffer, FrameVisual, Rasterizer, RenderSettings, Timeline,
};
pub use script::{CharacterCatalog, Scene, SceneScript};
