use crate::animation::viseme::VisemeParams;
use crate::error::{Error, Result};
use crate::renderer::bubble::BubbleConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Frames per second, shared by the interpolator, compositor and sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameRate(u32);

impl FrameRate {
    pub const DEFAULT: FrameRate = FrameRate(30);

    pub fn new(fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(Error::validation("frame rate must be greater than 0"));
        }
        Ok(Self(fps))
    }

    pub fn fps(self) -> u32 {
        self.0
    }

    /// Number of whole frames covering `duration_seconds`
    pub fn frame_count(self, duration_seconds: f64) -> u64 {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return 0;
        }
        (duration_seconds * self.0 as f64).floor() as u64
    }

    /// Convert frame number to time in seconds
    pub fn frame_to_time(self, frame: u64) -> f64 {
        frame as f64 / self.0 as f64
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    pub render: RenderConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub features: CompositorFeatures,
    pub viseme: VisemeParams,
    pub bubble: BubbleConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: FrameRate::DEFAULT,
            features: CompositorFeatures::default(),
            viseme: VisemeParams::default(),
            bubble: BubbleConfig::default(),
        }
    }
}

/// Toggles for the optional parts of a composited frame
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct CompositorFeatures {
    pub expressions: bool,
    pub mouth_animation: bool,
    pub speech_bubble: bool,
}

impl Default for CompositorFeatures {
    fn default() -> Self {
        Self {
            expressions: true,
            mouth_animation: true,
            speech_bubble: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Png,
    Ppm,
}

impl FrameFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FrameFormat::Png => "png",
            FrameFormat::Ppm => "ppm",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportConfig {
    pub staging_root: PathBuf,
    pub output_root: PathBuf,
    pub encoder_binary: String,
    pub encode_timeout_secs: u64,
    #[serde(default)]
    pub workers: Option<usize>,
    pub frame_format: FrameFormat,
    pub keep_staging: bool,
    pub frame_cache_entries: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            staging_root: PathBuf::from("storage/frames"),
            output_root: PathBuf::from("storage/videos"),
            encoder_binary: "ffmpeg".to_string(),
            encode_timeout_secs: 600,
            workers: None,
            frame_format: FrameFormat::Png,
            keep_staging: false,
            frame_cache_entries: 256,
        }
    }
}

impl ExportConfig {
    /// Size of the frame materialization pool
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

impl AppConfig {
    /// Load from `storyframe.*` in the working directory (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, optionally from an explicit file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let defaults = AppConfig::default();
        let mut builder = config::Config::builder()
            .set_default("render.width", defaults.render.width as i64)
            .and_then(|b| b.set_default("render.height", defaults.render.height as i64))
            .and_then(|b| {
                b.set_default(
                    "render.frame_rate",
                    defaults.render.frame_rate.fps() as i64,
                )
            })
            .and_then(|b| b.set_default("render.features.expressions", true))
            .and_then(|b| b.set_default("render.features.mouth_animation", true))
            .and_then(|b| b.set_default("render.features.speech_bubble", true))
            .and_then(|b| {
                b.set_default(
                    "render.viseme.speaking_threshold_frame",
                    defaults.render.viseme.speaking_threshold_frame as i64,
                )
            })
            .and_then(|b| {
                b.set_default("render.viseme.stride", defaults.render.viseme.stride as i64)
            })
            .and_then(|b| {
                b.set_default(
                    "render.bubble.wrap_width",
                    defaults.render.bubble.wrap_width as i64,
                )
            })
            .and_then(|b| {
                b.set_default(
                    "render.bubble.max_lines",
                    defaults.render.bubble.max_lines as i64,
                )
            })
            .and_then(|b| b.set_default("export.staging_root", "storage/frames"))
            .and_then(|b| b.set_default("export.output_root", "storage/videos"))
            .and_then(|b| b.set_default("export.encoder_binary", "ffmpeg"))
            .and_then(|b| {
                b.set_default(
                    "export.encode_timeout_secs",
                    defaults.export.encode_timeout_secs as i64,
                )
            })
            .and_then(|b| b.set_default("export.frame_format", "png"))
            .and_then(|b| b.set_default("export.keep_staging", false))
            .and_then(|b| {
                b.set_default(
                    "export.frame_cache_entries",
                    defaults.export.frame_cache_entries as i64,
                )
            })
            .map_err(config_error)?;

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("storyframe").required(false)),
        };
        // Allow env var overrides (e.g. STORYFRAME__EXPORT__ENCODER_BINARY=/opt/ffmpeg)
        builder =
            builder.add_source(config::Environment::with_prefix("STORYFRAME").separator("__"));

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.render.width == 0 || self.render.height == 0 {
            return Err(Error::validation("canvas width/height must be non-zero"));
        }
        if self.render.frame_rate.fps() == 0 {
            return Err(Error::validation("frame rate must be greater than 0"));
        }
        if self.render.viseme.stride == 0 {
            return Err(Error::validation("viseme stride must be greater than 0"));
        }
        if self.export.encode_timeout_secs == 0 {
            return Err(Error::validation("encode timeout must be greater than 0"));
        }
        if self.export.workers == Some(0) {
            return Err(Error::validation("workers must be >= 1 when set"));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::validation(e.to_string()))
    }
}

fn config_error(err: config::ConfigError) -> Error {
    Error::validation(format!("configuration: {err}"))
}
