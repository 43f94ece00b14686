use crate::audio::{self, Narration, SpeechSynthesizer};
use crate::config::{AppConfig, ExportConfig, FrameFormat};
use crate::error::{EncodeError, Error, Result};
use crate::export::encoder::{EncodeRequest, VideoEncoder};
use crate::export::job::{CancellationToken, ExportJob, ExportReport, ExportState};
use crate::export::registry::{ExportRegistry, FrameCache};
use crate::export::staging::{self, StagingLayout};
use crate::renderer::compositor::{Compositor, RenderSettings};
use crate::renderer::raster::{CpuRasterizer, Rasterizer};
use crate::renderer::timeline::{FrameRef, Timeline};
use crate::script::{CharacterCatalog, Scene};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

const MAX_LOGGED_FRAME_ERRORS: usize = 5;

/// One project's export input
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub project_id: String,
    pub scenes: Vec<Scene>,
    pub catalog: CharacterCatalog,
    /// Candidate audio tracks; the first existing file is attached
    pub audio_assets: Vec<PathBuf>,
}

impl ExportRequest {
    pub fn new(
        project_id: impl Into<String>,
        scenes: Vec<Scene>,
        catalog: CharacterCatalog,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            scenes,
            catalog,
            audio_assets: Vec::new(),
        }
    }

    pub fn with_audio(mut self, assets: Vec<PathBuf>) -> Self {
        self.audio_assets = assets;
        self
    }
}

#[derive(Debug, Default)]
struct MaterializeStats {
    written: u64,
    rasterized: u64,
    reused: u64,
}

/// Renders a project's frames to staging and assembles them into a video
///
/// Every timeline frame is written to a per-project staging directory on a
/// worker pool; the encoder only runs once all frame tasks have reported.
/// Frame file names are zero-padded global indices, so the encoder sees
/// frames in temporal order whatever order the workers finish in.
pub struct Exporter {
    compositor: Compositor,
    export: ExportConfig,
    layout: StagingLayout,
    encoder: Arc<dyn VideoEncoder>,
    rasterizer: Arc<dyn Rasterizer>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    registry: ExportRegistry,
    pool: rayon::ThreadPool,
}

impl Exporter {
    pub fn new(config: &AppConfig, encoder: Arc<dyn VideoEncoder>) -> Result<Self> {
        config.validate()?;
        let settings = RenderSettings::from(&config.render);
        if settings.width % 2 != 0 || settings.height % 2 != 0 {
            return Err(Error::validation(
                "canvas width/height must be even for yuv420p output",
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.export.worker_count())
            .thread_name(|i| format!("storyframe-render-{i}"))
            .build()
            .map_err(|e| Error::validation(format!("failed to build render thread pool: {e}")))?;

        Ok(Self {
            compositor: Compositor::new(settings),
            layout: StagingLayout::from_config(&config.export),
            export: config.export.clone(),
            encoder,
            rasterizer: Arc::new(CpuRasterizer::new()),
            synthesizer: None,
            registry: ExportRegistry::new(),
            pool,
        })
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Narrate projects that come without audio
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn registry(&self) -> &ExportRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &StagingLayout {
        &self.layout
    }

    /// Export a project to its output path.
    ///
    /// Requests rejected before any work starts (invalid id, export already in
    /// flight, nothing to render) return `Err`. Once the job exists, failures
    /// are recorded on it and the job is returned in its terminal state.
    pub fn export(&self, request: &ExportRequest, cancel: &CancellationToken) -> Result<ExportJob> {
        let staging_dir = self.layout.staging_dir(&request.project_id)?;
        let output_path = self.layout.output_path(&request.project_id)?;
        let _permit = self.registry.try_acquire(&request.project_id)?;

        let frame_rate = self.compositor.settings().frame_rate;
        let timeline = Timeline::from_scenes(&request.scenes, frame_rate)?;
        if timeline.total_frames() == 0 {
            return Err(Error::validation(format!(
                "project '{}' has no frames to render",
                request.project_id
            )));
        }

        let mut job = ExportJob::new(&request.project_id, staging_dir, output_path);
        info!(
            "Exporting '{}': {} scenes, {} frames at {} fps",
            request.project_id,
            timeline.scenes().len(),
            timeline.total_frames(),
            timeline.frame_rate().fps()
        );

        match self.run(&mut job, request, &timeline, cancel) {
            Ok(report) => {
                if !self.export.keep_staging {
                    if let Err(e) = staging::remove_dir(job.staging_directory()) {
                        warn!("Could not clean up {}: {}", job.staging_directory().display(), e);
                    }
                }
                job.complete(report)?;
                info!("Export '{}' finished: {}", request.project_id, job.output_path().display());
            }
            Err(e) => {
                warn!("Export '{}' failed: {}", request.project_id, e);
                if let Err(cleanup) = staging::remove_dir(job.staging_directory()) {
                    warn!("Could not clean up {}: {}", job.staging_directory().display(), cleanup);
                }
                // narration made for this run goes with it
                let narration = self.layout.narration_path(&request.project_id)?;
                let synthesized = audio::select_audio(&request.audio_assets).is_none();
                if synthesized && job.audio_reference() == Some(&narration) {
                    remove_file_if_present(&narration);
                    job.set_audio_reference(None);
                }
                job.fail(e);
            }
        }
        Ok(job)
    }

    fn run(
        &self,
        job: &mut ExportJob,
        request: &ExportRequest,
        timeline: &Timeline,
        cancel: &CancellationToken,
    ) -> Result<ExportReport> {
        if !self.encoder.is_available() {
            return Err(EncodeError::NotInstalled.into());
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        job.advance(ExportState::RenderingFrames)?;
        let staging_dir = job.staging_directory().clone();
        staging::prepare(&staging_dir)?;

        let mut audio = audio::select_audio(&request.audio_assets);
        let narration_text = narration_of(timeline.scenes());
        let synthesizer = match (&audio, &self.synthesizer) {
            (None, Some(s)) if !narration_text.is_empty() => Some(Arc::clone(s)),
            _ => None,
        };

        let narration_path = self.layout.narration_path(&request.project_id)?;
        if synthesizer.is_some() {
            if let Some(parent) = narration_path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        // frame materialization and narration synthesis are independent
        let (stats, narration) = thread::scope(|s| {
            let narration = synthesizer.map(|synth| {
                let text = narration_text.as_str();
                let path = narration_path.as_path();
                s.spawn(move || synth.synthesize(text, path))
            });
            let stats = self.materialize(timeline, &request.catalog, &staging_dir, cancel);
            let narration = narration.map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(Error::validation("speech synthesizer panicked")))
            });
            (stats, narration)
        });

        match narration {
            Some(Ok(Narration {
                audio_path,
                duration_seconds,
            })) => {
                debug!("Synthesized {:.2}s of narration", duration_seconds);
                audio = Some(audio_path);
            }
            Some(Err(e)) => {
                warn!("Narration synthesis failed, exporting without audio: {}", e);
                remove_file_if_present(&narration_path);
            }
            None => {}
        }
        job.set_audio_reference(audio.clone());

        // every frame task has reported by now
        let stats = stats?;
        let expected = timeline.total_frames();
        if stats.written < expected {
            return Err(Error::PartialRender {
                expected,
                rendered: stats.written,
            });
        }

        if let Some(track) = &audio {
            let video_seconds = audio::estimate_video_duration(expected, timeline.frame_rate());
            let audio_seconds = audio::duration_or_fallback(track);
            if audio_seconds + 1e-3 < video_seconds {
                warn!(
                    "Audio track is {:.2}s but video is {:.2}s; output will be cut to the audio",
                    audio_seconds, video_seconds
                );
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        job.advance(ExportState::Encoding)?;

        let settings = self.compositor.settings();
        let digits = staging::frame_digits(expected);
        let encode = EncodeRequest {
            frame_dir: staging_dir,
            frame_pattern: staging::frame_pattern(digits, self.export.frame_format),
            frame_rate: settings.frame_rate,
            width: settings.width,
            height: settings.height,
            audio: audio.clone(),
            output_path: job.output_path().clone(),
        };
        let outcome = self.encoder.encode(&encode)?;

        Ok(ExportReport {
            output_path: outcome.output_path,
            file_size: outcome.file_size,
            total_frames: expected,
            frame_rate: settings.frame_rate,
            frames_rasterized: stats.rasterized,
            frames_reused: stats.reused,
            audio_reference: audio,
        })
    }

    /// Render and write every frame on the worker pool; returns once all tasks report
    fn materialize(
        &self,
        timeline: &Timeline,
        catalog: &CharacterCatalog,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<MaterializeStats> {
        let format = self.export.frame_format;
        let digits = staging::frame_digits(timeline.total_frames());
        let cache = FrameCache::new(self.export.frame_cache_entries);
        let frames: Vec<FrameRef> = timeline.frames().collect();

        let outcomes: Vec<Result<()>> = self.pool.install(|| {
            frames
                .par_iter()
                .map(|frame| {
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    self.materialize_frame(timeline, catalog, frame, dir, digits, format, &cache)
                })
                .collect()
        });

        let mut stats = MaterializeStats::default();
        let mut cancelled = false;
        let mut failures = 0usize;
        for (frame, outcome) in frames.iter().zip(outcomes) {
            match outcome {
                Ok(()) => stats.written += 1,
                Err(Error::Cancelled) => cancelled = true,
                Err(e) => {
                    failures += 1;
                    if failures <= MAX_LOGGED_FRAME_ERRORS {
                        warn!("Frame {} failed: {}", frame.global_frame_index, e);
                    }
                }
            }
        }
        if cancelled {
            return Err(Error::Cancelled);
        }
        stats.rasterized = cache.misses();
        stats.reused = cache.hits();
        debug!(
            "Materialized {} frames ({} rasterized, {} reused, {} failed)",
            stats.written, stats.rasterized, stats.reused, failures
        );
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn materialize_frame(
        &self,
        timeline: &Timeline,
        catalog: &CharacterCatalog,
        frame: &FrameRef,
        dir: &Path,
        digits: usize,
        format: FrameFormat,
        cache: &FrameCache,
    ) -> Result<()> {
        let scene = &timeline.scenes()[frame.scene_index];
        let visual = self.compositor.render(scene, catalog, frame.local_frame_index);
        let digest = visual.digest()?;
        let bytes = cache.get_or_try_insert(&digest, || {
            self.rasterizer.rasterize(&visual)?.encode(format)
        })?;

        let path = dir.join(staging::frame_file_name(frame.global_frame_index, digits, format));
        fs::write(path, bytes.as_slice())?;
        Ok(())
    }
}

fn remove_file_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

/// Narration of every scene in playback order
fn narration_of(scenes: &[Scene]) -> String {
    scenes
        .iter()
        .map(|s| s.narration.trim())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
