use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storyframe::animation::{mouth_track, AnimationKind, KeyframeInterpolator};
use storyframe::config::FrameFormat;
use storyframe::renderer::svg;
use storyframe::script::Position;
use storyframe::{
    preview_scene, render_project, AppConfig, CancellationToken, CpuRasterizer, ExportRequest,
    ExportResponse, Exporter, FfmpegEncoder, Rasterizer, RenderSettings, ScriptParser,
    SilentSynthesizer, Timeline, VideoEncoder,
};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "storyframe")]
#[command(about = "Storyboard scene renderer and video exporter", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./storyframe.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a script's frame count and preview frame
    Render {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Print the full render summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render one frame of a scene to an SVG, PNG or PPM file
    Preview {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Scene id
        #[arg(short, long)]
        scene: String,

        /// Local frame index within the scene
        #[arg(short, long, default_value_t = 0)]
        frame: u64,

        /// Output file; the extension selects the format
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Render every frame and assemble the video
    Export {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Project id, used for the staging directory and output file name
        #[arg(short, long)]
        project: String,

        /// Candidate audio tracks; the first existing one is attached
        #[arg(long)]
        audio: Vec<PathBuf>,

        /// Synthesize a narration track when no audio is given
        #[arg(long)]
        narrate: bool,
    },

    /// Replace the audio of an exported video without re-encoding its frames
    Mux {
        #[arg(value_name = "VIDEO")]
        video: PathBuf,

        #[arg(value_name = "AUDIO")]
        audio: PathBuf,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Print the keyframes of an animation preset as JSON
    Keyframes {
        /// Animation type (entrance, movement, celebration, expression_change)
        #[arg(value_name = "TYPE")]
        kind: String,

        #[arg(short, long, default_value_t = 3.0)]
        duration: f64,

        #[arg(long, default_value_t = 0.5)]
        x: f64,

        #[arg(long, default_value_t = 0.7)]
        y: f64,

        #[arg(long, requires = "end_y")]
        end_x: Option<f64>,

        #[arg(long, requires = "end_x")]
        end_y: Option<f64>,
    },

    /// Print the per-frame mouth shapes of a narration as JSON
    MouthTrack {
        #[arg(value_name = "TEXT")]
        text: String,

        #[arg(short, long, default_value_t = 3.0)]
        duration: f64,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays machine readable
    let default_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let settings = RenderSettings::from(&config.render);

    match cli.command {
        Commands::Render { script, json } => {
            let parsed = ScriptParser::parse_json(&script)?;
            let catalog = ScriptParser::catalog(&parsed);
            let summary = render_project(&parsed.scenes, &catalog, settings)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", ScriptParser::summarize(&parsed));
                println!("Total frames: {}", summary.total_frames);
                println!("Frame rate: {} fps", summary.frame_rate);
            }
        }

        Commands::Preview {
            script,
            scene,
            frame,
            out,
        } => {
            let parsed = ScriptParser::parse_json(&script)?;
            let catalog = ScriptParser::catalog(&parsed);
            let visual = preview_scene(&parsed.scenes, &scene, &catalog, settings, frame)?;
            write_preview(&visual, &out)?;
            println!("Preview written to {}", out.display());
        }

        Commands::Export {
            script,
            project,
            audio,
            narrate,
        } => {
            let parsed = ScriptParser::parse_json(&script)?;
            let catalog = ScriptParser::catalog(&parsed);

            let encoder = FfmpegEncoder::new(
                config.export.encoder_binary.clone(),
                Duration::from_secs(config.export.encode_timeout_secs),
            );
            let mut exporter = Exporter::new(&config, Arc::new(encoder))?;
            if narrate {
                // -shortest cuts the video to the audio, so pad narration to the full timeline
                let video_seconds = Timeline::from_scenes(&parsed.scenes, settings.frame_rate)
                    .map(|t| t.duration_seconds())
                    .unwrap_or(0.0);
                let synthesizer = SilentSynthesizer::new().with_min_duration(video_seconds);
                exporter = exporter.with_synthesizer(Arc::new(synthesizer));
            }

            info!("Exporting project '{}' from {}", project, script.display());
            let request = ExportRequest::new(project, parsed.scenes, catalog).with_audio(audio);
            let result = exporter
                .export(&request, &CancellationToken::new())
                .and_then(|job| job.into_result());

            let response = ExportResponse::from(&result);
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Mux { video, audio, out } => {
            let encoder = FfmpegEncoder::new(
                config.export.encoder_binary.clone(),
                Duration::from_secs(config.export.encode_timeout_secs),
            );
            let outcome = encoder.mux_audio(&video, &audio, &out).with_context(|| {
                format!("Failed to mux {} into {}", audio.display(), video.display())
            })?;
            println!(
                "Muxed {} ({} bytes)",
                outcome.output_path.display(),
                outcome.file_size
            );
        }

        Commands::Keyframes {
            kind,
            duration,
            x,
            y,
            end_x,
            end_y,
        } => {
            let interpolator = KeyframeInterpolator::new(settings.frame_rate);
            let end = end_x.zip(end_y).map(|(x, y)| Position::new(x, y));
            let keyframes = interpolator.generate(
                &AnimationKind::from(kind.as_str()),
                duration,
                Position::new(x, y),
                end,
            );
            println!("{}", serde_json::to_string_pretty(&keyframes)?);
        }

        Commands::MouthTrack { text, duration } => {
            let track = mouth_track(&text, duration, settings.frame_rate, settings.viseme);
            println!("{}", serde_json::to_string_pretty(&track)?);
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn write_preview(visual: &storyframe::FrameVisual, out: &Path) -> Result<()> {
    let extension = out
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let bytes = match extension.as_str() {
        "svg" => svg::to_svg(visual).into_bytes(),
        "png" => CpuRasterizer::new().rasterize(visual)?.encode(FrameFormat::Png)?,
        "ppm" => CpuRasterizer::new().rasterize(visual)?.encode(FrameFormat::Ppm)?,
        other => anyhow::bail!("Unsupported preview format '{}' (use svg, png or ppm)", other),
    };

    std::fs::write(out, bytes)
        .with_context(|| format!("Failed to write preview: {}", out.display()))
}
