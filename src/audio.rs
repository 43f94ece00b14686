use crate::config::FrameRate;
use crate::error::Result;
use anyhow::Context;
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Average narration speaking rate
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// Duration assumed for audio that cannot be read
pub const FALLBACK_AUDIO_DURATION: f64 = 4.0;

/// Duration of an audio file in seconds.
///
/// WAV files are read through their header; other formats are sniffed by symphonia and, when
/// the container does not record a frame count, decoded to count frames.
pub fn read_duration(path: &Path) -> anyhow::Result<f64> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        let reader = hound::WavReader::open(path).context("Failed to open WAV file")?;
        let spec = reader.spec();
        return Ok(reader.duration() as f64 / spec.sample_rate as f64);
    }

    let src = File::open(path).context("Failed to open audio file")?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let sniffed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .context("Unsupported audio format")?;

    let mut format = sniffed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No supported audio track found")?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Audio track has no sample rate")? as f64;
    if let Some(n_frames) = track.codec_params.n_frames {
        return Ok(n_frames as f64 / sample_rate);
    }

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .context("Unsupported codec")?;
    let track_id = track.id;

    let mut frames: u64 = 0;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => frames += decoded.frames() as u64,
            Err(e) => {
                debug!("Stopping duration scan at undecodable packet: {}", e);
                break;
            }
        }
    }

    Ok(frames as f64 / sample_rate)
}

/// Measured duration, or [`FALLBACK_AUDIO_DURATION`] when the file is unreadable
pub fn duration_or_fallback(path: &Path) -> f64 {
    match read_duration(path) {
        Ok(duration) => duration,
        Err(e) => {
            warn!("Could not read duration of {}: {:#}", path.display(), e);
            FALLBACK_AUDIO_DURATION
        }
    }
}

/// Estimated time to speak `text`, in seconds
pub fn estimate_duration(text: &str) -> f64 {
    text.split_whitespace().count() as f64 / WORDS_PER_MINUTE * 60.0
}

/// Playback length of `frame_count` frames
pub fn estimate_video_duration(frame_count: u64, frame_rate: FrameRate) -> f64 {
    frame_rate.frame_to_time(frame_count)
}

/// Pick the audio track for an export.
///
/// Only the first asset that exists on disk is attached; any others are
/// ignored.
pub fn select_audio(assets: &[PathBuf]) -> Option<PathBuf> {
    let mut existing = assets.iter().filter(|p| p.is_file());
    let chosen = existing.next()?.clone();
    let ignored = existing.count();
    if ignored > 0 {
        info!(
            "Attaching {} and ignoring {} other audio asset(s)",
            chosen.display(),
            ignored
        );
    }
    Some(chosen)
}

/// Narration audio produced by a [`SpeechSynthesizer`]
#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub audio_path: PathBuf,
    pub duration_seconds: f64,
}

/// Text-to-speech collaborator
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into an audio file at `output`
    fn synthesize(&self, text: &str, output: &Path) -> Result<Narration>;
}

/// Writes silence lasting as long as the narration would take to speak
#[derive(Debug, Clone, Copy)]
pub struct SilentSynthesizer {
    sample_rate: u32,
    min_duration: f64,
}

impl SilentSynthesizer {
    pub fn new() -> Self {
        Self {
            sample_rate: 22_050,
            min_duration: 0.0,
        }
    }

    /// Pad the generated track to at least `seconds`
    pub fn with_min_duration(mut self, seconds: f64) -> Self {
        self.min_duration = seconds.max(0.0);
        self
    }
}

impl Default for SilentSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for SilentSynthesizer {
    fn synthesize(&self, text: &str, output: &Path) -> Result<Narration> {
        let duration = estimate_duration(text).max(self.min_duration);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let samples = (duration * self.sample_rate as f64).round() as u32;
        let mut writer = hound::WavWriter::create(output, spec)?;
        {
            let mut i16_writer = writer.get_i16_writer(samples);
            for _ in 0..samples {
                i16_writer.write_sample(0);
            }
            i16_writer.flush()?;
        }
        writer.finalize()?;

        debug!("Wrote {:.2}s of silence to {}", duration, output.display());
        Ok(Narration {
            audio_path: output.to_path_buf(),
            duration_seconds: samples as f64 / self.sample_rate as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_duration() {
        assert_eq!(estimate_duration(""), 0.0);
        // 150 words per minute -> 0.4s per word
        assert!((estimate_duration("once upon a time") - 1.6).abs() < 1e-9);
        assert!((estimate_video_duration(90, FrameRate::DEFAULT) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_silent_synthesizer_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narration.wav");
        let narration = SilentSynthesizer::new()
            .synthesize("one two three four five", &path)
            .unwrap();

        assert_eq!(narration.audio_path, path);
        assert!((narration.duration_seconds - 2.0).abs() < 1e-3);
        assert!((read_duration(&path).unwrap() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_min_duration_padding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pad.wav");
        let narration = SilentSynthesizer::new()
            .with_min_duration(5.0)
            .synthesize("hi", &path)
            .unwrap();
        assert!((narration.duration_seconds - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_unreadable_audio_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"not a wav").unwrap();
        assert!(read_duration(&path).is_err());
        assert_eq!(duration_or_fallback(&path), FALLBACK_AUDIO_DURATION);
    }

    #[test]
    fn test_select_first_existing_audio() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.wav");
        let second = dir.path().join("b.wav");
        std::fs::write(&first, b"").unwrap();
        std::fs::write(&second, b"").unwrap();

        let assets = vec![dir.path().join("missing.wav"), first.clone(), second];
        assert_eq!(select_audio(&assets), Some(first));
        assert_eq!(select_audio(&[dir.path().join("missing.wav")]), None);
        assert_eq!(select_audio(&[]), None);
    }
}
