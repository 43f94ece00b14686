use crate::config::{ExportConfig, FrameFormat};
use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Minimum digits in a frame file name
pub const MIN_FRAME_DIGITS: usize = 7;

const OUTPUT_EXTENSION: &str = "mp4";

fn project_id_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("project id pattern"))
}

/// Reject identifiers that could escape the staging or output roots
pub fn validate_project_id(project_id: &str) -> Result<&str> {
    if project_id_regex().is_match(project_id) {
        Ok(project_id)
    } else {
        Err(Error::validation(format!(
            "invalid project id '{}': use 1-128 letters, digits, '-' or '_'",
            project_id.escape_default()
        )))
    }
}

/// Zero-padding width for `total_frames` frames
pub fn frame_digits(total_frames: u64) -> usize {
    let last = total_frames.saturating_sub(1);
    let digits = last.checked_ilog10().map_or(1, |d| d as usize + 1);
    digits.max(MIN_FRAME_DIGITS)
}

pub fn frame_file_name(global_frame_index: u64, digits: usize, format: FrameFormat) -> String {
    format!(
        "frame_{:0width$}.{}",
        global_frame_index,
        format.extension(),
        width = digits
    )
}

/// printf-style pattern matching [`frame_file_name`]
pub fn frame_pattern(digits: usize, format: FrameFormat) -> String {
    format!("frame_%0{}d.{}", digits, format.extension())
}

/// Per-project paths under the configured roots
#[derive(Debug, Clone)]
pub struct StagingLayout {
    staging_root: PathBuf,
    output_root: PathBuf,
}

impl StagingLayout {
    pub fn new(staging_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
            output_root: output_root.into(),
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(&config.staging_root, &config.output_root)
    }

    pub fn staging_dir(&self, project_id: &str) -> Result<PathBuf> {
        Ok(self.staging_root.join(validate_project_id(project_id)?))
    }

    pub fn output_path(&self, project_id: &str) -> Result<PathBuf> {
        let id = validate_project_id(project_id)?;
        Ok(self.output_root.join(format!("{id}.{OUTPUT_EXTENSION}")))
    }

    /// Synthesized narration lives beside the video so it outlives staging
    pub fn narration_path(&self, project_id: &str) -> Result<PathBuf> {
        let id = validate_project_id(project_id)?;
        Ok(self.output_root.join(format!("{id}.narration.wav")))
    }
}

/// Start from an empty staging directory, dropping frames from earlier runs
pub fn prepare(dir: &Path) -> Result<()> {
    remove_dir(dir)?;
    fs::create_dir_all(dir)?;
    Ok(())
}

pub fn remove_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!("Removed {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_validation() {
        for ok in ["demo", "project_42", "a-b-c", "X"] {
            assert!(validate_project_id(ok).is_ok(), "{ok}");
        }
        let too_long = "a".repeat(129);
        let bad_ids = [
            "",
            "..",
            "../etc",
            "a/b",
            "a\\b",
            "name with space",
            "ünïcode",
            too_long.as_str(),
        ];
        for bad in bad_ids {
            let err = validate_project_id(bad).unwrap_err();
            assert_eq!(err.kind(), "InputValidationError", "{bad}");
        }
    }

    #[test]
    fn test_layout_paths() {
        let layout = StagingLayout::new("/tmp/frames", "/tmp/videos");
        assert_eq!(layout.staging_dir("demo").unwrap(), PathBuf::from("/tmp/frames/demo"));
        assert_eq!(
            layout.output_path("demo").unwrap(),
            PathBuf::from("/tmp/videos/demo.mp4")
        );
        assert_eq!(
            layout.narration_path("demo").unwrap(),
            PathBuf::from("/tmp/videos/demo.narration.wav")
        );
        assert!(layout.output_path("../demo").is_err());
        assert!(layout.narration_path("../demo").is_err());
    }

    #[test]
    fn test_frame_names() {
        assert_eq!(frame_digits(0), 7);
        assert_eq!(frame_digits(60), 7);
        assert_eq!(frame_digits(10_000_000), 7);
        assert_eq!(frame_digits(10_000_001), 8);
        assert_eq!(frame_file_name(42, 7, FrameFormat::Png), "frame_0000042.png");
        assert_eq!(frame_pattern(7, FrameFormat::Ppm), "frame_%07d.ppm");
    }

    #[test]
    fn test_lexicographic_order_matches_frame_order() {
        let total = 1_000_000u64;
        let digits = frame_digits(total);
        let mut names: Vec<String> = (0..total)
            .map(|i| frame_file_name(i, digits, FrameFormat::Png))
            .collect();
        let numeric = names.clone();
        names.sort();
        assert_eq!(names, numeric);
    }

    #[test]
    fn test_prepare_clears_previous_frames() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("demo");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("frame_9999999.png"), b"stale").unwrap();

        prepare(&staging).unwrap();
        assert!(staging.is_dir());
        assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);

        remove_dir(&staging).unwrap();
        assert!(!staging.exists());
        remove_dir(&staging).unwrap();
    }
}
