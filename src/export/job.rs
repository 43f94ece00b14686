use crate::config::FrameRate;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Export job lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportState {
    Pending,
    RenderingFrames,
    Encoding,
    Done,
    Failed(String),
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Done | ExportState::Failed(_))
    }

    fn can_advance_to(&self, next: &ExportState) -> bool {
        match (self, next) {
            (from, ExportState::Failed(_)) => !from.is_terminal(),
            (ExportState::Pending, ExportState::RenderingFrames)
            | (ExportState::RenderingFrames, ExportState::Encoding)
            | (ExportState::Encoding, ExportState::Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportState::Pending => write!(f, "PENDING"),
            ExportState::RenderingFrames => write!(f, "RENDERING_FRAMES"),
            ExportState::Encoding => write!(f, "ENCODING"),
            ExportState::Done => write!(f, "DONE"),
            ExportState::Failed(reason) => write!(f, "FAILED({reason})"),
        }
    }
}

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub output_path: PathBuf,
    pub file_size: u64,
    pub total_frames: u64,
    pub frame_rate: FrameRate,
    /// Frames that went through the rasterizer
    pub frames_rasterized: u64,
    /// Frames served from the digest cache
    pub frames_reused: u64,
    pub audio_reference: Option<PathBuf>,
}

/// One export invocation and its state history
#[derive(Debug)]
pub struct ExportJob {
    project_id: String,
    state: ExportState,
    history: Vec<ExportState>,
    staging_directory: PathBuf,
    output_path: PathBuf,
    audio_reference: Option<PathBuf>,
    report: Option<ExportReport>,
    error: Option<Error>,
}

impl ExportJob {
    pub fn new(
        project_id: impl Into<String>,
        staging_directory: PathBuf,
        output_path: PathBuf,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            state: ExportState::Pending,
            history: vec![ExportState::Pending],
            staging_directory,
            output_path,
            audio_reference: None,
            report: None,
            error: None,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    /// Every state the job has been in, oldest first
    pub fn history(&self) -> &[ExportState] {
        &self.history
    }

    pub fn staging_directory(&self) -> &PathBuf {
        &self.staging_directory
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    pub fn audio_reference(&self) -> Option<&PathBuf> {
        self.audio_reference.as_ref()
    }

    pub(crate) fn set_audio_reference(&mut self, audio: Option<PathBuf>) {
        self.audio_reference = audio;
    }

    pub fn report(&self) -> Option<&ExportReport> {
        self.report.as_ref()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub(crate) fn advance(&mut self, next: ExportState) -> Result<()> {
        if !self.state.can_advance_to(&next) {
            return Err(Error::validation(format!(
                "export job '{}' cannot move from {} to {}",
                self.project_id, self.state, next
            )));
        }
        info!("Export '{}': {} -> {}", self.project_id, self.state, next);
        self.state = next.clone();
        self.history.push(next);
        Ok(())
    }

    pub(crate) fn complete(&mut self, report: ExportReport) -> Result<()> {
        self.advance(ExportState::Done)?;
        self.report = Some(report);
        Ok(())
    }

    pub(crate) fn fail(&mut self, error: Error) {
        let reason = error.failure_reason();
        if self.advance(ExportState::Failed(reason)).is_err() {
            warn!("Export '{}' already finished; dropping error: {}", self.project_id, error);
            return;
        }
        self.error = Some(error);
    }

    /// Convert the finished job into its outcome
    pub fn into_result(self) -> Result<ExportReport> {
        match (self.report, self.error) {
            (Some(report), None) => Ok(report),
            (_, Some(error)) => Err(error),
            (None, None) => Err(Error::validation(format!(
                "export job '{}' has not finished ({})",
                self.project_id, self.state
            ))),
        }
    }
}

/// Cooperative cancellation flag shared between the caller and a running export
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncodeError;

    fn job() -> ExportJob {
        ExportJob::new("demo", PathBuf::from("frames/demo"), PathBuf::from("videos/demo.mp4"))
    }

    fn report() -> ExportReport {
        ExportReport {
            output_path: PathBuf::from("videos/demo.mp4"),
            file_size: 1024,
            total_frames: 60,
            frame_rate: FrameRate::DEFAULT,
            frames_rasterized: 40,
            frames_reused: 20,
            audio_reference: None,
        }
    }

    #[test]
    fn test_happy_path() {
        let mut job = job();
        assert_eq!(job.state(), &ExportState::Pending);
        job.advance(ExportState::RenderingFrames).unwrap();
        job.advance(ExportState::Encoding).unwrap();
        job.complete(report()).unwrap();

        assert_eq!(
            job.history(),
            &[
                ExportState::Pending,
                ExportState::RenderingFrames,
                ExportState::Encoding,
                ExportState::Done
            ]
        );
        assert_eq!(job.into_result().unwrap().total_frames, 60);
    }

    #[test]
    fn test_skipping_a_state_is_rejected() {
        let mut job = job();
        assert!(job.advance(ExportState::Encoding).is_err());
        assert!(job.advance(ExportState::Done).is_err());
        assert_eq!(job.state(), &ExportState::Pending);
    }

    #[test]
    fn test_fail_from_any_live_state() {
        for steps in 0..3 {
            let mut job = job();
            let path = [ExportState::RenderingFrames, ExportState::Encoding];
            for next in path.iter().take(steps) {
                job.advance(next.clone()).unwrap();
            }
            job.fail(EncodeError::NotInstalled.into());
            assert_eq!(job.state(), &ExportState::Failed("encoder not installed".into()));
            assert!(matches!(
                job.into_result(),
                Err(Error::Encoding(EncodeError::NotInstalled))
            ));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = job();
        job.fail(Error::Cancelled);
        job.fail(Error::PartialRender {
            expected: 2,
            rendered: 1,
        });
        assert_eq!(job.state(), &ExportState::Failed("cancelled".into()));
        assert!(job.advance(ExportState::RenderingFrames).is_err());
        assert_eq!(job.state().to_string(), "FAILED(cancelled)");
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
