use crate::config::FrameRate;
use crate::error::EncodeError;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Everything the encoder needs to assemble one video
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub frame_dir: PathBuf,
    /// printf-style frame file name pattern inside `frame_dir`
    pub frame_pattern: String,
    pub frame_rate: FrameRate,
    pub width: u32,
    pub height: u32,
    pub audio: Option<PathBuf>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutcome {
    pub output_path: PathBuf,
    pub file_size: u64,
}

/// Video encoding collaborator
pub trait VideoEncoder: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Assemble the frames into `request.output_path`, replacing any previous file
    fn encode(&self, request: &EncodeRequest) -> Result<EncodeOutcome, EncodeError>;

    /// Replace the audio of an existing video, copying the video stream as is
    fn mux_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
    ) -> Result<EncodeOutcome, EncodeError>;
}

/// Encodes through an external `ffmpeg` process
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: String,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    fn command(&self, request: &EncodeRequest, partial: &Path) -> Command {
        let mut cmd = self.base_command();
        cmd.arg("-y") // Overwrite output
            .args(["-loglevel", "error"])
            .args(["-f", "image2"])
            .arg("-framerate")
            .arg(request.frame_rate.fps().to_string())
            .arg("-i")
            .arg(request.frame_dir.join(&request.frame_pattern));

        if let Some(audio) = &request.audio {
            cmd.arg("-i").arg(audio);
        }

        cmd.args(["-c:v", "libx264"])
            .args(["-pix_fmt", "yuv420p"]) // Pixel format for compatibility
            .arg("-s")
            .arg(format!("{}x{}", request.width, request.height));

        if request.audio.is_some() {
            cmd.args(["-c:a", "aac"])
                .arg("-shortest"); // Finish when shortest stream ends
        }

        cmd.args(["-movflags", "+faststart"]).arg(partial);
        cmd
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, EncodeError> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if started.elapsed() >= self.timeout {
                warn!("Encoder exceeded {:?}, killing it", self.timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(EncodeError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn mux_command(&self, video: &Path, audio: &Path, partial: &Path) -> Command {
        let mut cmd = self.base_command();
        cmd.arg("-y")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-map", "0:v:0", "-map", "1:a:0"])
            .args(["-c:v", "copy"])
            .args(["-c:a", "aac"])
            .arg("-shortest")
            .arg(partial);
        cmd
    }

    /// Run `cmd` writing into `partial`, then move the result over `output`
    fn run(
        &self,
        mut cmd: Command,
        partial: PartialOutput,
        output: &Path,
    ) -> Result<EncodeOutcome, EncodeError> {
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(EncodeError::NotInstalled),
            Err(e) => return Err(e.into()),
        };

        // Drain stderr concurrently so a chatty encoder cannot block on a full pipe
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        // on timeout the drain thread is left detached
        let status = self.wait(&mut child)?;
        let diagnostic = stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let diagnostic = diagnostic.trim();
            let code = status.code().unwrap_or(-1);
            return Err(EncodeError::Failed {
                status: code,
                diagnostic: if diagnostic.is_empty() {
                    format!("encoder exited with status {code}")
                } else {
                    diagnostic.to_string()
                },
            });
        }

        let file_size = partial.persist(output)?;
        debug!("Wrote {} bytes to {}", file_size, output.display());
        Ok(EncodeOutcome {
            output_path: output.to_path_buf(),
            file_size,
        })
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        &self.binary
    }

    /// Check that the encoder binary launches and answers `-version` within the timeout
    fn is_available(&self) -> bool {
        let spawned = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                debug!("Encoder '{}' cannot be launched: {}", self.binary, e);
                return false;
            }
        };
        match self.wait(&mut child) {
            Ok(_) => true,
            Err(e) => {
                warn!("Encoder '{}' did not answer -version: {}", self.binary, e);
                false
            }
        }
    }

    fn encode(&self, request: &EncodeRequest) -> Result<EncodeOutcome, EncodeError> {
        if let Some(parent) = request.output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = PartialOutput::for_output(&request.output_path);

        info!("Encoding video to {}...", request.output_path.display());
        let cmd = self.command(request, partial.path());
        self.run(cmd, partial, &request.output_path)
    }

    fn mux_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
    ) -> Result<EncodeOutcome, EncodeError> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = PartialOutput::for_output(output);

        info!("Merging {} onto {}...", audio.display(), video.display());
        let cmd = self.mux_command(video, audio, partial.path());
        self.run(cmd, partial, output)
    }
}

/// Sibling file the encoder writes into; removed on drop unless persisted
#[derive(Debug)]
pub struct PartialOutput {
    path: PathBuf,
    persisted: bool,
}

impl PartialOutput {
    /// `videos/demo.mp4` is staged as `videos/demo.partial.mp4`
    pub fn for_output(output: &Path) -> Self {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let name = match output.extension() {
            Some(ext) => format!("{}.partial.{}", stem, ext.to_string_lossy()),
            None => format!("{stem}.partial"),
        };
        Self {
            path: output.with_file_name(name),
            persisted: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the finished file over `output` and return its size
    pub fn persist(mut self, output: &Path) -> std::io::Result<u64> {
        fs::rename(&self.path, output)?;
        self.persisted = true;
        Ok(fs::metadata(output)?.len())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = fs::remove_file(&self.path);
        }
    }
}
