use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    thread::JoinHandle,
};

use serde::{Deserialize, Serialize};

use crate::{ChromatoneError, Frame, Result};

/// Configuration options for the recording subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Explicit `ffmpeg` binary; looked up on `PATH` when unset.
    pub ffmpeg_path: Option<PathBuf>,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    /// Video bitrate in kbit/s. The encoder default is used when unset.
    pub bitrate: Option<u32>,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            fps: 10,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            bitrate: None,
        }
    }
}

/// Destination for rendered frames.
pub trait FrameSink {
    fn push_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flushes outstanding data. No frames may be pushed afterwards.
    fn finish(&mut self) -> Result<()>;
}

/// Pipes raw RGB frames into an `ffmpeg` child process that muxes them with
/// a soundtrack WAV into an MP4 container.
#[derive(Debug)]
pub struct Recorder {
    output: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    frames: usize,
}

impl Recorder {
    /// Locates the encoder binary configured in `settings`.
    pub fn locate_ffmpeg(settings: &RecordingSettings) -> Result<PathBuf> {
        match &settings.ffmpeg_path {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(ChromatoneError::EncoderUnavailable(format!(
                "configured ffmpeg `{}` does not exist",
                path.display()
            ))),
            None => which::which("ffmpeg").map_err(|err| {
                ChromatoneError::EncoderUnavailable(format!("ffmpeg not found on PATH: {err}"))
            }),
        }
    }

    /// Spawns the encoder. Frames must be exactly `width`×`height`.
    pub fn start(
        settings: &RecordingSettings,
        width: u32,
        height: u32,
        soundtrack: &Path,
        output: &Path,
    ) -> Result<Self> {
        let ffmpeg = Self::locate_ffmpeg(settings)?;
        let args = encoder_args(settings, width, height, soundtrack, output);
        tracing::debug!(ffmpeg = %ffmpeg.display(), ?args, "spawning encoder");

        let mut child = Command::new(&ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                ChromatoneError::EncoderUnavailable(format!(
                    "failed to start `{}`: {err}",
                    ffmpeg.display()
                ))
            })?;

        let stdin = child.stdin.take();
        // Drained on a thread so a chatty encoder never blocks on a full pipe.
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut log = String::new();
                let _ = pipe.read_to_string(&mut log);
                log
            })
        });

        Ok(Self {
            output: output.to_path_buf(),
            width,
            height,
            child: Some(child),
            stdin,
            stderr,
            frames: 0,
        })
    }

    fn collect_stderr(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

impl FrameSink for Recorder {
    fn push_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(ChromatoneError::msg(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ChromatoneError::msg("recorder has already finished"))?;
        if let Err(err) = stdin.write_all(frame.as_raw()) {
            // A broken pipe means ffmpeg died; its log says why.
            self.stdin = None;
            let stderr = self.collect_stderr().trim().to_string();
            let status = self
                .child
                .take()
                .and_then(|mut child| child.wait().ok())
                .map(|status| status.to_string())
                .unwrap_or_else(|| err.to_string());
            return Err(ChromatoneError::EncoderFailed { status, stderr });
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait()?;
        let stderr = self.collect_stderr();
        if !status.success() {
            return Err(ChromatoneError::EncoderFailed {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        tracing::info!(output = %self.output.display(), frames = self.frames, "encoder finished");
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Command line for an rgb24 stdin stream plus a WAV soundtrack.
pub fn encoder_args(
    settings: &RecordingSettings,
    width: u32,
    height: u32,
    soundtrack: &Path,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();
    args.push(format!("{width}x{height}"));
    args.extend(["-r".to_string(), settings.fps.to_string()]);
    args.extend(["-i".to_string(), "-".to_string()]);
    args.extend(["-i".to_string(), soundtrack.display().to_string()]);
    args.extend(["-c:v".to_string(), settings.video_codec.clone()]);
    args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
    if let Some(kbps) = settings.bitrate {
        args.extend(["-b:v".to_string(), format!("{kbps}k")]);
    }
    args.extend(["-c:a".to_string(), settings.audio_codec.clone()]);
    args.push("-shortest".to_string());
    args.push(output.display().to_string());
    args
}

/// Sink that only counts frames; useful when no encoder is wanted.
#[derive(Debug, Default)]
pub struct NullSink {
    pub frames: usize,
    pub finished: bool,
}

impl FrameSink for NullSink {
    fn push_frame(&mut self, _frame: &Frame) -> Result<()> {
        if self.finished {
            return Err(ChromatoneError::msg("sink has already finished"));
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
