use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ChromatoneError, RecordingSettings, Result};

/// Top-level configuration structure for the application.
///
/// Every field has a default, so a JSON override file only needs to name
/// the values it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub video: VideoConfig,
    pub legend: LegendConfig,
    pub recording: RecordingSettings,
}

impl AppConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ChromatoneError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => ChromatoneError::Io(err),
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make synthesis or rendering degenerate.
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate must be positive"));
        }
        if !(audio.char_duration > 0.0) {
            return Err(invalid("audio.char_duration must be positive"));
        }
        if !(audio.min_freq > 0.0 && audio.min_freq < audio.max_freq) {
            return Err(invalid("audio.min_freq must be positive and below audio.max_freq"));
        }
        if !(audio.beep_duration > 0.0) {
            return Err(invalid("audio.beep_duration must be positive"));
        }

        let video = &self.video;
        if video.width == 0 || video.height == 0 {
            return Err(invalid("video dimensions must be non-zero"));
        }
        if video.square_size == 0 {
            return Err(invalid("video.square_size must be non-zero"));
        }
        if !(video.title_duration > 0.0) {
            return Err(invalid("video.title_duration must be positive"));
        }

        let legend = &self.legend;
        if legend.square_size == 0 {
            return Err(invalid("legend.square_size must be non-zero"));
        }
        if !(legend.duration > 0.0) {
            return Err(invalid("legend.duration must be positive"));
        }

        if self.recording.fps == 0 {
            return Err(invalid("recording.fps must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ChromatoneError {
    ChromatoneError::InvalidConfig(message.to_string())
}

/// Configuration specific to tone synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Seconds of tone emitted per character.
    pub char_duration: f64,
    pub min_freq: f64,
    pub max_freq: f64,
    pub beep_freq: f64,
    pub beep_amplitude: f32,
    pub beep_duration: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            char_duration: 0.1,
            min_freq: 1_000.0,
            max_freq: 3_000.0,
            beep_freq: 1_000.0,
            beep_amplitude: 0.5,
            beep_duration: 2.0,
        }
    }
}

impl AudioConfig {
    /// Number of samples emitted for a single character.
    pub fn samples_per_char(&self) -> usize {
        (self.sample_rate as f64 * self.char_duration).round() as usize
    }
}

/// Canvas and reveal-animation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    /// Edge length of a revealed character square.
    pub square_size: u32,
    /// Duration of the REPEAT and END title cards.
    pub title_duration: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            square_size: 20,
            title_duration: 2.0,
        }
    }
}

/// Layout of the decoding legend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub square_size: u32,
    pub padding: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub duration: f64,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            square_size: 30,
            padding: 20,
            x_offset: 50,
            y_offset: 50,
            duration: 0.5,
        }
    }
}
