use std::{f64::consts::TAU, path::Path};

use crate::{AudioConfig, FrequencyMap, Result};

/// Mono block of 32-bit float samples at a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Writes the buffer as a mono 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        tracing::debug!(path = %path.display(), samples = self.samples.len(), "wrote wav");
        Ok(())
    }

    /// Reads a mono float or integer WAV file back into memory.
    pub fn read_wav(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self {
            sample_rate: spec.sample_rate,
            samples,
        })
    }
}

/// `sample_count` samples of a sine wave starting at phase zero.
pub fn sine(frequency: f64, amplitude: f32, sample_count: usize, sample_rate: u32) -> Vec<f32> {
    let rate = f64::from(sample_rate);
    (0..sample_count)
        .map(|n| amplitude * (TAU * frequency * n as f64 / rate).sin() as f32)
        .collect()
}

/// Turns text into a sequence of per-character tone bursts.
#[derive(Debug, Clone)]
pub struct ToneSynthesizer {
    config: AudioConfig,
}

impl ToneSynthesizer {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// One tone per character, each restarting at phase zero, so the joins
    /// between characters are audibly discontinuous.
    pub fn synthesize(&self, text: &str, map: &FrequencyMap) -> AudioBuffer {
        let per_char = self.config.samples_per_char();
        let mut buffer = AudioBuffer::new(self.config.sample_rate);
        buffer.samples.reserve(per_char * text.chars().count());
        for frequency in map.frequencies(text) {
            buffer
                .samples
                .extend(sine(frequency, 1.0, per_char, self.config.sample_rate));
        }
        buffer
    }

    /// The fixed cue played under the REPEAT card.
    pub fn beep(&self) -> AudioBuffer {
        let count = seconds_to_samples(self.config.beep_duration, self.config.sample_rate);
        AudioBuffer {
            sample_rate: self.config.sample_rate,
            samples: sine(
                self.config.beep_freq,
                self.config.beep_amplitude,
                count,
                self.config.sample_rate,
            ),
        }
    }

    pub fn silence(&self, duration: f64) -> AudioBuffer {
        AudioBuffer {
            sample_rate: self.config.sample_rate,
            samples: vec![0.0; seconds_to_samples(duration, self.config.sample_rate)],
        }
    }
}

pub(crate) fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds * f64::from(sample_rate)).round() as usize
}
