use std::{f32::consts::PI, fmt, path::Path, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{AudioBuffer, AudioConfig, ChromatoneError, FrequencyMap, Result};

/// Tone detected in one character-sized slice of audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedTone {
    pub index: usize,
    pub frequency: f64,
    pub code_point: u32,
}

/// Outcome of decoding a tone track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeSummary {
    pub text: String,
    pub tones: Vec<DetectedTone>,
    /// Characters whose code point is not a valid scalar value and were
    /// replaced by U+FFFD.
    pub replaced: usize,
}

/// Recovers text from a tone track by locating the spectral peak of each
/// character slice and inverting the frequency map.
pub struct AnalysisEngine {
    sample_rate: u32,
    samples_per_char: usize,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl AnalysisEngine {
    pub fn new(audio: &AudioConfig) -> Self {
        Self::with_sample_rate(audio.sample_rate, audio.samples_per_char())
    }

    pub fn with_sample_rate(sample_rate: u32, samples_per_char: usize) -> Self {
        Self {
            sample_rate,
            samples_per_char,
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frequency of the strongest component in `samples`, refined by
    /// parabolic interpolation around the peak bin.
    pub fn dominant_frequency(&mut self, samples: &[f32]) -> Result<f64> {
        if samples.len() < 2 {
            return Err(ChromatoneError::msg(
                "frequency analysis requires at least two samples",
            ));
        }

        let len = samples.len();
        let bin_hz = self.sample_rate as f64 / len as f64;
        let fft = self.prepare_fft(len)?;

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)
            .map_err(|err| ChromatoneError::msg(format!("fft failed: {err}")))?;

        let magnitudes: Vec<f32> = fft.spectrum.iter().map(|bin| bin.norm()).collect();
        let (peak, _) = magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .fold((0, 0.0_f32), |best, (i, m)| if *m > best.1 { (i, *m) } else { best });

        if peak == 0 {
            return Ok(0.0);
        }

        let offset = match (magnitudes.get(peak - 1), magnitudes.get(peak + 1)) {
            (Some(&left), Some(&right)) => {
                let denom = left - 2.0 * magnitudes[peak] + right;
                if denom.abs() > f32::EPSILON {
                    (0.5 * (left - right) / denom) as f64
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        Ok((peak as f64 + offset) * bin_hz)
    }

    /// Splits `audio` into character slices and maps each back to a
    /// character. A trailing partial slice is ignored.
    pub fn decode(&mut self, audio: &AudioBuffer, map: &FrequencyMap) -> Result<DecodeSummary> {
        if audio.sample_rate != self.sample_rate {
            return Err(ChromatoneError::msg(format!(
                "audio is {} Hz, decoder expects {} Hz",
                audio.sample_rate, self.sample_rate
            )));
        }
        if self.samples_per_char < 2 {
            return Err(ChromatoneError::msg("character slices are too short to analyse"));
        }

        let mut summary = DecodeSummary::default();
        for (index, slice) in audio.samples.chunks_exact(self.samples_per_char).enumerate() {
            let frequency = self.dominant_frequency(slice)?;
            let code_point = map.code_point_for(frequency);
            match char::from_u32(code_point) {
                Some(ch) => summary.text.push(ch),
                None => {
                    summary.text.push(char::REPLACEMENT_CHARACTER);
                    summary.replaced += 1;
                }
            }
            summary.tones.push(DetectedTone {
                index,
                frequency,
                code_point,
            });
        }
        tracing::debug!(chars = summary.tones.len(), "decoded tone track");
        Ok(summary)
    }

    fn prepare_fft(&mut self, size: usize) -> Result<&mut FftResources> {
        let rebuild = self
            .fft
            .as_ref()
            .map(|fft| fft.size != size)
            .unwrap_or(true);

        if rebuild {
            let plan = self.fft_planner.plan_fft_forward(size);
            let scratch = plan.make_scratch_vec();
            let spectrum = plan.make_output_vec();
            let input = plan.make_input_vec();
            self.fft = Some(FftResources {
                size,
                plan,
                scratch,
                spectrum,
                input,
            });
        }

        self.fft
            .as_mut()
            .ok_or_else(|| ChromatoneError::msg("fft resources are unavailable"))
    }
}

/// Reads an encoded WAV and decodes it against the code point range
/// `min_code_point..=max_code_point`.
pub fn decode_wav(
    path: &Path,
    min_code_point: u32,
    max_code_point: u32,
    audio: &AudioConfig,
) -> Result<DecodeSummary> {
    if !path.exists() {
        return Err(ChromatoneError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let buffer = AudioBuffer::read_wav(path)?;
    let audio = AudioConfig {
        sample_rate: buffer.sample_rate,
        ..audio.clone()
    };
    let map = FrequencyMap::from_range(min_code_point, max_code_point, &audio);
    AnalysisEngine::new(&audio).decode(&buffer, &map)
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("sample_rate", &self.sample_rate)
            .field("samples_per_char", &self.samples_per_char)
            .field("fft", &self.fft)
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audio::sine, ToneSynthesizer};

    fn encode(text: &str) -> (AudioBuffer, FrequencyMap) {
        let audio = AudioConfig::default();
        let map = FrequencyMap::from_text(text, &audio).unwrap();
        (ToneSynthesizer::new(audio).synthesize(text, &map), map)
    }

    #[test]
    fn finds_the_frequency_of_a_pure_tone() {
        let mut engine = AnalysisEngine::new(&AudioConfig::default());
        let tone = sine(1_733.0, 1.0, 4410, 44_100);
        let detected = engine.dominant_frequency(&tone).unwrap();
        assert!((detected - 1_733.0).abs() < 2.0, "detected {detected}");
    }

    #[test]
    fn silence_has_no_dominant_frequency() {
        let mut engine = AnalysisEngine::new(&AudioConfig::default());
        assert_eq!(engine.dominant_frequency(&[0.0; 512]).unwrap(), 0.0);
        assert!(engine.dominant_frequency(&[0.0]).is_err());
    }

    #[test]
    fn decodes_synthesized_text() {
        let text = "Hello, tones!";
        let (buffer, map) = encode(text);
        let mut engine = AnalysisEngine::new(&AudioConfig::default());
        let summary = engine.decode(&buffer, &map).unwrap();

        assert_eq!(summary.text, text);
        assert_eq!(summary.tones.len(), text.len());
        assert_eq!(summary.replaced, 0);
    }

    #[test]
    fn decodes_a_wav_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ab-enc.wav");
        let (buffer, map) = encode("AB");
        buffer.write_wav(&path).unwrap();

        let summary = decode_wav(
            &path,
            map.min_code_point,
            map.max_code_point,
            &AudioConfig::default(),
        )
        .unwrap();
        assert_eq!(summary.text, "AB");
    }

    #[test]
    fn missing_wav_is_reported_by_name() {
        let err = decode_wav(Path::new("gone-enc.wav"), 65, 90, &AudioConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("gone-enc.wav"));
    }
}
