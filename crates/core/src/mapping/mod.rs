use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::{AudioConfig, ChromatoneError, Result};

/// Linear map from the code points present in a text onto a frequency band.
///
/// The range is recomputed for every input, so the same character can sound
/// different in two runs. When the text holds a single distinct code point
/// the range is degenerate and every character lands on the band midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyMap {
    pub min_code_point: u32,
    pub max_code_point: u32,
    pub min_freq: f64,
    pub max_freq: f64,
}

impl FrequencyMap {
    /// Builds the map from the code point range of `text`.
    pub fn from_text(text: &str, audio: &AudioConfig) -> Result<Self> {
        let mut code_points = text.chars().map(u32::from);
        let first = code_points.next().ok_or(ChromatoneError::EmptyInput)?;
        let (min, max) = code_points.fold((first, first), |(lo, hi), cp| (lo.min(cp), hi.max(cp)));
        Ok(Self::from_range(min, max, audio))
    }

    /// Builds the map from an explicit code point range.
    pub fn from_range(min_code_point: u32, max_code_point: u32, audio: &AudioConfig) -> Self {
        Self {
            min_code_point: min_code_point.min(max_code_point),
            max_code_point: max_code_point.max(min_code_point),
            min_freq: audio.min_freq,
            max_freq: audio.max_freq,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.min_code_point == self.max_code_point
    }

    pub fn frequency_of(&self, ch: char) -> f64 {
        self.frequency_of_code_point(u32::from(ch))
    }

    pub fn frequency_of_code_point(&self, code_point: u32) -> f64 {
        if self.is_degenerate() {
            return (self.min_freq + self.max_freq) * 0.5;
        }
        let clamped = code_point.clamp(self.min_code_point, self.max_code_point);
        let span = f64::from(self.max_code_point - self.min_code_point);
        let position = f64::from(clamped - self.min_code_point) / span;
        self.min_freq + position * (self.max_freq - self.min_freq)
    }

    /// Frequencies for every character of `text`, in order.
    pub fn frequencies(&self, text: &str) -> Vec<f64> {
        text.chars().map(|ch| self.frequency_of(ch)).collect()
    }

    /// Inverse mapping, rounded to the nearest code point in range.
    pub fn code_point_for(&self, frequency: f64) -> u32 {
        if self.is_degenerate() {
            return self.min_code_point;
        }
        let span = f64::from(self.max_code_point - self.min_code_point);
        let position = ((frequency - self.min_freq) / (self.max_freq - self.min_freq)).clamp(0.0, 1.0);
        self.min_code_point + (position * span).round() as u32
    }
}

/// Deterministic swatch colour for a character.
///
/// Each channel lies in `0..=254`. The value depends only on the code point.
pub fn color_for(ch: char) -> Rgb<u8> {
    let hash = splitmix64(u64::from(u32::from(ch)));
    let channel = |shift: u32| ((hash >> shift) & 0xffff) as u16 % 255;
    Rgb([channel(0) as u8, channel(16) as u8, channel(32) as u8])
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio() -> AudioConfig {
        AudioConfig::default()
    }

    #[test]
    fn extremes_map_to_band_edges() {
        let text = "hello, world";
        let map = FrequencyMap::from_text(text, &audio()).unwrap();
        assert_eq!(map.min_code_point, u32::from(' '));
        assert_eq!(map.max_code_point, u32::from('w'));
        assert!((map.frequency_of(' ') - 1_000.0).abs() < 1e-9);
        assert!((map.frequency_of('w') - 3_000.0).abs() < 1e-9);

        let freqs = map.frequencies(text);
        assert_eq!(freqs.len(), text.chars().count());
        assert!(freqs.iter().all(|f| (1_000.0..=3_000.0).contains(f)));
    }

    #[test]
    fn single_code_point_maps_to_midpoint() {
        let map = FrequencyMap::from_text("zzzz", &audio()).unwrap();
        assert!(map.is_degenerate());
        assert_eq!(map.frequency_of('z'), 2_000.0);
        assert_eq!(map.code_point_for(1_234.0), u32::from('z'));
    }

    #[test]
    fn empty_text_is_rejected() {
        let err = FrequencyMap::from_text("", &audio()).unwrap_err();
        assert!(matches!(err, ChromatoneError::EmptyInput));
    }

    #[test]
    fn inverse_recovers_code_points() {
        let map = FrequencyMap::from_text("AZ", &audio()).unwrap();
        for ch in 'A'..='Z' {
            let freq = map.frequency_of(ch);
            assert_eq!(map.code_point_for(freq + 10.0), u32::from(ch));
        }
        assert_eq!(map.code_point_for(0.0), u32::from('A'));
        assert_eq!(map.code_point_for(9_000.0), u32::from('Z'));
    }

    #[test]
    fn colors_are_stable_and_in_range() {
        assert_eq!(color_for('A'), color_for('A'));
        assert_ne!(color_for('A'), color_for('B'));
        for ch in (0u32..2_000).filter_map(char::from_u32) {
            let Rgb(channels) = color_for(ch);
            assert!(channels.iter().all(|c| *c < 255));
        }
    }
}
