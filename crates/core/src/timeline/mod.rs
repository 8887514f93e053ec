use serde::{Deserialize, Serialize};

use crate::{audio::seconds_to_samples, AppConfig, AudioBuffer, SceneKind};

/// Which audio plays under a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipAudio {
    /// The per-character tone track.
    Encoded,
    /// The REPEAT cue.
    Beep,
    Silent,
}

/// One segment of the assembled video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub scene: SceneKind,
    pub duration: f64,
    pub audio: ClipAudio,
}

impl Clip {
    pub fn new(scene: SceneKind, duration: f64, audio: ClipAudio) -> Self {
        Self {
            scene,
            duration,
            audio,
        }
    }
}

/// Ordered list of clips making up the final video.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    clips: Vec<Clip>,
}

impl Timeline {
    /// Lays out reveal, optional repeat-and-replay, END and legend.
    ///
    /// `repeat_count` only acts as a gate: any positive value inserts exactly
    /// one REPEAT card plus one replay, and zero or negative values insert
    /// nothing.
    pub fn build(char_count: usize, repeat_count: i64, config: &AppConfig) -> Self {
        let reveal = Clip::new(
            SceneKind::Reveal,
            char_count as f64 * config.audio.char_duration,
            ClipAudio::Encoded,
        );

        let mut clips = vec![reveal.clone()];
        if repeat_count > 0 {
            clips.push(Clip::new(
                SceneKind::Repeat,
                config.video.title_duration,
                ClipAudio::Beep,
            ));
            clips.push(reveal);
        }
        clips.push(Clip::new(
            SceneKind::End,
            config.video.title_duration,
            ClipAudio::Silent,
        ));
        clips.push(Clip::new(
            SceneKind::Legend,
            config.legend.duration,
            ClipAudio::Silent,
        ));

        Self { clips }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn duration(&self) -> f64 {
        self.clips.iter().map(|clip| clip.duration).sum()
    }

    pub fn frame_count(&self, fps: u32) -> usize {
        let clock = PlaybackClock::new(fps);
        self.clips
            .iter()
            .map(|clip| clock.frames_in(clip.duration))
            .sum()
    }

    /// Concatenates per-clip audio into a single track, padding or trimming
    /// each part to its clip length so sound stays aligned with the frames.
    pub fn soundtrack(&self, encoded: &AudioBuffer, beep: &AudioBuffer) -> AudioBuffer {
        let sample_rate = encoded.sample_rate;
        let mut track = AudioBuffer::new(sample_rate);
        for clip in &self.clips {
            let target = seconds_to_samples(clip.duration, sample_rate);
            let source: &[f32] = match clip.audio {
                ClipAudio::Encoded => &encoded.samples,
                ClipAudio::Beep => &beep.samples,
                ClipAudio::Silent => &[],
            };
            let take = source.len().min(target);
            track.samples.extend_from_slice(&source[..take]);
            track.samples.resize(track.samples.len() + (target - take), 0.0);
        }
        track
    }
}

/// Fixed-rate clock converting between frame indices and clip time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    pub fps: u32,
}

impl PlaybackClock {
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    pub fn frames_in(&self, duration: f64) -> usize {
        (duration * f64::from(self.fps)).round().max(0.0) as usize
    }

    pub fn time_of(&self, frame: usize) -> f64 {
        frame as f64 / f64::from(self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioConfig, FrequencyMap, ToneSynthesizer};

    fn config() -> AppConfig {
        AppConfig::default()
    }

    fn scenes(timeline: &Timeline) -> Vec<SceneKind> {
        timeline.clips().iter().map(|clip| clip.scene).collect()
    }

    #[test]
    fn no_repeat_is_reveal_end_legend() {
        let timeline = Timeline::build(2, 0, &config());
        assert_eq!(
            scenes(&timeline),
            vec![SceneKind::Reveal, SceneKind::End, SceneKind::Legend]
        );
        assert!((timeline.duration() - (0.2 + 2.0 + 0.5)).abs() < 1e-9);
    }

    #[test]
    fn repeat_count_magnitude_is_ignored() {
        let once = Timeline::build(2, 1, &config());
        let many = Timeline::build(2, 5, &config());
        assert_eq!(once.clips(), many.clips());
        assert_eq!(
            scenes(&once),
            vec![
                SceneKind::Reveal,
                SceneKind::Repeat,
                SceneKind::Reveal,
                SceneKind::End,
                SceneKind::Legend
            ]
        );
        assert!((once.duration() - 4.9).abs() < 1e-9);
        assert_eq!(once.frame_count(10), 49);

        let negative = Timeline::build(2, -3, &config());
        assert_eq!(negative.clips().len(), 3);
    }

    #[test]
    fn soundtrack_spans_the_whole_video() {
        let config = config();
        let synth = ToneSynthesizer::new(AudioConfig::default());
        let map = FrequencyMap::from_text("AB", &config.audio).unwrap();
        let encoded = synth.synthesize("AB", &map);
        let beep = synth.beep();

        let timeline = Timeline::build(2, 1, &config);
        let track = timeline.soundtrack(&encoded, &beep);
        assert_eq!(track.len(), 8820 + 88_200 + 8820 + 88_200 + 22_050);
        assert_eq!(&track.samples[..8820], &encoded.samples[..]);
        assert_eq!(&track.samples[8820..8820 + 88_200], &beep.samples[..]);
        assert!(track.samples[track.len() - 22_050..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn clock_converts_frames_and_time() {
        let clock = PlaybackClock::new(10);
        assert_eq!(clock.frames_in(0.5), 5);
        assert_eq!(clock.frames_in(2.0), 20);
        assert!((clock.time_of(3) - 0.3).abs() < 1e-12);
    }
}
