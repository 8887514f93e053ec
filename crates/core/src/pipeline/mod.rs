//! End-to-end encoding of one text file into WAV tracks and a video.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    record::FrameSink, AppConfig, FrequencyMap, OutputPaths, RecordingSettings, RenderGraph,
    Result, SceneInstance, SourceText, Timeline, ToneSynthesizer,
};

/// Everything needed to encode one input.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub input: PathBuf,
    pub repeat_count: i64,
    pub output_dir: PathBuf,
    pub config: AppConfig,
}

impl EncodeJob {
    pub fn new(input: impl Into<PathBuf>, repeat_count: i64) -> Self {
        Self {
            input: input.into(),
            repeat_count,
            output_dir: PathBuf::from("."),
            config: AppConfig::default(),
        }
    }
}

/// What an encode run produced.
#[derive(Debug, Clone, Serialize)]
pub struct EncodeReport {
    pub characters: usize,
    pub unique_characters: usize,
    pub legend_entries: usize,
    pub frequency_map: FrequencyMap,
    pub encoded_wav: PathBuf,
    pub encoded_samples: usize,
    pub beep_wav: PathBuf,
    pub video: PathBuf,
    pub duration_seconds: f64,
    pub frames: usize,
}

/// Inputs handed to the sink factory once the soundtrack exists.
#[derive(Debug)]
pub struct SinkRequest<'a> {
    pub settings: &'a RecordingSettings,
    pub width: u32,
    pub height: u32,
    pub soundtrack: &'a Path,
    pub output: &'a Path,
}

/// Runs the whole pipeline. `open_sink` receives the assembled soundtrack and
/// the target path, and returns where frames should go.
pub fn encode<S, F>(job: &EncodeJob, open_sink: F) -> Result<EncodeReport>
where
    S: FrameSink,
    F: FnOnce(&SinkRequest<'_>) -> Result<S>,
{
    let config = &job.config;
    config.validate()?;

    let source = SourceText::load(&job.input)?;
    let paths = OutputPaths::for_input(&job.input, &job.output_dir);
    let characters = source.char_count();
    tracing::info!(input = %job.input.display(), characters, "loaded input text");

    let map = FrequencyMap::from_text(&source.text, &config.audio)?;
    tracing::info!(
        min = map.min_code_point,
        max = map.max_code_point,
        "mapped code points onto {}-{} Hz",
        map.min_freq,
        map.max_freq
    );
    if map.is_degenerate() {
        tracing::warn!("input has a single distinct character; every tone sits at the band midpoint");
    }

    let synth = ToneSynthesizer::new(config.audio.clone());
    let encoded = synth.synthesize(&source.text, &map);
    encoded.write_wav(&paths.encoded_wav)?;
    tracing::info!(path = %paths.encoded_wav.display(), "encoded audio saved");

    let beep = synth.beep();
    beep.write_wav(&paths.beep_wav)?;
    tracing::info!(path = %paths.beep_wav.display(), "repeat cue saved");

    let timeline = Timeline::build(characters, job.repeat_count, config);
    let scene = SceneInstance::new(&source.text, config);
    let dropped = scene.unique_chars().len() - scene.legend_entries().len();
    if dropped > 0 {
        tracing::warn!(
            dropped,
            capacity = scene.legend_capacity(),
            "legend is full; remaining characters are not shown"
        );
    }

    let soundtrack = timeline.soundtrack(&encoded, &beep);
    let soundtrack_file = tempfile::Builder::new()
        .prefix(&format!("{}-soundtrack", paths.stem))
        .suffix(".wav")
        .tempfile()?;
    soundtrack.write_wav(soundtrack_file.path())?;

    let request = SinkRequest {
        settings: &config.recording,
        width: config.video.width,
        height: config.video.height,
        soundtrack: soundtrack_file.path(),
        output: &paths.video,
    };
    let mut sink = open_sink(&request)?;

    let graph = RenderGraph::new(&scene, &timeline, config.recording.fps);
    let outcome = graph
        .draw(&mut sink)
        .and_then(|frames| sink.finish().map(|()| frames));
    let frames = match outcome {
        Ok(frames) => frames,
        Err(err) => {
            // The encoder is stopped before its half-written output is removed.
            drop(sink);
            discard_partial_video(&paths.video);
            return Err(err);
        }
    };
    tracing::info!(path = %paths.video.display(), frames, "video assembled");

    Ok(EncodeReport {
        characters,
        unique_characters: scene.unique_chars().len(),
        legend_entries: scene.legend_entries().len(),
        frequency_map: map,
        encoded_wav: paths.encoded_wav,
        encoded_samples: encoded.len(),
        beep_wav: paths.beep_wav,
        video: paths.video,
        duration_seconds: frames as f64 / f64::from(config.recording.fps),
        frames,
    })
}

fn discard_partial_video(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::warn!(path = %path.display(), "removed incomplete video"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not remove incomplete video")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{color_for, record::NullSink, ChromatoneError, Frame, SceneKind};

    /// Keeps the most recent frame.
    struct CaptureSink<'a> {
        last: &'a mut Option<Frame>,
    }

    impl FrameSink for CaptureSink<'_> {
        fn push_frame(&mut self, frame: &Frame) -> Result<()> {
            *self.last = Some(frame.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn job_for(dir: &Path, name: &str, text: &str, repeat_count: i64) -> EncodeJob {
        let input = dir.join(name);
        std::fs::write(&input, text).unwrap();
        EncodeJob {
            output_dir: dir.to_path_buf(),
            ..EncodeJob::new(input, repeat_count)
        }
    }

    #[test]
    fn encodes_ab_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_for(dir.path(), "ab.txt", "AB", 1);

        let mut last = None;
        let mut soundtrack_len = 0;
        let (last_slot, len_slot) = (&mut last, &mut soundtrack_len);
        let expected_output = dir.path().join("ab-video.mp4");
        let report = encode(&job, move |request| {
            assert_eq!((request.width, request.height), (1280, 720));
            assert_eq!(request.output, expected_output.as_path());
            *len_slot = hound::WavReader::open(request.soundtrack).unwrap().len();
            Ok(CaptureSink { last: last_slot })
        })
        .unwrap();

        assert_eq!(report.characters, 2);
        assert_eq!(report.encoded_samples, 8820);
        assert!((report.duration_seconds - 4.9).abs() < 1e-9);
        assert_eq!(report.frames, 49);
        assert_eq!(soundtrack_len, 8820 + 88_200 + 8820 + 88_200 + 22_050);
        assert_eq!(report.legend_entries, 2);
        assert!(last.is_some());

        let enc = hound::WavReader::open(dir.path().join("ab-enc.wav")).unwrap();
        assert_eq!(enc.len(), 8820);
        let beep = hound::WavReader::open(dir.path().join("ab-beep.wav")).unwrap();
        assert_eq!(beep.len(), 88_200);
    }

    #[test]
    fn legend_frame_closes_the_video() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_for(dir.path(), "abba.txt", "ABBA", 0);

        let mut last = None;
        let last_slot = &mut last;
        let report = encode(&job, move |_| Ok(CaptureSink { last: last_slot }))
        .unwrap();
        assert!((report.duration_seconds - (0.4 + 2.0 + 0.5)).abs() < 1e-9);
        assert_eq!(report.unique_characters, 2);

        let scene = SceneInstance::new("ABBA", &job.config);
        let legend = last.unwrap();
        assert_eq!(legend, scene.render(SceneKind::Legend, 0.0));

        let swatches: HashSet<_> = (0..report.legend_entries)
            .map(|index| {
                let (x, y) = scene.legend_cell(index);
                *legend.get_pixel(x + 1, y + 1)
            })
            .collect();
        assert_eq!(swatches, HashSet::from([color_for('A'), color_for('B')]));
    }

    #[test]
    fn missing_input_fails_before_writing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let job = EncodeJob {
            output_dir: dir.path().to_path_buf(),
            ..EncodeJob::new(dir.path().join("absent.txt"), 1)
        };

        let err = encode(&job, |_| Ok(NullSink::default())).unwrap_err();
        assert!(matches!(err, ChromatoneError::InputNotFound { .. }));
        assert!(err.to_string().contains("absent.txt"));
        assert!(!dir.path().join("absent-enc.wav").exists());
    }

    #[test]
    fn sink_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_for(dir.path(), "x.txt", "xyz", 0);

        let err = encode(&job, |_| -> Result<NullSink> {
            Err(ChromatoneError::EncoderUnavailable("no ffmpeg".into()))
        })
        .unwrap_err();
        assert!(matches!(err, ChromatoneError::EncoderUnavailable(_)));
        // Audio artifacts are written before the encoder is needed.
        assert!(dir.path().join("x-enc.wav").exists());
    }

    /// Writes a stub output file, then fails after a few frames.
    struct FailingSink {
        remaining: usize,
    }

    impl FrameSink for FailingSink {
        fn push_frame(&mut self, _frame: &Frame) -> Result<()> {
            if self.remaining == 0 {
                return Err(ChromatoneError::msg("encoder went away"));
            }
            self.remaining -= 1;
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_render_removes_the_partial_video() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_for(dir.path(), "ab.txt", "AB", 1);
        let video = dir.path().join("ab-video.mp4");

        let err = encode(&job, |request| {
            std::fs::write(request.output, b"truncated").unwrap();
            Ok(FailingSink { remaining: 3 })
        })
        .unwrap_err();

        assert!(err.to_string().contains("encoder went away"));
        assert!(!video.exists());
        assert!(dir.path().join("ab-enc.wav").exists());
    }
}
