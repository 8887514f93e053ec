//! Core library for Chromatone.
//!
//! Text is turned into a sequence of sine tones, one per character, and a
//! matching video in which every character appears as a coloured square. Each
//! module owns one stage of that pipeline (mapping, synthesis, scenes,
//! timeline, recording), and [`pipeline::encode`] strings them together.
//! [`analysis`] goes the other way and recovers text from a tone track.

pub mod analysis;
pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod scene;
pub mod timeline;

pub use analysis::{decode_wav, AnalysisEngine, DecodeSummary, DetectedTone};
pub use assets::{OutputPaths, SourceText};
pub use audio::{AudioBuffer, ToneSynthesizer};
pub use config::{AppConfig, AudioConfig, LegendConfig, VideoConfig};
pub use error::{ChromatoneError, Result};
pub use mapping::{color_for, FrequencyMap};
pub use pipeline::{encode, EncodeJob, EncodeReport, SinkRequest};
pub use record::{FrameSink, NullSink, Recorder, RecordingSettings};
pub use render::{Frame, RenderGraph};
pub use scene::{SceneInstance, SceneKind, TitleCard};
pub use timeline::{Clip, ClipAudio, PlaybackClock, Timeline};
