use std::path::{Path, PathBuf};

use crate::{ChromatoneError, Result};

/// Text loaded from disk and ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub path: PathBuf,
    pub text: String,
}

impl SourceText {
    /// Reads `path` as UTF-8. Windows line endings collapse to `\n`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ChromatoneError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => ChromatoneError::Io(err),
        })?;
        let text = String::from_utf8(bytes).map_err(|_| ChromatoneError::InvalidText {
            path: path.to_path_buf(),
        })?;
        Self::from_text(path, text)
    }

    pub fn from_text(path: &Path, text: String) -> Result<Self> {
        // Universal newlines: CRLF first, then any lone CR.
        let text = if text.contains('\r') {
            text.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            text
        };
        if text.is_empty() {
            return Err(ChromatoneError::EmptyInput);
        }
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// File names of every artifact produced for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub stem: String,
    pub encoded_wav: PathBuf,
    pub beep_wav: PathBuf,
    pub video: PathBuf,
}

impl OutputPaths {
    /// Derives `<stem>-enc.wav`, `<stem>-beep.wav` and `<stem>-video.mp4`
    /// inside `output_dir`.
    pub fn for_input(input: &Path, output_dir: &Path) -> Self {
        let stem = stem_of(input);
        Self {
            encoded_wav: output_dir.join(format!("{stem}-enc.wav")),
            beep_wav: output_dir.join(format!("{stem}-beep.wav")),
            video: output_dir.join(format!("{stem}-video.mp4")),
            stem,
        }
    }
}

/// File name up to its first `.`. Dot-files keep their full name.
pub fn stem_of(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => name,
    }
}
