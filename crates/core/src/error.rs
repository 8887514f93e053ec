use std::path::PathBuf;

/// Result alias that carries the custom [`ChromatoneError`] type.
pub type Result<T> = std::result::Result<T, ChromatoneError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum ChromatoneError {
    /// The input text file does not exist.
    #[error("input file `{}` not found", path.display())]
    InputNotFound { path: PathBuf },
    /// The input file exists but is not valid UTF-8 text.
    #[error("input file `{}` is not valid UTF-8 text", path.display())]
    InvalidText { path: PathBuf },
    /// There is nothing to encode.
    #[error("input text is empty; nothing to encode")]
    EmptyInput,
    /// A configuration value is out of range or could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Reading or writing a WAV file failed.
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),
    /// The external encoder could not be located or started.
    #[error("video encoder unavailable: {0}")]
    EncoderUnavailable(String),
    /// The external encoder ran but reported a failure.
    #[error("video encoder exited with {status}: {stderr}")]
    EncoderFailed { status: String, stderr: String },
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ChromatoneError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for ChromatoneError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ChromatoneError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<serde_json::Error> for ChromatoneError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}
