use thiserror::Error;

/// Errors surfaced by the precomputation stage. Rendering never fails.
#[derive(Debug, Error)]
pub enum VizError {
    /// Empty buffer, mismatched channel lengths or a zero sample rate.
    #[error("invalid audio: {0}")]
    InvalidAudio(String),
    /// Malformed bands, fps, duration, layout or colormap settings.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Opaque failure from the decoder, passed through untouched.
    #[error("audio decode failed")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VizError>;

pub(crate) fn invalid_config(msg: impl Into<String>) -> VizError {
    VizError::InvalidConfig(msg.into())
}

pub(crate) fn invalid_audio(msg: impl Into<String>) -> VizError {
    VizError::InvalidAudio(msg.into())
}
