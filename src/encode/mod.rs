pub mod ffmpeg;

pub use ffmpeg::{AudioInput, EncoderSettings, FfmpegEncoder};
