//! Audio-reactive equalizer rendering.
//!
//! Audio is decoded once, turned into per-(channel, band) energy series on the
//! video frame grid by [`audio::analyze`], and then any number of frames are
//! pulled from a [`render::FrameSource`].

pub mod audio;
pub mod config;
pub mod encode;
pub mod error;
pub mod render;

pub use error::{Result, VizError};
