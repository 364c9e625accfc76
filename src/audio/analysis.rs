use serde::Serialize;

use super::bands::{BandExtractor, FrequencyBand};
use super::buffer::{AudioBuffer, Channel};
use super::resample::resample_linear;
use crate::error::{invalid_config, Result};

pub const DEFAULT_N_FFT: usize = 2048;

/// Timing and transform settings for one precomputation run.
#[derive(Clone, Debug)]
pub struct AnalysisParams {
    pub fps: u32,
    pub duration_secs: f32,
    pub n_fft: usize,
    /// Defaults to `sample_rate / fps` so STFT frames land near video frames.
    pub hop_length: Option<usize>,
}

impl AnalysisParams {
    pub fn new(fps: u32, duration_secs: f32) -> Self {
        Self {
            fps,
            duration_secs,
            n_fft: DEFAULT_N_FFT,
            hop_length: None,
        }
    }

    pub fn frame_count(&self) -> usize {
        (self.duration_secs as f64 * self.fps as f64).round() as usize
    }

    fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(invalid_config("fps must be positive"));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(invalid_config(format!(
                "duration must be positive, got {}",
                self.duration_secs
            )));
        }
        if self.hop_length == Some(0) {
            return Err(invalid_config("hop length must be positive"));
        }
        Ok(())
    }
}

/// Band energy resampled onto the video frame grid: one value per
/// (channel, band, frame). Read-only once built.
#[derive(Clone, Debug, Serialize)]
pub struct BandTimeline {
    fps: u32,
    frame_count: usize,
    bands: Vec<FrequencyBand>,
    left: Vec<Vec<f32>>,
    right: Vec<Vec<f32>>,
}

impl BandTimeline {
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    pub fn series(&self, channel: Channel, band: usize) -> &[f32] {
        match channel {
            Channel::Left => &self.left[band],
            Channel::Right => &self.right[band],
        }
    }

    /// Amplitude of `band` on `channel` at a frame index already clamped by
    /// [`BandTimeline::frame_index`].
    pub fn value(&self, channel: Channel, band: usize, frame_idx: usize) -> f32 {
        self.series(channel, band).get(frame_idx).copied().unwrap_or(0.0)
    }

    /// Every band's amplitude on `channel` at `frame_idx`, in band order.
    pub fn values_at(&self, channel: Channel, frame_idx: usize) -> Vec<f32> {
        (0..self.num_bands())
            .map(|b| self.value(channel, b, frame_idx))
            .collect()
    }

    /// Map a playback time to a frame index: `floor(t * fps)` clamped to
    /// `[0, frame_count - 1]`. Negative or NaN times map to frame 0.
    pub fn frame_index(&self, t: f32) -> usize {
        if self.frame_count == 0 {
            return 0;
        }
        let raw = (t as f64 * self.fps as f64).floor();
        if raw.is_nan() || raw <= 0.0 {
            return 0;
        }
        (raw as usize).min(self.frame_count - 1)
    }

    pub fn duration_secs(&self) -> f32 {
        self.frame_count as f32 / self.fps as f32
    }
}

/// Precompute the per-(channel, band) series for a whole job.
///
/// Fails before any frame work if the audio, bands or timing are unusable.
pub fn analyze(
    audio: &AudioBuffer,
    bands: &[FrequencyBand],
    params: &AnalysisParams,
) -> Result<BandTimeline> {
    params.validate()?;
    audio.validate()?;

    let hop_length = params
        .hop_length
        .unwrap_or(((audio.sample_rate() / params.fps) as usize).max(1));
    let frame_count = params.frame_count();

    log::info!(
        "Extracting {} bands (n_fft={}, hop={})...",
        bands.len(),
        params.n_fft,
        hop_length
    );
    let extractor = BandExtractor::new(bands, params.n_fft, hop_length)?;
    let energies = extractor.extract(audio)?;

    log::info!(
        "Resampling {} STFT frames onto {} video frames @ {}fps",
        energies.num_frames(),
        frame_count,
        params.fps
    );
    if frame_count == 0 {
        log::warn!("Duration {:.3}s at {}fps yields no frames", params.duration_secs, params.fps);
    }

    let resample_channel = |channel: Channel| -> Vec<Vec<f32>> {
        energies
            .channel(channel)
            .iter()
            .map(|series| resample_linear(series, frame_count))
            .collect()
    };

    Ok(BandTimeline {
        fps: params.fps,
        frame_count,
        bands: bands.to_vec(),
        left: resample_channel(Channel::Left),
        right: resample_channel(Channel::Right),
    })
}
