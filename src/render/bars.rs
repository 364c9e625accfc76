use super::colormap::Colormap;
use super::draw::fill_rect;
use super::{Frame, FrameSource};
use crate::audio::{BandTimeline, Channel, FrequencyBand};
use crate::error::{invalid_config, Result};

/// FFT size the bar style analyzes with.
pub const BAR_N_FFT: usize = 4096;

#[derive(Clone, Debug, PartialEq)]
pub struct BarStyle {
    pub num_bars: usize,
    /// Width of each channel's block as a percentage of frame width.
    pub equalizer_width_percent: f32,
    /// Height of a full-scale bar as a percentage of frame height.
    pub max_bar_height_percent: f32,
    pub amplitude_threshold: f32,
}

impl BarStyle {
    pub fn validate(&self) -> Result<()> {
        if self.num_bars == 0 {
            return Err(invalid_config("num_bars must be positive"));
        }
        for (name, v) in [
            ("equalizer_width_percent", self.equalizer_width_percent),
            ("max_bar_height_percent", self.max_bar_height_percent),
        ] {
            if !v.is_finite() || v <= 0.0 || v > 100.0 {
                return Err(invalid_config(format!("{} must be in (0, 100], got {}", name, v)));
            }
        }
        if !self.amplitude_threshold.is_finite() {
            return Err(invalid_config("amplitude threshold must be finite"));
        }
        Ok(())
    }
}

/// `num_bars` contiguous bands, log-spaced from the first non-DC bin up to Nyquist.
pub fn log_bands(sample_rate: u32, n_fft: usize, num_bars: usize) -> Result<Vec<FrequencyBand>> {
    if sample_rate == 0 || n_fft < 2 || num_bars == 0 {
        return Err(invalid_config(format!(
            "cannot space {} bars over sr={} n_fft={}",
            num_bars, sample_rate, n_fft
        )));
    }
    let lowest = (sample_rate as f64 / n_fft as f64).ln();
    let nyquist = (sample_rate as f64 / 2.0).ln();
    let step = (nyquist - lowest) / num_bars as f64;
    let edge = |i: usize| (lowest + step * i as f64).exp() as f32;

    (0..num_bars)
        .map(|i| FrequencyBand::new(edge(i), edge(i + 1), 1.0))
        .collect()
}

/// Two mirrored blocks of bars hanging from the top edge, one per channel.
pub struct BarRenderer {
    timeline: BandTimeline,
    colormap: Colormap,
    style: BarStyle,
    width: u32,
    height: u32,
    bar_width: i32,
    max_height: f32,
}

impl BarRenderer {
    pub fn new(
        timeline: BandTimeline,
        colormap: Colormap,
        style: BarStyle,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        style.validate()?;
        if width == 0 || height == 0 {
            return Err(invalid_config(format!("frame size {}x{} is empty", width, height)));
        }
        if timeline.num_bands() != style.num_bars {
            return Err(invalid_config(format!(
                "{} bars configured but the timeline has {} bands",
                style.num_bars,
                timeline.num_bands()
            )));
        }

        let block_width = (width as f32 * style.equalizer_width_percent / 100.0) as i32;
        let bar_width = block_width / style.num_bars as i32;
        if bar_width == 0 {
            log::warn!(
                "{} bars do not fit in a {}px block; nothing will be drawn",
                style.num_bars,
                block_width
            );
        }
        let max_height = height as f32 * style.max_bar_height_percent / 100.0;

        Ok(Self {
            timeline,
            colormap,
            style,
            width,
            height,
            bar_width,
            max_height,
        })
    }

    pub fn timeline(&self) -> &BandTimeline {
        &self.timeline
    }

    pub fn bar_width(&self) -> i32 {
        self.bar_width
    }

    pub fn is_silent(&self, frame_idx: usize) -> bool {
        (0..self.timeline.num_bands()).all(|b| {
            self.timeline.value(Channel::Left, b, frame_idx) < self.style.amplitude_threshold
        })
    }

    /// Left edge of `bar` in the block of `channel`. Band 0 sits at the outer
    /// edge of both blocks, so the left block is mirrored on purpose.
    pub fn bar_x(&self, channel: Channel, bar: usize) -> i32 {
        let offset = bar as i32 * self.bar_width;
        match channel {
            Channel::Left => offset,
            Channel::Right => self.width as i32 - offset - self.bar_width,
        }
    }

    pub fn bar_height(&self, amplitude: f32) -> i32 {
        (amplitude.clamp(0.0, 1.0) * self.max_height) as i32
    }

    fn draw_block(&self, frame: &mut Frame, channel: Channel, frame_idx: usize) {
        let drawn_width = (self.bar_width - 1).max(1);
        for (bar, amp) in self.timeline.values_at(channel, frame_idx).into_iter().enumerate() {
            let h = self.bar_height(amp);
            if h == 0 || self.bar_width == 0 {
                continue;
            }
            fill_rect(
                frame,
                self.bar_x(channel, bar),
                0,
                drawn_width,
                h,
                self.colormap.sample(amp),
            );
        }
    }
}

impl FrameSource for BarRenderer {
    fn frame_count(&self) -> usize {
        self.timeline.frame_count()
    }

    fn fps(&self) -> u32 {
        self.timeline.fps()
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render(&self, t: f32) -> Frame {
        let mut frame = Frame::new(self.width, self.height);
        if self.timeline.frame_count() == 0 {
            return frame;
        }
        let frame_idx = self.timeline.frame_index(t);
        if self.is_silent(frame_idx) {
            return frame;
        }
        for channel in Channel::BOTH {
            self.draw_block(&mut frame, channel, frame_idx);
        }
        frame
    }
}
