use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::analysis::DEFAULT_N_FFT;
use crate::audio::{AnalysisParams, Channel, FrequencyBand};
use crate::error::{invalid_config, Result};
use crate::render::bars::BAR_N_FFT;
use crate::render::{Anchor, BarStyle, ColorTable, Colormap, DotStyle};

/// Which visual a job renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Dots,
    Bars,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub dots: DotsConfig,
    #[serde(default)]
    pub bars: BarsConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    /// Dot field anchors. Empty means the left/right speaker pair.
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    #[serde(default = "default_bands")]
    pub bands: Vec<BandConfig>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AudioConfig {
    /// Subclip start in seconds.
    #[serde(default)]
    pub start: Option<f32>,
    /// Subclip end in seconds.
    #[serde(default)]
    pub end: Option<f32>,
    #[serde(default)]
    pub hop_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DotsConfig {
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,
    #[serde(default = "default_circle_radius")]
    pub circle_radius: f32,
    #[serde(default = "default_num_dots")]
    pub num_dots: usize,
    #[serde(default = "default_center_dot_size")]
    pub center_dot_size: f32,
    #[serde(default = "default_edge_dot_size")]
    pub edge_dot_size: f32,
    /// Row of the default anchors as a percentage of frame height.
    #[serde(default = "default_vertical_position")]
    pub vertical_position_percent: f32,
    #[serde(default = "default_colormap")]
    pub colormap: String,
    /// One position in [0, 1] per band. Omitted means evenly spaced.
    #[serde(default)]
    pub colormap_positions: Option<Vec<f32>>,
    #[serde(default = "default_dots_threshold")]
    pub amplitude_threshold: f32,
}

#[derive(Debug, Deserialize)]
pub struct BarsConfig {
    #[serde(default = "default_bar_n_fft")]
    pub n_fft: usize,
    #[serde(default = "default_num_bars")]
    pub num_bars: usize,
    #[serde(default = "default_equalizer_width")]
    pub equalizer_width_percent: f32,
    #[serde(default = "default_max_bar_height")]
    pub max_bar_height_percent: f32,
    #[serde(default = "default_colormap")]
    pub colormap: String,
    #[serde(default)]
    pub amplitude_threshold: f32,
}

#[derive(Debug, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub overlay: bool,
    /// TTF/OTF used for the overlay text. Without it only the meters are drawn.
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BandConfig {
    pub low_hz: f32,
    pub high_hz: f32,
    #[serde(default = "default_amplification")]
    pub amplification: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            style: Style::default(),
            output: OutputConfig::default(),
            audio: AudioConfig::default(),
            dots: DotsConfig::default(),
            bars: BarsConfig::default(),
            debug: DebugConfig::default(),
            anchors: Vec::new(),
            bands: default_bands(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
        }
    }
}

impl Default for DotsConfig {
    fn default() -> Self {
        Self {
            n_fft: default_n_fft(),
            circle_radius: default_circle_radius(),
            num_dots: default_num_dots(),
            center_dot_size: default_center_dot_size(),
            edge_dot_size: default_edge_dot_size(),
            vertical_position_percent: default_vertical_position(),
            colormap: default_colormap(),
            colormap_positions: None,
            amplitude_threshold: default_dots_threshold(),
        }
    }
}

impl Default for BarsConfig {
    fn default() -> Self {
        Self {
            n_fft: default_bar_n_fft(),
            num_bars: default_num_bars(),
            equalizer_width_percent: default_equalizer_width(),
            max_bar_height_percent: default_max_bar_height(),
            colormap: default_colormap(),
            amplitude_threshold: 0.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            overlay: false,
            font: None,
            font_size: default_font_size(),
        }
    }
}

fn default_width() -> u32 { 1920 }
fn default_height() -> u32 { 1080 }
fn default_fps() -> u32 { 60 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_n_fft() -> usize { DEFAULT_N_FFT }
fn default_bar_n_fft() -> usize { BAR_N_FFT }
fn default_circle_radius() -> f32 { 300.0 }
fn default_num_dots() -> usize { 30 }
fn default_center_dot_size() -> f32 { 35.0 }
fn default_edge_dot_size() -> f32 { 5.0 }
fn default_vertical_position() -> f32 { 7.0 }
fn default_colormap() -> String { "jet".into() }
fn default_dots_threshold() -> f32 { 0.6 }
fn default_num_bars() -> usize { 60 }
fn default_equalizer_width() -> f32 { 10.0 }
fn default_max_bar_height() -> f32 { 90.0 }
fn default_font_size() -> f32 { 20.0 }
fn default_amplification() -> f32 { 1.0 }

fn default_bands() -> Vec<BandConfig> {
    [(20.0, 80.0, 2.0), (80.0, 255.0, 14.0), (255.0, 500.0, 3.0), (500.0, 8000.0, 40.0)]
        .into_iter()
        .map(|(low_hz, high_hz, amplification)| BandConfig {
            low_hz,
            high_hz,
            amplification,
        })
        .collect()
}

impl Config {
    /// Validated band list, in configured order.
    pub fn bands(&self) -> Result<Vec<FrequencyBand>> {
        if self.bands.is_empty() {
            return Err(invalid_config("at least one [[bands]] entry is required"));
        }
        self.bands
            .iter()
            .map(|b| FrequencyBand::new(b.low_hz, b.high_hz, b.amplification))
            .collect()
    }

    pub fn anchors(&self) -> Result<Vec<Anchor>> {
        if self.anchors.is_empty() {
            return Ok(Anchor::speaker_pair(self.dots.vertical_position_percent));
        }
        for anchor in &self.anchors {
            if !anchor.x_percent.is_finite() || !anchor.y_percent.is_finite() {
                return Err(invalid_config(format!(
                    "anchor '{}' has a non-finite position",
                    anchor.name
                )));
            }
        }
        if !self.anchors.iter().any(|a| a.channel == Channel::Left) {
            log::warn!("No anchor follows the left channel; frames are still gated on it");
        }
        Ok(self.anchors.clone())
    }

    pub fn colormap(&self) -> Result<Colormap> {
        match self.style {
            Style::Dots => self.dots.colormap.parse(),
            Style::Bars => self.bars.colormap.parse(),
        }
    }

    pub fn color_table(&self, num_bands: usize) -> Result<ColorTable> {
        ColorTable::for_bands(
            self.dots.colormap.parse()?,
            self.dots.colormap_positions.as_deref(),
            num_bands,
        )
    }

    pub fn dot_style(&self) -> DotStyle {
        DotStyle {
            radius: self.dots.circle_radius,
            grid: self.dots.num_dots,
            center_size: self.dots.center_dot_size,
            edge_size: self.dots.edge_dot_size,
            amplitude_threshold: self.dots.amplitude_threshold,
        }
    }

    pub fn bar_style(&self) -> BarStyle {
        BarStyle {
            num_bars: self.bars.num_bars,
            equalizer_width_percent: self.bars.equalizer_width_percent,
            max_bar_height_percent: self.bars.max_bar_height_percent,
            amplitude_threshold: self.bars.amplitude_threshold,
        }
    }

    /// Analysis settings for a clip of `duration_secs` under the active style.
    pub fn analysis_params(&self, duration_secs: f32) -> AnalysisParams {
        let mut params = AnalysisParams::new(self.output.fps, duration_secs);
        params.n_fft = match self.style {
            Style::Dots => self.dots.n_fft,
            Style::Bars => self.bars.n_fft,
        };
        params.hop_length = self.audio.hop_length;
        params
    }

    /// Overwrite the active style's threshold.
    pub fn set_threshold(&mut self, threshold: f32) {
        match self.style {
            Style::Dots => self.dots.amplitude_threshold = threshold,
            Style::Bars => self.bars.amplitude_threshold = threshold,
        }
    }

    pub fn set_colormap(&mut self, name: &str) {
        self.dots.colormap = name.to_string();
        self.bars.colormap = name.to_string();
    }

    /// Check everything a job needs before any audio is touched.
    pub fn validate(&self) -> Result<()> {
        if self.output.width == 0 || self.output.height == 0 {
            return Err(invalid_config(format!(
                "frame size {}x{} is empty",
                self.output.width, self.output.height
            )));
        }
        if self.output.fps == 0 {
            return Err(invalid_config("fps must be positive"));
        }
        if let (Some(start), Some(end)) = (self.audio.start, self.audio.end) {
            if end <= start {
                return Err(invalid_config(format!(
                    "subclip end {}s is not after start {}s",
                    end, start
                )));
            }
        }
        if self.audio.hop_length == Some(0) {
            return Err(invalid_config("hop_length must be positive"));
        }
        self.colormap()?;
        match self.style {
            Style::Dots => {
                let bands = self.bands()?;
                self.color_table(bands.len())?;
                self.anchors()?;
                self.dot_style().validate()?;
            }
            Style::Bars => self.bar_style().validate()?,
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| invalid_config(format!("{}: {}", path.display(), e)))
}

/// Explicit path, else `dotviz.toml` in the working directory, else the
/// per-user config file.
pub fn discover_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("dotviz.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("dotviz").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("dotviz").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
