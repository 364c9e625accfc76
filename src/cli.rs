use clap::Parser;
use std::path::PathBuf;

use dotviz::config::{Config, Style};

#[derive(Parser, Debug)]
#[command(name = "dotviz", about = "Audio-reactive dot and bar equalizer video renderer")]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG). Each one is an independent job.
    pub inputs: Vec<PathBuf>,

    /// Output video file, or output directory when several inputs are given
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to dotviz.toml or ~/.config/dotviz/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Visual style
    #[arg(long, value_enum)]
    pub style: Option<Style>,

    /// Video width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Video height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Colormap name (e.g. jet, magma, COLORMAP_VIRIDIS)
    #[arg(long)]
    pub colormap: Option<String>,

    /// Left-channel amplitude below which a frame stays black
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Subclip start in seconds
    #[arg(long)]
    pub start: Option<f32>,

    /// Subclip end in seconds
    #[arg(long)]
    pub end: Option<f32>,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long)]
    pub crf: Option<u32>,

    /// FFmpeg video codec
    #[arg(long)]
    pub codec: Option<String>,

    /// FFmpeg pixel format
    #[arg(long)]
    pub pix_fmt: Option<String>,

    /// Draw the per-band diagnostic panel
    #[arg(long)]
    pub debug_overlay: bool,

    /// Export the frame at this time (seconds) as PNG instead of a video
    #[arg(long, requires = "still_output")]
    pub still: Option<f32>,

    /// PNG path for --still
    #[arg(long)]
    pub still_output: Option<PathBuf>,

    /// Also write the resampled band series as JSON
    #[arg(long)]
    pub analysis_json: Option<PathBuf>,

    /// List available colormaps and exit
    #[arg(long)]
    pub list_colormaps: bool,
}

impl Cli {
    /// Apply every flag given on the command line over the file config.
    pub fn apply_to(&self, cfg: &mut Config) {
        if let Some(style) = self.style {
            cfg.style = style;
        }
        if let Some(width) = self.width {
            cfg.output.width = width;
        }
        if let Some(height) = self.height {
            cfg.output.height = height;
        }
        if let Some(fps) = self.fps {
            cfg.output.fps = fps;
        }
        if let Some(crf) = self.crf {
            cfg.output.crf = crf;
        }
        if let Some(ref codec) = self.codec {
            cfg.output.codec = codec.clone();
        }
        if let Some(ref pix_fmt) = self.pix_fmt {
            cfg.output.pix_fmt = pix_fmt.clone();
        }
        if let Some(ref colormap) = self.colormap {
            cfg.set_colormap(colormap);
        }
        if let Some(threshold) = self.threshold {
            cfg.set_threshold(threshold);
        }
        if self.start.is_some() {
            cfg.audio.start = self.start;
        }
        if self.end.is_some() {
            cfg.audio.end = self.end;
        }
        if self.debug_overlay {
            cfg.debug.overlay = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_from(toml_text: &str) -> Config {
        toml::from_str(toml_text).unwrap()
    }

    #[test]
    fn explicit_flags_beat_config() {
        let cli = Cli::parse_from(["dotviz", "song.mp3", "--fps", "30", "--colormap", "magma"]);
        let mut cfg = cfg_from("[output]\nfps = 24\nwidth = 640\n");
        cli.apply_to(&mut cfg);
        assert_eq!(cfg.output.fps, 30);
        assert_eq!(cfg.output.width, 640);
        assert_eq!(cfg.dots.colormap, "magma");
        assert_eq!(cfg.bars.colormap, "magma");
    }

    #[test]
    fn flag_equal_to_default_still_wins() {
        let cli = Cli::parse_from(["dotviz", "a.wav", "--fps", "60"]);
        let mut cfg = cfg_from("[output]\nfps = 24\n");
        cli.apply_to(&mut cfg);
        assert_eq!(cfg.output.fps, 60);
    }

    #[test]
    fn threshold_follows_style_flag() {
        let cli = Cli::parse_from(["dotviz", "a.wav", "--style", "bars", "--threshold", "0.2"]);
        let mut cfg = Config::default();
        cli.apply_to(&mut cfg);
        assert_eq!(cfg.style, Style::Bars);
        assert_eq!(cfg.bars.amplitude_threshold, 0.2);
        assert_eq!(cfg.dots.amplitude_threshold, 0.6);
    }

    #[test]
    fn batch_and_subclip_flags() {
        let cli = Cli::parse_from(["dotviz", "a.wav", "b.flac", "--start", "1.5", "--end", "4", "--debug-overlay"]);
        assert_eq!(cli.inputs.len(), 2);
        let mut cfg = Config::default();
        cli.apply_to(&mut cfg);
        assert_eq!(cfg.audio.start, Some(1.5));
        assert_eq!(cfg.audio.end, Some(4.0));
        assert!(cfg.debug.overlay);
    }

    #[test]
    fn still_requires_output_path() {
        assert!(Cli::try_parse_from(["dotviz", "a.wav", "--still", "1.0"]).is_err());
        assert!(Cli::try_parse_from(["dotviz", "a.wav", "--still", "1.0", "--still-output", "f.png"]).is_ok());
    }
}
