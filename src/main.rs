mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use cli::Cli;
use dotviz::audio::{self, AudioBuffer, BandTimeline, FrequencyBand};
use dotviz::config::{self, Config, Style};
use dotviz::encode::{AudioInput, EncoderSettings, FfmpegEncoder};
use dotviz::render::debug::DebugOverlay;
use dotviz::render::text::TextOverlay;
use dotviz::render::{bars, BarRenderer, Colormap, DotRenderer, Frame, FrameSource};

/// Frames rendered in parallel before being piped to ffmpeg in order.
const RENDER_BATCH: usize = 64;

/// Where one input's results go.
#[derive(Debug, PartialEq)]
struct Job {
    input: PathBuf,
    output: PathBuf,
    still: Option<(f32, PathBuf)>,
    analysis_json: Option<PathBuf>,
}

impl Job {
    fn new(input: &Path, cli: &Cli, batch: bool) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".into());

        let output = if batch {
            let dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
            dir.join(format!("{}.mp4", stem))
        } else {
            cli.output.clone().unwrap_or_else(|| PathBuf::from("output.mp4"))
        };

        let per_job = |path: &Path| -> PathBuf {
            if !batch {
                return path.to_path_buf();
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            path.with_file_name(format!("{}-{}", stem, name))
        };

        let still = match (cli.still, cli.still_output.as_deref()) {
            (Some(t), Some(path)) => Some((t, per_job(path))),
            _ => None,
        };

        Self {
            input: input.to_path_buf(),
            output,
            still,
            analysis_json: cli.analysis_json.as_deref().map(per_job),
        }
    }
}

#[derive(Serialize)]
struct AnalysisDump<'a> {
    input: &'a Path,
    sample_rate: u32,
    duration_secs: f32,
    timeline: &'a BandTimeline,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_colormaps {
        println!("Available colormaps:");
        for cmap in Colormap::ALL {
            println!("  {}", cmap);
        }
        return Ok(());
    }

    let mut cfg = match config::discover_config(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };
    cli.apply_to(&mut cfg);
    cfg.validate().context("Invalid configuration")?;

    if cli.inputs.is_empty() {
        anyhow::bail!("At least one input audio file is required");
    }

    log::info!("dotviz - audio-reactive equalizer renderer");
    log::info!("Style: {:?}", cfg.style);
    log::info!(
        "Resolution: {}x{} @ {}fps",
        cfg.output.width,
        cfg.output.height,
        cfg.output.fps
    );

    let batch = cli.inputs.len() > 1;
    let mut failed = 0usize;
    for input in &cli.inputs {
        let job = Job::new(input, &cli, batch);
        let started = Instant::now();
        match run_job(&job, &cfg) {
            Ok(()) => log::info!(
                "Finished {} in {:.1}s",
                input.display(),
                started.elapsed().as_secs_f32()
            ),
            Err(err) => {
                failed += 1;
                log::error!("{}: {:#}", input.display(), err);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} jobs failed", failed, cli.inputs.len());
    }
    Ok(())
}

fn run_job(job: &Job, cfg: &Config) -> Result<()> {
    if !job.input.exists() {
        anyhow::bail!("Input file not found: {}", job.input.display());
    }
    log::info!("Input: {}", job.input.display());

    log::info!("Decoding audio...");
    let audio = audio::decode::decode_audio(&job.input)
        .with_context(|| format!("Failed to decode {}", job.input.display()))?;
    let subclipped = cfg.audio.start.is_some() || cfg.audio.end.is_some();
    let audio = if subclipped {
        audio.subclip(cfg.audio.start, cfg.audio.end)?
    } else {
        audio
    };
    let duration = audio.duration_secs();

    log::info!("Analyzing audio...");
    let bands = job_bands(cfg, &audio)?;
    let timeline = audio::analyze(&audio, &bands, &cfg.analysis_params(duration))?;
    log::info!(
        "Total frames: {}, Duration: {:.1}s",
        timeline.frame_count(),
        duration
    );

    if let Some(ref path) = job.analysis_json {
        write_analysis(path, job, &audio, &timeline)?;
    }

    let source = build_source(cfg, timeline)?;

    if let Some((t, ref path)) = job.still {
        let frame = source.render(t);
        frame
            .save(path)
            .with_context(|| format!("Failed to write still frame to {}", path.display()))?;
        log::info!("Still frame at {:.2}s written to {}", t, path.display());
        return Ok(());
    }

    let settings = EncoderSettings {
        width: cfg.output.width,
        height: cfg.output.height,
        fps: cfg.output.fps,
        codec: cfg.output.codec.clone(),
        pix_fmt: cfg.output.pix_fmt.clone(),
        crf: cfg.output.crf,
        audio: Some(AudioInput {
            path: job.input.clone(),
            start: cfg.audio.start,
            duration: subclipped.then_some(duration),
        }),
    };
    render_video(source.as_ref(), &settings, &job.output)?;

    log::info!("Output: {}", job.output.display());
    Ok(())
}

fn job_bands(cfg: &Config, audio: &AudioBuffer) -> Result<Vec<FrequencyBand>> {
    let bands = match cfg.style {
        Style::Dots => cfg.bands()?,
        Style::Bars => bars::log_bands(audio.sample_rate(), cfg.bars.n_fft, cfg.bars.num_bars)?,
    };
    Ok(bands)
}

fn build_source(cfg: &Config, timeline: BandTimeline) -> Result<Box<dyn FrameSource>> {
    let (width, height) = (cfg.output.width, cfg.output.height);
    let source: Box<dyn FrameSource> = match cfg.style {
        Style::Dots => {
            let colors = cfg.color_table(timeline.num_bands())?;
            let renderer =
                DotRenderer::new(timeline, cfg.anchors()?, colors, cfg.dot_style(), width, height)?;
            if cfg.debug.overlay {
                Box::new(renderer.with_debug(DebugOverlay::new(load_font(cfg))))
            } else {
                Box::new(renderer)
            }
        }
        Style::Bars => {
            if cfg.debug.overlay {
                log::warn!("The diagnostic overlay is only drawn for the dots style");
            }
            Box::new(BarRenderer::new(
                timeline,
                cfg.colormap()?,
                cfg.bar_style(),
                width,
                height,
            )?)
        }
    };
    Ok(source)
}

fn load_font(cfg: &Config) -> Option<TextOverlay> {
    let path = cfg.debug.font.as_ref()?;
    match TextOverlay::from_file(path, cfg.debug.font_size) {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            log::warn!("Diagnostic text disabled: {:#}", err);
            None
        }
    }
}

fn write_analysis(path: &Path, job: &Job, audio: &AudioBuffer, timeline: &BandTimeline) -> Result<()> {
    let dump = AnalysisDump {
        input: &job.input,
        sample_rate: audio.sample_rate(),
        duration_secs: audio.duration_secs(),
        timeline,
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &dump)
        .with_context(|| format!("Failed to write analysis to {}", path.display()))?;
    log::info!("Analysis written to {}", path.display());
    Ok(())
}

fn render_video(source: &dyn FrameSource, settings: &EncoderSettings, output: &Path) -> Result<()> {
    log::info!("Starting FFmpeg encoder...");
    let mut encoder = FfmpegEncoder::new(output, settings)?;

    let total_frames = source.frame_count();
    let pb = ProgressBar::new(total_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    for start in (0..total_frames).step_by(RENDER_BATCH) {
        let end = (start + RENDER_BATCH).min(total_frames);
        let frames: Vec<Frame> = (start..end)
            .into_par_iter()
            .map(|idx| source.render(source.frame_time(idx)))
            .collect();
        for frame in &frames {
            encoder.write_frame(frame.as_raw())?;
        }
        pb.set_position(end as u64);
    }

    pb.finish_with_message("Rendering complete");

    log::info!("Finishing encoding...");
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_job_uses_paths_verbatim() {
        let cli = Cli::parse_from([
            "dotviz", "song.mp3", "-o", "clip.mp4", "--still", "2", "--still-output", "shot.png",
        ]);
        let job = Job::new(&cli.inputs[0], &cli, false);
        assert_eq!(job.output, PathBuf::from("clip.mp4"));
        assert_eq!(job.still, Some((2.0, PathBuf::from("shot.png"))));
        assert_eq!(job.analysis_json, None);
    }

    #[test]
    fn single_job_default_output() {
        let cli = Cli::parse_from(["dotviz", "song.mp3"]);
        assert_eq!(Job::new(&cli.inputs[0], &cli, false).output, PathBuf::from("output.mp4"));
    }

    #[test]
    fn batch_jobs_get_distinct_paths() {
        let cli = Cli::parse_from([
            "dotviz", "a/one.wav", "b/two.flac", "-o", "out", "--analysis-json", "dump/bands.json",
        ]);
        let one = Job::new(&cli.inputs[0], &cli, true);
        let two = Job::new(&cli.inputs[1], &cli, true);
        assert_eq!(one.output, PathBuf::from("out/one.mp4"));
        assert_eq!(two.output, PathBuf::from("out/two.mp4"));
        assert_eq!(one.analysis_json, Some(PathBuf::from("dump/one-bands.json")));
        assert_eq!(two.analysis_json, Some(PathBuf::from("dump/two-bands.json")));
    }

    #[test]
    fn missing_input_fails_the_job_only() {
        let cli = Cli::parse_from(["dotviz", "/nonexistent/song.wav"]);
        let job = Job::new(&cli.inputs[0], &cli, false);
        assert!(run_job(&job, &Config::default()).is_err());
    }

    #[test]
    fn analysis_dump_is_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bands.json");
        let audio = AudioBuffer::mono(vec![0.0; 8000], 8000);
        let cfg = Config::default();
        let bands = cfg.bands().unwrap();
        let timeline = audio::analyze(&audio, &bands, &cfg.analysis_params(1.0)).unwrap();
        let job = Job {
            input: PathBuf::from("song.wav"),
            output: PathBuf::from("out.mp4"),
            still: None,
            analysis_json: Some(path.clone()),
        };
        write_analysis(&path, &job, &audio, &timeline).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["sample_rate"], 8000);
        assert_eq!(value["timeline"]["frame_count"], 60);
        assert_eq!(value["timeline"]["left"].as_array().unwrap().len(), 4);
    }
}
