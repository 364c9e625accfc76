use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Everything ffmpeg needs besides the frames themselves.
#[derive(Clone, Debug)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
    /// Source audio to mux in, trimmed to the same subclip as the frames.
    pub audio: Option<AudioInput>,
}

#[derive(Clone, Debug)]
pub struct AudioInput {
    pub path: PathBuf,
    pub start: Option<f32>,
    pub duration: Option<f32>,
}

impl EncoderSettings {
    /// Full ffmpeg argument list writing to `output_path`.
    pub fn args(&self, output_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-f".into(), "rawvideo".into(),
            "-pixel_format".into(), "rgb24".into(),
            "-video_size".into(), format!("{}x{}", self.width, self.height).into(),
            "-framerate".into(), self.fps.to_string().into(),
            "-i".into(), "pipe:0".into(),
        ];

        if let Some(ref audio) = self.audio {
            if let Some(start) = audio.start {
                args.push("-ss".into());
                args.push(format!("{:.3}", start).into());
            }
            if let Some(duration) = audio.duration {
                args.push("-t".into());
                args.push(format!("{:.3}", duration).into());
            }
            args.push("-i".into());
            args.push(audio.path.clone().into_os_string());
        }

        for arg in [
            "-c:v", &self.codec,
            "-pix_fmt", &self.pix_fmt,
            "-crf", &self.crf.to_string(),
            "-preset", "medium",
        ] {
            args.push(arg.into());
        }

        if self.audio.is_some() {
            for arg in ["-c:a", "aac", "-b:a", "192k", "-shortest"] {
                args.push(arg.into());
            }
        }

        args.push(output_path.as_os_str().to_os_string());
        args
    }

    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

pub struct FfmpegEncoder {
    child: Child,
    frame_bytes: usize,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, settings: &EncoderSettings) -> Result<Self> {
        let child = Command::new("ffmpeg")
            .args(settings.args(output_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width,
            settings.height,
            settings.fps,
            settings.codec
        );

        Ok(Self {
            child,
            frame_bytes: settings.frame_bytes(),
        })
    }

    pub fn write_frame(&mut self, rgb_pixels: &[u8]) -> Result<()> {
        if rgb_pixels.len() != self.frame_bytes {
            anyhow::bail!(
                "Frame has {} bytes, encoder expects {}",
                rgb_pixels.len(),
                self.frame_bytes
            );
        }
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgb_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // EOF on stdin ends the stream.
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(audio: Option<AudioInput>) -> EncoderSettings {
        EncoderSettings {
            width: 640,
            height: 360,
            fps: 24,
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: 18,
            audio,
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn silent_video_args() {
        let args = strings(settings(None).args(Path::new("out.mp4")));
        assert!(args.windows(2).any(|w| w == ["-pixel_format", "rgb24"]));
        assert!(args.windows(2).any(|w| w == ["-video_size", "640x360"]));
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn audio_is_trimmed_before_its_input() {
        let audio = AudioInput {
            path: PathBuf::from("song.flac"),
            start: Some(1.5),
            duration: Some(3.0),
        };
        let args = strings(settings(Some(audio)).args(Path::new("out.mp4")));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "song.flac").unwrap();
        assert_eq!(args[ss + 1], "1.500");
        assert!(ss < input);
        assert!(args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn frame_size_is_rgb24() {
        assert_eq!(settings(None).frame_bytes(), 640 * 360 * 3);
    }
}
