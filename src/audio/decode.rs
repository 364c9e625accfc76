use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::buffer::AudioBuffer;
use crate::error::{invalid_audio, Result};

/// Decode an audio file into at most two channels.
///
/// Mono files stay mono. Files with more than two channels keep the first two
/// (front left/right in every layout symphonia reports).
pub fn decode_audio(path: &Path) -> Result<AudioBuffer> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| invalid_audio(format!("no audio tracks in {}", path.display())))?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count()).max(1);
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| invalid_audio(format!("unknown sample rate in {}", path.display())))?;

    if channels > 2 {
        log::warn!("{} has {} channels; using the first two", path.display(), channels);
    }

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let kept = channels.min(2);
    let mut planes: Vec<Vec<f32>> = vec![Vec::new(); kept];

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let frame_channels = spec.channels.count().max(1);
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks(frame_channels) {
            for (c, plane) in planes.iter_mut().enumerate() {
                plane.push(frame[c.min(frame.len() - 1)]);
            }
        }
    }

    log::info!(
        "Decoded audio: {} samples x {} channel(s), {}Hz, {:.1}s",
        planes[0].len(),
        kept,
        sample_rate,
        planes[0].len() as f32 / sample_rate as f32
    );

    let mut planes = planes.into_iter();
    let left = planes.next().unwrap_or_default();
    match planes.next() {
        Some(right) => AudioBuffer::stereo(left, right, sample_rate),
        None => Ok(AudioBuffer::mono(left, sample_rate)),
    }
}
