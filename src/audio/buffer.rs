use serde::{Deserialize, Serialize};

use crate::error::{invalid_audio, Result};

/// Which side of a stereo signal a series or anchor belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    pub const BOTH: [Channel; 2] = [Channel::Left, Channel::Right];

    pub fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

/// Decoded PCM, one or two channels of samples in [-1, 1].
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            channels: vec![samples],
            sample_rate,
        }
    }

    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if left.len() != right.len() {
            return Err(invalid_audio(format!(
                "stereo channels differ in length ({} vs {})",
                left.len(),
                right.len()
            )));
        }
        Ok(Self {
            channels: vec![left, right],
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f32 / self.sample_rate as f32
    }

    /// Samples for `channel`. A mono buffer answers both sides with its only channel.
    pub fn channel(&self, channel: Channel) -> &[f32] {
        let idx = channel.index().min(self.channels.len().saturating_sub(1));
        self.channels.get(idx).map_or(&[], Vec::as_slice)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(invalid_audio("sample rate must be positive"));
        }
        if self.is_empty() {
            return Err(invalid_audio("buffer holds no samples"));
        }
        Ok(())
    }

    /// Keep only `[start, end)` seconds. `end` past the buffer clamps to its length.
    pub fn subclip(&self, start: Option<f32>, end: Option<f32>) -> Result<Self> {
        let sr = self.sample_rate as f32;
        let total = self.len();
        let to_index = |secs: f32| ((secs.max(0.0) * sr) as usize).min(total);

        let start_idx = start.map_or(0, to_index);
        let end_idx = end.map_or(total, to_index);
        if start_idx >= end_idx {
            return Err(invalid_audio(format!(
                "subclip {:?}..{:?} selects no samples",
                start, end
            )));
        }

        Ok(Self {
            channels: self
                .channels
                .iter()
                .map(|c| c[start_idx..end_idx].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_answers_both_channels() {
        let buf = AudioBuffer::mono(vec![0.1, 0.2, 0.3], 8000);
        assert_eq!(buf.channel(Channel::Left), buf.channel(Channel::Right));
        assert_eq!(buf.channel_count(), 1);
    }

    #[test]
    fn stereo_rejects_uneven_channels() {
        let err = AudioBuffer::stereo(vec![0.0; 4], vec![0.0; 3], 8000).unwrap_err();
        assert!(matches!(err, crate::VizError::InvalidAudio(_)));
    }

    #[test]
    fn validate_catches_empty_and_zero_rate() {
        assert!(AudioBuffer::mono(vec![], 44100).validate().is_err());
        assert!(AudioBuffer::mono(vec![0.0; 10], 0).validate().is_err());
        assert!(AudioBuffer::mono(vec![0.0; 10], 44100).validate().is_ok());
    }

    #[test]
    fn subclip_bounds() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let buf = AudioBuffer::mono(samples, 10);

        let clip = buf.subclip(Some(2.0), Some(5.0)).unwrap();
        assert_eq!(clip.len(), 30);
        assert_eq!(clip.channel(Channel::Left)[0], 20.0);

        let tail = buf.subclip(Some(8.0), Some(100.0)).unwrap();
        assert_eq!(tail.len(), 20);

        assert!(buf.subclip(Some(6.0), Some(3.0)).is_err());
    }
}
