use std::ops::Range;

use serde::Serialize;

use super::buffer::{AudioBuffer, Channel};
use super::stft::Stft;
use crate::error::{invalid_config, Result};

/// Divisor used when every band of every channel is silent.
const SILENT_PEAK: f32 = 1e-6;

/// Half-open frequency range `[low_hz, high_hz)` with a gain applied to its energy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FrequencyBand {
    low_hz: f32,
    high_hz: f32,
    amplification: f32,
}

impl FrequencyBand {
    pub fn new(low_hz: f32, high_hz: f32, amplification: f32) -> Result<Self> {
        if !(low_hz.is_finite() && high_hz.is_finite() && amplification.is_finite()) {
            return Err(invalid_config(format!(
                "band ({}, {}) x{} has non-finite values",
                low_hz, high_hz, amplification
            )));
        }
        if low_hz < 0.0 {
            return Err(invalid_config(format!("band low edge {} Hz is negative", low_hz)));
        }
        if low_hz >= high_hz {
            return Err(invalid_config(format!(
                "band low edge {} Hz must be below high edge {} Hz",
                low_hz, high_hz
            )));
        }
        if amplification < 0.0 {
            return Err(invalid_config(format!(
                "band ({}, {}) has negative amplification {}",
                low_hz, high_hz, amplification
            )));
        }
        Ok(Self {
            low_hz,
            high_hz,
            amplification,
        })
    }

    pub fn low_hz(&self) -> f32 {
        self.low_hz
    }

    pub fn high_hz(&self) -> f32 {
        self.high_hz
    }

    pub fn amplification(&self) -> f32 {
        self.amplification
    }

    pub fn contains(&self, hz: f32) -> bool {
        hz >= self.low_hz && hz < self.high_hz
    }

    /// Bins whose center frequency falls inside the band. Bin frequencies
    /// are ascending, so the selection is one contiguous range.
    fn bin_range(&self, frequencies: &[f32]) -> Range<usize> {
        let start = frequencies.partition_point(|&f| f < self.low_hz);
        let end = frequencies.partition_point(|&f| f < self.high_hz);
        start..end.max(start)
    }
}

/// Normalized band energy at STFT hop resolution, indexed `[channel][band][frame]`.
#[derive(Clone, Debug)]
pub struct BandEnergies {
    series: [Vec<Vec<f32>>; 2],
    peak: f32,
}

impl BandEnergies {
    pub fn channel(&self, channel: Channel) -> &[Vec<f32>] {
        &self.series[channel.index()]
    }

    /// The shared divisor every series was normalized by.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn num_frames(&self) -> usize {
        self.series[0].first().map_or(0, Vec::len)
    }
}

/// Aggregates spectrogram magnitude into a fixed list of bands.
pub struct BandExtractor {
    bands: Vec<FrequencyBand>,
    stft: Stft,
}

impl BandExtractor {
    pub fn new(bands: &[FrequencyBand], n_fft: usize, hop_length: usize) -> Result<Self> {
        if bands.is_empty() {
            return Err(invalid_config("at least one frequency band is required"));
        }
        if n_fft == 0 {
            return Err(invalid_config("FFT window size must be positive"));
        }
        if hop_length == 0 {
            return Err(invalid_config("hop length must be positive"));
        }
        Ok(Self {
            bands: bands.to_vec(),
            stft: Stft::new(n_fft, hop_length),
        })
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    pub fn extract(&self, audio: &AudioBuffer) -> Result<BandEnergies> {
        audio.validate()?;

        let frequencies = self.stft.bin_frequencies(audio.sample_rate());
        let ranges: Vec<Range<usize>> = self
            .bands
            .iter()
            .map(|band| band.bin_range(&frequencies))
            .collect();

        for (band, range) in self.bands.iter().zip(&ranges) {
            if range.is_empty() {
                log::warn!(
                    "Band {}-{} Hz covers no FFT bins at {}Hz; its energy stays zero",
                    band.low_hz, band.high_hz, audio.sample_rate()
                );
            }
        }

        let (mut left, mut right) = if audio.channel_count() == 1 {
            let mono = self.raw_band_series(audio.channel(Channel::Left), &ranges);
            (mono.clone(), mono)
        } else {
            rayon::join(
                || self.raw_band_series(audio.channel(Channel::Left), &ranges),
                || self.raw_band_series(audio.channel(Channel::Right), &ranges),
            )
        };

        let max = left
            .iter()
            .chain(right.iter())
            .flat_map(|series| series.iter().copied())
            .fold(0.0f32, f32::max);
        let peak = if max > 0.0 { max } else { SILENT_PEAK };

        for series in left.iter_mut().chain(right.iter_mut()) {
            for v in series.iter_mut() {
                *v = (*v / peak).clamp(0.0, 1.0);
            }
        }

        log::debug!(
            "Extracted {} bands x {} frames, global peak {:.4}",
            self.bands.len(),
            left.first().map_or(0, Vec::len),
            peak
        );

        Ok(BandEnergies {
            series: [left, right],
            peak,
        })
    }

    /// Amplified mean magnitude per band, `[band][frame]`, before normalization.
    fn raw_band_series(&self, samples: &[f32], ranges: &[Range<usize>]) -> Vec<Vec<f32>> {
        let per_frame: Vec<Vec<f32>> = self.stft.map_frames(samples, |mags| {
            self.bands
                .iter()
                .zip(ranges)
                .map(|(band, range)| {
                    if range.is_empty() {
                        return 0.0;
                    }
                    let sum: f32 = mags[range.clone()].iter().sum();
                    sum / range.len() as f32 * band.amplification
                })
                .collect()
        });

        (0..self.bands.len())
            .map(|b| per_frame.iter().map(|frame| frame[b]).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * secs) as usize;
        (0..n)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    fn default_bands() -> Vec<FrequencyBand> {
        vec![
            FrequencyBand::new(20.0, 80.0, 2.0).unwrap(),
            FrequencyBand::new(80.0, 255.0, 14.0).unwrap(),
            FrequencyBand::new(255.0, 500.0, 3.0).unwrap(),
            FrequencyBand::new(500.0, 8000.0, 40.0).unwrap(),
        ]
    }

    #[test]
    fn band_validation() {
        assert!(FrequencyBand::new(100.0, 100.0, 1.0).is_err());
        assert!(FrequencyBand::new(200.0, 100.0, 1.0).is_err());
        assert!(FrequencyBand::new(20.0, 80.0, -1.0).is_err());
        assert!(FrequencyBand::new(f32::NAN, 80.0, 1.0).is_err());
        assert!(FrequencyBand::new(20.0, 80.0, 0.0).is_ok());
    }

    #[test]
    fn extractor_rejects_bad_parameters() {
        let bands = default_bands();
        assert!(BandExtractor::new(&[], 2048, 512).is_err());
        assert!(BandExtractor::new(&bands, 0, 512).is_err());
        assert!(BandExtractor::new(&bands, 2048, 0).is_err());
    }

    #[test]
    fn empty_audio_is_rejected() {
        let extractor = BandExtractor::new(&default_bands(), 2048, 512).unwrap();
        let err = extractor.extract(&AudioBuffer::mono(vec![], 44100)).unwrap_err();
        assert!(matches!(err, crate::VizError::InvalidAudio(_)));
        let err = extractor.extract(&AudioBuffer::mono(vec![0.0; 64], 0)).unwrap_err();
        assert!(matches!(err, crate::VizError::InvalidAudio(_)));
    }

    #[test]
    fn bin_range_is_half_open() {
        let freqs = [0.0, 10.0, 20.0, 30.0, 40.0];
        let band = FrequencyBand::new(10.0, 30.0, 1.0).unwrap();
        assert_eq!(band.bin_range(&freqs), 1..3);
        let narrow = FrequencyBand::new(11.0, 19.0, 1.0).unwrap();
        assert!(narrow.bin_range(&freqs).is_empty());
    }

    #[test]
    fn band_without_bins_is_all_zero() {
        // 8 kHz / 256 gives 31.25 Hz bins; 40-50 Hz holds none of them.
        let bands = vec![
            FrequencyBand::new(40.0, 50.0, 5.0).unwrap(),
            FrequencyBand::new(100.0, 4000.0, 1.0).unwrap(),
        ];
        let extractor = BandExtractor::new(&bands, 256, 64).unwrap();
        let audio = AudioBuffer::mono(sine(440.0, 0.5, 8000, 0.5), 8000);
        let energies = extractor.extract(&audio).unwrap();
        assert!(energies.channel(Channel::Left)[0].iter().all(|&v| v == 0.0));
        assert!(energies.channel(Channel::Left)[1].iter().any(|&v| v > 0.0));
    }

    #[test]
    fn mono_is_duplicated() {
        let extractor = BandExtractor::new(&default_bands(), 1024, 256).unwrap();
        let audio = AudioBuffer::mono(sine(150.0, 0.8, 16000, 0.5), 16000);
        let energies = extractor.extract(&audio).unwrap();
        assert_eq!(energies.channel(Channel::Left), energies.channel(Channel::Right));
    }

    #[test]
    fn global_max_reaches_one() {
        let extractor = BandExtractor::new(&default_bands(), 1024, 256).unwrap();
        let audio = AudioBuffer::stereo(
            sine(150.0, 0.2, 16000, 1.0),
            sine(1000.0, 0.9, 16000, 1.0),
            16000,
        )
        .unwrap();
        let energies = extractor.extract(&audio).unwrap();
        let max = Channel::BOTH
            .iter()
            .flat_map(|&c| energies.channel(c).iter().flatten().copied())
            .fold(0.0f32, f32::max);
        assert_abs_diff_eq!(max, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn silence_uses_epsilon_divisor() {
        let extractor = BandExtractor::new(&default_bands(), 1024, 256).unwrap();
        let energies = extractor
            .extract(&AudioBuffer::mono(vec![0.0; 16000], 16000))
            .unwrap();
        assert_eq!(energies.peak(), SILENT_PEAK);
        assert!(energies
            .channel(Channel::Left)
            .iter()
            .flatten()
            .all(|&v| v == 0.0));
    }

    #[test]
    fn output_stays_in_unit_range() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..12 {
            let sample_rate = 8000;
            let len = rng.random_range(1..6000);
            let left: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();
            let right: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();

            let bands: Vec<FrequencyBand> = (0..rng.random_range(1..6))
                .map(|_| {
                    let low = rng.random_range(0.0..3000.0f32);
                    let high = low + rng.random_range(1.0..1000.0f32);
                    FrequencyBand::new(low, high, rng.random_range(0.0..50.0)).unwrap()
                })
                .collect();

            let extractor = BandExtractor::new(&bands, 512, 128).unwrap();
            let audio = AudioBuffer::stereo(left, right, sample_rate).unwrap();
            let energies = extractor.extract(&audio).unwrap();

            for &c in &Channel::BOTH {
                assert_eq!(energies.channel(c).len(), bands.len());
                for series in energies.channel(c) {
                    assert_eq!(series.len(), 1 + len / 128);
                    assert!(series.iter().all(|&v| (0.0..=1.0).contains(&v)));
                }
            }
        }
    }

    #[test]
    fn normalization_cancels_input_scale() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<f32> = (0..8000).map(|_| rng.random_range(-0.5..0.5)).collect();
        let extractor = BandExtractor::new(&default_bands(), 1024, 256).unwrap();

        let base = extractor
            .extract(&AudioBuffer::mono(samples.clone(), 16000))
            .unwrap();

        for k in [0.01f32, 0.3, 1.7] {
            let scaled: Vec<f32> = samples.iter().map(|s| s * k).collect();
            let other = extractor.extract(&AudioBuffer::mono(scaled, 16000)).unwrap();
            for (a, b) in base
                .channel(Channel::Left)
                .iter()
                .flatten()
                .zip(other.channel(Channel::Left).iter().flatten())
            {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
            }
        }
    }
}
