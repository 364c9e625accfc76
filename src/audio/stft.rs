use std::sync::Arc;

use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Magnitude-only short-time Fourier transform.
///
/// Frames are centered: the signal is zero-padded by `n_fft / 2` on each side,
/// so frame `f` is centered on sample `f * hop_length` and there are
/// `1 + len / hop_length` frames. Each frame yields `n_fft / 2 + 1` bins.
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            n_fft,
            hop_length,
            window: hann_window(n_fft),
            fft: planner.plan_fft_forward(n_fft),
        }
    }

    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub fn num_frames(&self, num_samples: usize) -> usize {
        1 + num_samples / self.hop_length
    }

    /// Center frequency of every bin for the given sample rate.
    pub fn bin_frequencies(&self, sample_rate: u32) -> Vec<f32> {
        let resolution = sample_rate as f32 / self.n_fft as f32;
        (0..self.num_bins()).map(|k| k as f32 * resolution).collect()
    }

    /// Run the transform and hand each frame's magnitudes to `reduce`,
    /// collecting one result per frame in order. Frames are processed in
    /// parallel; `reduce` must not depend on other frames.
    pub fn map_frames<T, F>(&self, samples: &[f32], reduce: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&[f32]) -> T + Sync,
    {
        let half = self.n_fft / 2;
        let bins = self.num_bins();

        (0..self.num_frames(samples.len()))
            .into_par_iter()
            .map_init(
                || {
                    (
                        vec![Complex::new(0.0f32, 0.0); self.n_fft],
                        vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()],
                        vec![0.0f32; bins],
                    )
                },
                |(buffer, scratch, mags), frame_idx| {
                    // Padded index p maps to sample p - half.
                    let origin = (frame_idx * self.hop_length) as isize - half as isize;
                    for (i, slot) in buffer.iter_mut().enumerate() {
                        let idx = origin + i as isize;
                        let s = if idx >= 0 && (idx as usize) < samples.len() {
                            samples[idx as usize]
                        } else {
                            0.0
                        };
                        *slot = Complex::new(s * self.window[i], 0.0);
                    }

                    self.fft.process_with_scratch(buffer, scratch);

                    for (m, c) in mags.iter_mut().zip(buffer.iter()) {
                        *m = c.norm();
                    }
                    reduce(mags)
                },
            )
            .collect()
    }
}

/// Periodic Hann window (the DFT-even form used for spectral analysis).
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn frame_and_bin_counts() {
        let stft = Stft::new(2048, 512);
        assert_eq!(stft.num_bins(), 1025);
        assert_eq!(stft.num_frames(44100), 87);
        assert_eq!(stft.num_frames(0), 1);

        let freqs = stft.bin_frequencies(44100);
        assert_eq!(freqs.len(), 1025);
        assert_relative_eq!(freqs[1], 44100.0 / 2048.0);
        assert_relative_eq!(freqs[1024], 22050.0, epsilon = 1e-2);
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let sr = 8000;
        let n_fft = 1024;
        // 1000 Hz lands exactly on bin 128.
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sr as f32).sin())
            .collect();

        let stft = Stft::new(n_fft, 256);
        let peaks = stft.map_frames(&samples, |mags| {
            mags.iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(k, _)| k)
                .unwrap_or(0)
        });

        // Skip the half-padded edge frames.
        let interior = &peaks[4..peaks.len() - 4];
        assert!(interior.iter().all(|&k| k == 128), "peaks: {:?}", interior);
    }

    #[test]
    fn silence_has_zero_magnitude() {
        let stft = Stft::new(256, 64);
        let sums = stft.map_frames(&[0.0; 1000], |mags| mags.iter().sum::<f32>());
        assert_eq!(sums.len(), stft.num_frames(1000));
        assert!(sums.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w[0], 0.0);
        assert_relative_eq!(w[4], 1.0, epsilon = 1e-6);
        assert_relative_eq!(w[2], w[6], epsilon = 1e-6);
    }
}
