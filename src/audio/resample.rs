/// Stretch or compress `series` to exactly `target_len` samples.
///
/// Output sample `i` reads the input at position `i * (M - 1) / (N - 1)`,
/// interpolating linearly between neighbours. The ends are clamped, so no
/// value outside the input's range is ever produced.
pub fn resample_linear(series: &[f32], target_len: usize) -> Vec<f32> {
    match (series.len(), target_len) {
        (_, 0) => Vec::new(),
        (0, n) => vec![0.0; n],
        (1, n) => vec![series[0]; n],
        (_, 1) => vec![series[0]],
        (m, n) => {
            let last = (m - 1) as f64;
            let step = last / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let pos = (i as f64 * step).min(last);
                    let lo = pos.floor() as usize;
                    let hi = (lo + 1).min(m - 1);
                    let frac = (pos - lo as f64) as f32;
                    series[lo] + (series[hi] - series[lo]) * frac
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn same_length_is_identity() {
        let series = vec![0.0, 0.5, 0.25, 1.0, 0.75];
        let out = resample_linear(&series, series.len());
        for (a, b) in series.iter().zip(&out) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn length_one_takes_first_value() {
        assert_eq!(resample_linear(&[0.3, 0.9, 0.1], 1), vec![0.3]);
    }

    #[test]
    fn constant_stays_constant() {
        let out = resample_linear(&[0.42; 7], 31);
        assert_eq!(out.len(), 31);
        assert!(out.iter().all(|&v| (v - 0.42).abs() < 1e-6));
    }

    #[test]
    fn single_sample_fills_output() {
        assert_eq!(resample_linear(&[0.8], 4), vec![0.8; 4]);
    }

    #[test]
    fn empty_target_and_empty_input() {
        assert!(resample_linear(&[1.0, 2.0], 0).is_empty());
        assert_eq!(resample_linear(&[], 3), vec![0.0; 3]);
    }

    #[test]
    fn upsample_interpolates_midpoints() {
        let out = resample_linear(&[0.0, 1.0, 0.0], 5);
        let expected: [f32; 5] = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (a, b) in out.iter().zip(&expected) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn downsample_hits_endpoints() {
        let series: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let out = resample_linear(&series, 12);
        assert_eq!(out.len(), 12);
        assert_abs_diff_eq!(out[0], 0.0);
        assert_abs_diff_eq!(out[11], 99.0, epsilon = 1e-4);
        assert!(out.windows(2).all(|w| w[1] >= w[0]));
    }
}
