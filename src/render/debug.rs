use image::Rgb;

use super::colormap::ColorTable;
use super::draw::{blend_rect, fill_rect};
use super::text::TextOverlay;
use super::Frame;
use crate::audio::FrequencyBand;

const LINE_HEIGHT: i32 = 30;
const PANEL_WIDTH: i32 = 520;
const METER_HEIGHT: i32 = 4;

/// What one dot-field point drew on one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PointDiagnostic {
    pub position: (i32, i32),
    pub distance: f32,
    pub base_size: f32,
    pub amplitudes: Vec<f32>,
    /// Radius painted for each band, in band order.
    pub radii: Vec<i32>,
}

/// Per-band summary of one frame, built from the point records of a single anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDiagnostics {
    pub frame_index: usize,
    pub amplitudes: Vec<f32>,
    pub mean_radii: Vec<f32>,
}

impl FrameDiagnostics {
    pub fn aggregate(frame_index: usize, amplitudes: Vec<f32>, points: &[PointDiagnostic]) -> Self {
        let num_bands = amplitudes.len();
        let mut totals = vec![0.0f32; num_bands];
        for point in points {
            for (total, &r) in totals.iter_mut().zip(&point.radii) {
                *total += r as f32;
            }
        }
        let mean_radii = if points.is_empty() {
            vec![0.0; num_bands]
        } else {
            totals.iter().map(|t| t / points.len() as f32).collect()
        };
        Self {
            frame_index,
            amplitudes,
            mean_radii,
        }
    }

    pub fn lines(&self, bands: &[FrequencyBand]) -> Vec<String> {
        bands
            .iter()
            .zip(self.amplitudes.iter().zip(&self.mean_radii))
            .enumerate()
            .map(|(i, (band, (amp, size)))| {
                format!(
                    "Band {} ({:6.0}-{:6.0} Hz): {:6.0}% Size: {:5.2}",
                    i + 1,
                    band.low_hz(),
                    band.high_hz(),
                    amp * 100.0,
                    size
                )
            })
            .collect()
    }
}

/// Half-transparent panel listing per-band amplitude and mean dot size.
pub struct DebugOverlay {
    text: Option<TextOverlay>,
}

impl DebugOverlay {
    pub fn new(text: Option<TextOverlay>) -> Self {
        Self { text }
    }

    /// Panel centered horizontally, its first line at `row_y`.
    pub fn draw(
        &self,
        frame: &mut Frame,
        row_y: i32,
        diagnostics: &FrameDiagnostics,
        bands: &[FrequencyBand],
        colors: &ColorTable,
    ) {
        let lines = diagnostics.lines(bands);
        let panel_width = match self.text {
            Some(ref text) => lines
                .iter()
                .map(|l| text.measure_width(l) as i32 + 20)
                .fold(PANEL_WIDTH, i32::max),
            None => PANEL_WIDTH,
        };
        let x = frame.width() as i32 / 2 - panel_width / 2;
        let top = row_y - LINE_HEIGHT;
        blend_rect(
            frame,
            x - 10,
            top,
            panel_width + 10,
            LINE_HEIGHT * (lines.len() as i32 + 1),
            Rgb([0, 0, 0]),
            0.5,
        );

        for (i, line) in lines.iter().enumerate() {
            let line_top = top + i as i32 * LINE_HEIGHT;
            if let Some(ref text) = self.text {
                text.composite(frame, line, x, line_top + 4, Rgb([255, 255, 255]));
            }
            let amp = diagnostics.amplitudes.get(i).copied().unwrap_or(0.0);
            let meter = ((panel_width - 20) as f32 * amp.clamp(0.0, 1.0)) as i32;
            let color = if i < colors.len() { colors.get(i) } else { Rgb([255, 255, 255]) };
            fill_rect(
                frame,
                x,
                line_top + LINE_HEIGHT - METER_HEIGHT - 2,
                meter,
                METER_HEIGHT,
                color,
            );
        }
        log::trace!("frame {}: {}", diagnostics.frame_index, lines.join(" | "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::colormap::Colormap;

    fn point(radii: Vec<i32>) -> PointDiagnostic {
        PointDiagnostic {
            position: (0, 0),
            distance: 0.0,
            base_size: 10.0,
            amplitudes: vec![0.5; radii.len()],
            radii,
        }
    }

    #[test]
    fn aggregate_averages_radii() {
        let points = vec![point(vec![2, 4]), point(vec![4, 8])];
        let diag = FrameDiagnostics::aggregate(3, vec![0.1, 0.9], &points);
        assert_eq!(diag.mean_radii, vec![3.0, 6.0]);
        assert_eq!(diag.frame_index, 3);

        let empty = FrameDiagnostics::aggregate(0, vec![0.0, 0.0], &[]);
        assert_eq!(empty.mean_radii, vec![0.0, 0.0]);
    }

    #[test]
    fn lines_describe_each_band() {
        let bands = vec![FrequencyBand::new(20.0, 80.0, 1.0).unwrap()];
        let diag = FrameDiagnostics::aggregate(0, vec![0.5], &[point(vec![7])]);
        let lines = diag.lines(&bands);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Band 1"));
        assert!(lines[0].contains("50%"));
        assert!(lines[0].contains("7.00"));
    }

    #[test]
    fn panel_draws_meters_without_font() {
        let bands = vec![
            FrequencyBand::new(20.0, 80.0, 1.0).unwrap(),
            FrequencyBand::new(80.0, 200.0, 1.0).unwrap(),
        ];
        let colors = ColorTable::evenly_spaced(Colormap::Jet, 2);
        let diag = FrameDiagnostics::aggregate(0, vec![1.0, 0.0], &[]);
        let mut frame = Frame::new(800, 200);
        DebugOverlay::new(None).draw(&mut frame, 60, &diag, &bands, &colors);

        let x = 400 - PANEL_WIDTH / 2;
        let meter_y = (60 - LINE_HEIGHT + LINE_HEIGHT - METER_HEIGHT - 2) as u32;
        assert_eq!(frame.get_pixel(x as u32 + 5, meter_y), &colors.get(0));
    }
}
