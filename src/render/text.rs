use std::path::Path;

use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use image::Rgb;

use super::Frame;

pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn from_bytes(bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font, font_size })
    }

    pub fn from_file(path: &Path, font_size: f32) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;
        Self::from_bytes(&bytes, font_size)
    }

    /// Composite text onto an RGB frame with its top-left corner at `(x, y)`.
    pub fn composite(&self, frame: &mut Frame, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        let (width, height) = (frame.width() as i32, frame.height() as i32);
        let mut cursor_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }

                    let px = cursor_x + metrics.xmin + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px >= width || py >= height {
                        continue;
                    }

                    let a = alpha as f32 / 255.0;
                    let pixel = frame.get_pixel_mut(px as u32, py as u32);
                    for c in 0..3 {
                        pixel[c] = (color[c] as f32 * a + pixel[c] as f32 * (1.0 - a)) as u8;
                    }
                }
            }

            cursor_x += metrics.advance_width.round() as i32;
        }
    }

    /// Measure the width of rendered text in pixels.
    pub fn measure_width(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        width.ceil() as u32
    }
}
