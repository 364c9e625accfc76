use image::Rgb;

use super::Frame;

/// Filled disc of integer `radius` around `(cx, cy)`, clipped to the frame.
/// Radius 0 paints the single center pixel.
pub fn fill_circle(frame: &mut Frame, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    let (cx, cy, radius) = (cx as i64, cy as i64, radius.max(0) as i64);
    let r2 = radius * radius;

    // Only rows inside the frame.
    let y0 = (cy - radius).max(0);
    let y1 = (cy + radius).min(h - 1);
    for y in y0..=y1 {
        let dy = y - cy;
        // Widest dx on this row.
        let span = ((r2 - dy * dy) as f64).sqrt() as i64;
        let x0 = (cx - span).max(0);
        let x1 = (cx + span).min(w - 1);
        for x in x0..=x1 {
            frame.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Axis-aligned rectangle covering `[x, x + w) × [y, y + h)`, clipped to the frame.
pub fn fill_rect(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32, color: Rgb<u8>) {
    blend_rect(frame, x, y, w, h, color, 1.0);
}

/// Like [`fill_rect`] but mixed over the existing pixels with `alpha` in [0, 1].
pub fn blend_rect(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32, color: Rgb<u8>, alpha: f32) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(frame.width() as i32);
    let y1 = (y + h).min(frame.height() as i32);
    let a = alpha.clamp(0.0, 1.0);

    for py in y0..y1 {
        for px in x0..x1 {
            let pixel = frame.get_pixel_mut(px as u32, py as u32);
            for c in 0..3 {
                pixel[c] = (color[c] as f32 * a + pixel[c] as f32 * (1.0 - a)).round() as u8;
            }
        }
    }
}
