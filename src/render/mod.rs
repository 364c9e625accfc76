pub mod bars;
pub mod colormap;
pub mod debug;
pub mod dots;
pub mod draw;
pub mod layout;
pub mod text;

pub use bars::{BarRenderer, BarStyle};
pub use colormap::{ColorTable, Colormap};
pub use dots::{DotRenderer, DotStyle};
pub use layout::{Anchor, DotPosition};

/// `height × width` 8-bit RGB image, fresh per render call.
pub type Frame = image::RgbImage;

/// A pull-based visual: one frame for any playback time.
pub trait FrameSource: Sync {
    fn frame_count(&self) -> usize;

    fn fps(&self) -> u32;

    fn size(&self) -> (u32, u32);

    /// Render the frame shown at `t` seconds. Out-of-range times clamp to
    /// the first or last frame.
    fn render(&self, t: f32) -> Frame;

    /// Time at the middle of frame `idx`, so `floor(t * fps)` lands on `idx`.
    fn frame_time(&self, idx: usize) -> f32 {
        (idx as f64 + 0.5) as f32 / self.fps().max(1) as f32
    }
}
