use super::colormap::ColorTable;
use super::debug::{DebugOverlay, FrameDiagnostics, PointDiagnostic};
use super::draw::fill_circle;
use super::layout::{Anchor, AnchorLayout};
use super::{Frame, FrameSource};
use crate::audio::{BandTimeline, Channel};
use crate::error::{invalid_config, Result};

/// Geometry and gating settings for the dot equalizer.
#[derive(Clone, Debug, PartialEq)]
pub struct DotStyle {
    /// Dot field radius in pixels.
    pub radius: f32,
    /// Lattice points per axis.
    pub grid: usize,
    /// Base dot size at an anchor's center.
    pub center_size: f32,
    /// Base dot size on an anchor's rim.
    pub edge_size: f32,
    pub amplitude_threshold: f32,
}

impl DotStyle {
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(invalid_config(format!("dot field radius {} is invalid", self.radius)));
        }
        for (name, v) in [("center", self.center_size), ("edge", self.edge_size)] {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid_config(format!("{} dot size {} is invalid", name, v)));
            }
        }
        if !self.amplitude_threshold.is_finite() {
            return Err(invalid_config("amplitude threshold must be finite"));
        }
        Ok(())
    }

    /// Size before amplitude scaling: `edge` on the rim growing linearly to `center`.
    pub fn base_size(&self, distance: f32) -> f32 {
        self.edge_size + (self.center_size - self.edge_size) * (1.0 - distance)
    }
}

/// Paints one dot cluster per lattice point per anchor, one colored blob per band.
pub struct DotRenderer {
    timeline: BandTimeline,
    anchors: Vec<AnchorLayout>,
    colors: ColorTable,
    style: DotStyle,
    width: u32,
    height: u32,
    debug: Option<DebugOverlay>,
}

impl DotRenderer {
    pub fn new(
        timeline: BandTimeline,
        anchors: Vec<Anchor>,
        colors: ColorTable,
        style: DotStyle,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        style.validate()?;
        if width == 0 || height == 0 {
            return Err(invalid_config(format!("frame size {}x{} is empty", width, height)));
        }
        if colors.len() != timeline.num_bands() {
            return Err(invalid_config(format!(
                "{} colors for {} bands",
                colors.len(),
                timeline.num_bands()
            )));
        }

        let anchors = anchors
            .into_iter()
            .map(|a| AnchorLayout::build(a, width, height, style.radius, style.grid))
            .collect::<Vec<_>>();
        for layout in &anchors {
            log::debug!(
                "Anchor '{}' ({:?}) at {:?}: {} dots",
                layout.anchor.name,
                layout.anchor.channel,
                layout.center,
                layout.positions.len()
            );
        }

        Ok(Self {
            timeline,
            anchors,
            colors,
            style,
            width,
            height,
            debug: None,
        })
    }

    pub fn with_debug(mut self, overlay: DebugOverlay) -> Self {
        self.debug = Some(overlay);
        self
    }

    pub fn timeline(&self) -> &BandTimeline {
        &self.timeline
    }

    pub fn anchors(&self) -> &[AnchorLayout] {
        &self.anchors
    }

    /// True when every left-channel band at `frame_idx` is below the threshold.
    /// Right-channel energy never opens the gate.
    pub fn is_silent(&self, frame_idx: usize) -> bool {
        (0..self.timeline.num_bands()).all(|b| {
            self.timeline.value(Channel::Left, b, frame_idx) < self.style.amplitude_threshold
        })
    }

    /// Paint every point of `layout` and, when `collect` is set, return what was drawn.
    fn draw_anchor(
        &self,
        frame: &mut Frame,
        layout: &AnchorLayout,
        amplitudes: &[f32],
        collect: bool,
    ) -> Vec<PointDiagnostic> {
        let num_bands = amplitudes.len();
        let spread = (num_bands as f32 - 1.0) / 2.0;
        let (w, h) = (self.width as i32, self.height as i32);
        let mut records = Vec::new();

        for pos in &layout.positions {
            let distance = pos.distance();
            let base_size = self.style.base_size(distance);
            let mut radii = Vec::with_capacity(if collect { num_bands } else { 0 });

            for (band, (&amp, color)) in amplitudes.iter().zip(self.colors.iter()).enumerate() {
                let size = ((base_size * 2.0 * amp) as i32).max(1);
                let offset = (band as f32 - spread) * size as f32 / 3.0;
                let xi = (pos.x as f32 + offset) as i32;
                let yi = (pos.y as f32 + offset) as i32;
                if (0..w).contains(&xi) && (0..h).contains(&yi) {
                    fill_circle(frame, xi, yi, size / 2, color);
                }
                if collect {
                    radii.push(size / 2);
                }
            }

            if collect {
                records.push(PointDiagnostic {
                    position: (pos.x, pos.y),
                    distance,
                    base_size,
                    amplitudes: amplitudes.to_vec(),
                    radii,
                });
            }
        }
        records
    }
}

impl FrameSource for DotRenderer {
    fn frame_count(&self) -> usize {
        self.timeline.frame_count()
    }

    fn fps(&self) -> u32 {
        self.timeline.fps()
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render(&self, t: f32) -> Frame {
        let mut frame = Frame::new(self.width, self.height);
        if self.timeline.frame_count() == 0 {
            return frame;
        }

        let frame_idx = self.timeline.frame_index(t);
        if self.is_silent(frame_idx) {
            return frame;
        }

        let mut diagnostics = None;
        for layout in &self.anchors {
            let amplitudes = self.timeline.values_at(layout.anchor.channel, frame_idx);
            let collect = self.debug.is_some()
                && diagnostics.is_none()
                && layout.anchor.channel == Channel::Left;
            let records = self.draw_anchor(&mut frame, layout, &amplitudes, collect);
            if collect {
                diagnostics = Some((
                    layout.center.1,
                    FrameDiagnostics::aggregate(frame_idx, amplitudes, &records),
                ));
            }
        }

        if let (Some(overlay), Some((row_y, diag))) = (&self.debug, diagnostics) {
            overlay.draw(&mut frame, row_y.max(30), &diag, self.timeline.bands(), &self.colors);
        }
        frame
    }
}
