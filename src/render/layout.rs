use serde::{Deserialize, Serialize};

use crate::audio::Channel;

/// A point of the dot field: pixel center plus its normalized offset from
/// the anchor center, each axis in [-1, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DotPosition {
    pub x: i32,
    pub y: i32,
    pub x_norm: f32,
    pub y_norm: f32,
}

impl DotPosition {
    /// Distance from the anchor center in normalized units (0 at the center, 1 on the rim).
    pub fn distance(&self) -> f32 {
        (self.x_norm * self.x_norm + self.y_norm * self.y_norm).sqrt()
    }
}

/// Grid points of a `grid × grid` lattice over [-1, 1]² that fall inside
/// the unit circle, scaled by `radius` and moved to `center`.
///
/// The lattice is scanned `x` outer, `y` inner; the output depends on nothing
/// but the arguments.
pub fn dot_field(center: (i32, i32), radius: f32, grid: usize) -> Vec<DotPosition> {
    let axis = |i: usize| -> f32 {
        if grid > 1 {
            -1.0 + 2.0 * i as f32 / (grid - 1) as f32
        } else {
            0.0
        }
    };

    let mut positions = Vec::with_capacity(grid * grid);
    for i in 0..grid {
        let x_norm = axis(i);
        for j in 0..grid {
            let y_norm = axis(j);
            if x_norm * x_norm + y_norm * y_norm <= 1.0 {
                positions.push(DotPosition {
                    x: (center.0 as f32 + x_norm * radius) as i32,
                    y: (center.1 as f32 + y_norm * radius) as i32,
                    x_norm,
                    y_norm,
                });
            }
        }
    }
    positions
}

/// Where a dot field sits on screen and which channel drives it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Anchor {
    pub name: String,
    pub channel: Channel,
    /// Horizontal center as a percentage of frame width.
    pub x_percent: f32,
    /// Vertical center as a percentage of frame height.
    pub y_percent: f32,
}

impl Anchor {
    pub fn new(name: impl Into<String>, channel: Channel, x_percent: f32, y_percent: f32) -> Self {
        Self {
            name: name.into(),
            channel,
            x_percent,
            y_percent,
        }
    }

    /// Left speaker at 10% width and right speaker at 90%, both at `y_percent`.
    pub fn speaker_pair(y_percent: f32) -> Vec<Anchor> {
        vec![
            Anchor::new("left", Channel::Left, 10.0, y_percent),
            Anchor::new("right", Channel::Right, 90.0, y_percent),
        ]
    }

    pub fn center(&self, width: u32, height: u32) -> (i32, i32) {
        (
            (width as f32 * self.x_percent / 100.0) as i32,
            (height as f32 * self.y_percent / 100.0) as i32,
        )
    }
}

/// An anchor with its precomputed dot field.
#[derive(Clone, Debug)]
pub struct AnchorLayout {
    pub anchor: Anchor,
    pub center: (i32, i32),
    pub positions: Vec<DotPosition>,
}

impl AnchorLayout {
    pub fn build(anchor: Anchor, width: u32, height: u32, radius: f32, grid: usize) -> Self {
        let center = anchor.center(width, height);
        let positions = dot_field(center, radius, grid);
        if positions.is_empty() {
            log::warn!("Anchor '{}' has no dots (grid={}, radius={})", anchor.name, grid, radius);
        }
        Self {
            anchor,
            center,
            positions,
        }
    }
}
