use std::fmt;
use std::str::FromStr;

use image::Rgb;

use crate::error::{invalid_config, Result, VizError};

/// Named colormaps. Values are close approximations of the OpenCV and
/// matplotlib lookup tables of the same name, produced directly in RGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Colormap {
    Autumn,
    Bone,
    Jet,
    Winter,
    Rainbow,
    Ocean,
    Summer,
    Spring,
    Cool,
    Hsv,
    Hot,
    Magma,
    Inferno,
    Plasma,
    Viridis,
    Turbo,
    Gray,
}

const VIRIDIS: &[[u8; 3]] = &[[68, 1, 84], [59, 82, 139], [33, 145, 140], [94, 201, 98], [253, 231, 37]];
const MAGMA: &[[u8; 3]] = &[
    [0, 0, 4],
    [59, 15, 112],
    [140, 41, 129],
    [222, 73, 104],
    [254, 159, 109],
    [252, 253, 191],
];
const INFERNO: &[[u8; 3]] = &[
    [0, 0, 4],
    [66, 10, 104],
    [147, 38, 103],
    [221, 81, 58],
    [252, 165, 10],
    [252, 255, 164],
];
const PLASMA: &[[u8; 3]] = &[
    [13, 8, 135],
    [106, 0, 168],
    [177, 42, 144],
    [225, 100, 98],
    [252, 166, 54],
    [240, 249, 33],
];
const TURBO: &[[u8; 3]] = &[
    [48, 18, 59],
    [70, 134, 251],
    [27, 229, 181],
    [164, 252, 60],
    [251, 185, 56],
    [228, 70, 14],
    [122, 4, 3],
];

impl Colormap {
    pub const ALL: [Colormap; 17] = [
        Colormap::Autumn,
        Colormap::Bone,
        Colormap::Jet,
        Colormap::Winter,
        Colormap::Rainbow,
        Colormap::Ocean,
        Colormap::Summer,
        Colormap::Spring,
        Colormap::Cool,
        Colormap::Hsv,
        Colormap::Hot,
        Colormap::Magma,
        Colormap::Inferno,
        Colormap::Plasma,
        Colormap::Viridis,
        Colormap::Turbo,
        Colormap::Gray,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Autumn => "autumn",
            Colormap::Bone => "bone",
            Colormap::Jet => "jet",
            Colormap::Winter => "winter",
            Colormap::Rainbow => "rainbow",
            Colormap::Ocean => "ocean",
            Colormap::Summer => "summer",
            Colormap::Spring => "spring",
            Colormap::Cool => "cool",
            Colormap::Hsv => "hsv",
            Colormap::Hot => "hot",
            Colormap::Magma => "magma",
            Colormap::Inferno => "inferno",
            Colormap::Plasma => "plasma",
            Colormap::Viridis => "viridis",
            Colormap::Turbo => "turbo",
            Colormap::Gray => "gray",
        }
    }

    /// Color at `x` in [0, 1]. Like an 8-bit lookup table, `x` is first
    /// quantized to one of 256 levels.
    pub fn sample(self, x: f32) -> Rgb<u8> {
        let level = (x.clamp(0.0, 1.0) * 255.0) as u8;
        let x = level as f32 / 255.0;

        let [r, g, b] = match self {
            Colormap::Autumn => [1.0, x, 0.0],
            Colormap::Bone => {
                let hot = hot(x);
                [
                    (7.0 * x + hot[2]) / 8.0,
                    (7.0 * x + hot[1]) / 8.0,
                    (7.0 * x + hot[0]) / 8.0,
                ]
            }
            Colormap::Jet => [
                unit(1.5 - (4.0 * x - 3.0).abs()),
                unit(1.5 - (4.0 * x - 2.0).abs()),
                unit(1.5 - (4.0 * x - 1.0).abs()),
            ],
            Colormap::Winter => [0.0, x, 1.0 - 0.5 * x],
            Colormap::Rainbow => hue(0.8 * x),
            Colormap::Ocean => [unit(3.0 * x - 2.0), ((3.0 * x - 1.0) / 2.0).abs(), x],
            Colormap::Summer => [x, 0.5 + 0.5 * x, 0.4],
            Colormap::Spring => [1.0, x, 1.0 - x],
            Colormap::Cool => [x, 1.0 - x, 1.0],
            Colormap::Hsv => hue(x),
            Colormap::Hot => hot(x),
            Colormap::Magma => return stops(MAGMA, x),
            Colormap::Inferno => return stops(INFERNO, x),
            Colormap::Plasma => return stops(PLASMA, x),
            Colormap::Viridis => return stops(VIRIDIS, x),
            Colormap::Turbo => return stops(TURBO, x),
            Colormap::Gray => [x, x, x],
        };
        Rgb([to_byte(r), to_byte(g), to_byte(b)])
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = VizError;

    /// Accepts `jet`, `JET` and the OpenCV spelling `COLORMAP_JET`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("colormap_").unwrap_or(&lower);
        let name = if name == "grey" { "gray" } else { name };
        Colormap::ALL
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .ok_or_else(|| invalid_config(format!("unknown colormap '{}'", s)))
    }
}

fn unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

fn to_byte(v: f32) -> u8 {
    (unit(v) * 255.0).round() as u8
}

fn hot(x: f32) -> [f32; 3] {
    [unit(3.0 * x), unit(3.0 * x - 1.0), unit(3.0 * x - 2.0)]
}

/// Fully saturated color at hue `h` in turns (0 = red).
fn hue(h: f32) -> [f32; 3] {
    let h6 = h.rem_euclid(1.0) * 6.0;
    [
        unit((h6 - 3.0).abs() - 1.0),
        unit(2.0 - (h6 - 2.0).abs()),
        unit(2.0 - (h6 - 4.0).abs()),
    ]
}

/// Piecewise-linear interpolation across evenly spaced color stops.
fn stops(table: &[[u8; 3]], x: f32) -> Rgb<u8> {
    let span = (table.len() - 1) as f32;
    let pos = x * span;
    let lo = (pos.floor() as usize).min(table.len() - 1);
    let hi = (lo + 1).min(table.len() - 1);
    let frac = pos - lo as f32;
    let mix = |c: usize| {
        let a = table[lo][c] as f32;
        let b = table[hi][c] as f32;
        (a + (b - a) * frac).round() as u8
    };
    Rgb([mix(0), mix(1), mix(2)])
}

/// One RGB color per frequency band, sampled once per run.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorTable {
    colors: Vec<Rgb<u8>>,
}

impl ColorTable {
    pub fn new(colormap: Colormap, positions: &[f32]) -> Result<Self> {
        if let Some(bad) = positions.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(invalid_config(format!(
                "colormap position {} is outside [0, 1]",
                bad
            )));
        }
        Ok(Self {
            colors: positions.iter().map(|&p| colormap.sample(p)).collect(),
        })
    }

    /// `count` positions spread evenly over [0, 1].
    pub fn evenly_spaced(colormap: Colormap, count: usize) -> Self {
        let colors = (0..count)
            .map(|i| {
                let p = if count > 1 { i as f32 / (count - 1) as f32 } else { 0.0 };
                colormap.sample(p)
            })
            .collect();
        Self { colors }
    }

    /// Table for `num_bands` bands. Explicit positions must match the band
    /// count exactly; without them the positions are spread evenly.
    pub fn for_bands(colormap: Colormap, positions: Option<&[f32]>, num_bands: usize) -> Result<Self> {
        match positions {
            Some(p) if p.len() != num_bands => Err(invalid_config(format!(
                "{} colormap positions given for {} bands",
                p.len(),
                num_bands
            ))),
            Some(p) => Self::new(colormap, p),
            None => Ok(Self::evenly_spaced(colormap, num_bands)),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, band: usize) -> Rgb<u8> {
        self.colors[band]
    }

    pub fn iter(&self) -> impl Iterator<Item = Rgb<u8>> + '_ {
        self.colors.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_opencv_names() {
        assert_eq!("COLORMAP_JET".parse::<Colormap>().unwrap(), Colormap::Jet);
        assert_eq!("magma".parse::<Colormap>().unwrap(), Colormap::Magma);
        assert_eq!(" Viridis ".parse::<Colormap>().unwrap(), Colormap::Viridis);
        assert_eq!("grey".parse::<Colormap>().unwrap(), Colormap::Gray);
        assert!("COLORMAP_NOPE".parse::<Colormap>().is_err());
    }

    #[test]
    fn names_round_trip() {
        for cmap in Colormap::ALL {
            assert_eq!(cmap.name().parse::<Colormap>().unwrap(), cmap);
        }
    }

    #[test]
    fn jet_endpoints() {
        // Dark blue at the bottom, dark red at the top, channel order RGB.
        assert_eq!(Colormap::Jet.sample(0.0), Rgb([0, 0, 128]));
        assert_eq!(Colormap::Jet.sample(1.0), Rgb([128, 0, 0]));
        let mid = Colormap::Jet.sample(0.5);
        assert!(mid[1] > 200);
    }

    #[test]
    fn gray_is_linear() {
        assert_eq!(Colormap::Gray.sample(0.0), Rgb([0, 0, 0]));
        assert_eq!(Colormap::Gray.sample(1.0), Rgb([255, 255, 255]));
        assert_eq!(Colormap::Gray.sample(2.0), Rgb([255, 255, 255]));
    }

    #[test]
    fn stop_tables_hit_their_ends() {
        assert_eq!(Colormap::Viridis.sample(0.0), Rgb([68, 1, 84]));
        assert_eq!(Colormap::Viridis.sample(1.0), Rgb([253, 231, 37]));
        assert_eq!(Colormap::Magma.sample(1.0), Rgb([252, 253, 191]));
    }

    #[test]
    fn table_follows_positions() {
        let table = ColorTable::new(Colormap::Gray, &[0.0, 1.0]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Rgb([0, 0, 0]));
        assert_eq!(table.get(1), Rgb([255, 255, 255]));
        assert!(ColorTable::new(Colormap::Gray, &[1.5]).is_err());
    }

    #[test]
    fn band_count_mismatch_fails_fast() {
        let positions = [0.0, 0.33, 0.66, 1.0];
        assert!(ColorTable::for_bands(Colormap::Jet, Some(&positions), 4).is_ok());
        let err = ColorTable::for_bands(Colormap::Jet, Some(&positions), 3).unwrap_err();
        assert!(matches!(err, VizError::InvalidConfig(_)));
        let even = ColorTable::for_bands(Colormap::Jet, None, 5).unwrap();
        assert_eq!(even.len(), 5);
        assert_eq!(even.get(0), Colormap::Jet.sample(0.0));
        assert_eq!(even.get(4), Colormap::Jet.sample(1.0));
    }
}
