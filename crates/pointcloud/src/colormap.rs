//! Scalar to RGB colour mapping

use std::fmt;
use std::str::FromStr;

pub type Rgb = [f32; 3];

/// Named colour ramps; all take `t` in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    Gray,
    Hot,
    Viridis,
    Jet,
    #[default]
    Rainbow,
    Terrain,
    Ocean,
}

impl Colormap {
    pub const ALL: [Colormap; 7] = [
        Self::Gray,
        Self::Hot,
        Self::Viridis,
        Self::Jet,
        Self::Rainbow,
        Self::Terrain,
        Self::Ocean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gray => "gray",
            Self::Hot => "hot",
            Self::Viridis => "viridis",
            Self::Jet => "jet",
            Self::Rainbow => "rainbow",
            Self::Terrain => "terrain",
            Self::Ocean => "ocean",
        }
    }

    pub fn sample(&self, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Gray => [t, t, t],
            Self::Hot => [
                (t * 3.0).min(1.0),
                (t * 3.0 - 1.0).clamp(0.0, 1.0),
                (t * 3.0 - 2.0).max(0.0),
            ],
            Self::Viridis => [t.sqrt(), t * t, 1.0 - t],
            Self::Jet => {
                let s = t * 4.0;
                [
                    (s - 1.5).min(4.5 - s).clamp(0.0, 1.0),
                    (s - 0.5).min(3.5 - s).clamp(0.0, 1.0),
                    (s + 0.5).min(2.5 - s).clamp(0.0, 1.0),
                ]
            }
            Self::Rainbow => {
                let s = t * 5.0;
                [
                    (s - 1.0).min(4.0 - s).clamp(0.0, 1.0),
                    s.min(3.0 - s).clamp(0.0, 1.0),
                    (2.0 - s).clamp(0.0, 1.0),
                ]
            }
            Self::Terrain => [0.5 + 0.5 * t, 0.3 + 0.4 * (1.0 - t), 0.8 * (1.0 - t)],
            Self::Ocean => [0.2 * t, 0.4 + 0.4 * t, 0.6 + 0.4 * t],
        }
    }

    /// Normalise `values` to `[0, 1]` and map each through the ramp
    pub fn apply(&self, values: &[f64]) -> Vec<Rgb> {
        normalize(values)
            .into_iter()
            .map(|t| self.sample(t))
            .collect()
    }
}

/// `(v - min) / (max - min + 1e-8)`
pub fn normalize(values: &[f64]) -> Vec<f32> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min + 1e-8;
    values.iter().map(|v| ((v - min) / span) as f32).collect()
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown colormap '{s}' (gray, hot, viridis, jet, rainbow, terrain, ocean)")
            })
    }
}

/// Scalar the colours are derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorBy {
    #[default]
    Height,
    Intensity,
    /// One flat colour per input file
    File,
    None,
}

impl ColorBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Intensity => "intensity",
            Self::File => "file",
            Self::None => "none",
        }
    }
}

impl fmt::Display for ColorBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "height" => Ok(Self::Height),
            "intensity" => Ok(Self::Intensity),
            "file" => Ok(Self::File),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown colour source '{other}' (height, intensity, file, none)"
            )),
        }
    }
}

/// Flat colour of file `index` out of `count`: `[t, 1 - t, 0.5]`
pub fn file_color(index: usize, count: usize) -> Rgb {
    let t = index as f32 / count.saturating_sub(1).max(1) as f32;
    [t, 1.0 - t, 0.5]
}
