/// Screen regions
///
/// HUD elements sit at fixed fractions of the game window, so every detector
/// is pointed at a `NormalizedRegion` which is mapped to pixels for the
/// current window size right before use.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fractional rectangle `(x, y, w, h)` relative to window width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct NormalizedRegion {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl NormalizedRegion {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// The whole window.
    pub const FULL: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    /// Convert to a pixel rectangle for a window of `width` x `height`.
    ///
    /// Each product is truncated toward zero. Nothing is validated: fractions
    /// outside `[0, 1]` produce rectangles outside the window, so callers clip
    /// with [`AbsoluteRegion::clip_to`] before touching pixels.
    pub fn map(&self, width: u32, height: u32) -> AbsoluteRegion {
        AbsoluteRegion {
            x: (self.x * width as f64) as i32,
            y: (self.y * height as f64) as i32,
            w: (self.w * width as f64) as i32,
            h: (self.h * height as f64) as i32,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

impl From<[f64; 4]> for NormalizedRegion {
    fn from(arr: [f64; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }
}

impl From<NormalizedRegion> for [f64; 4] {
    fn from(region: NormalizedRegion) -> Self {
        region.to_array()
    }
}

/// Pixel rectangle. May lie partly or fully outside the frame until clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AbsoluteRegion {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl AbsoluteRegion {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Intersect with `[0, width) x [0, height)`.
    ///
    /// The result is never negative; a rectangle with no overlap comes back
    /// with zero width or height.
    pub fn clip_to(&self, width: u32, height: u32) -> AbsoluteRegion {
        let (fw, fh) = (width as i64, height as i64);
        let x0 = (self.x as i64).clamp(0, fw);
        let y0 = (self.y as i64).clamp(0, fh);
        let x1 = (self.x as i64 + self.w.max(0) as i64).clamp(x0, fw);
        let y1 = (self.y as i64 + self.h.max(0) as i64).clamp(y0, fh);

        AbsoluteRegion {
            x: x0 as i32,
            y: y0 as i32,
            w: (x1 - x0) as i32,
            h: (y1 - y0) as i32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// True when the rectangle lies completely inside a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.w as i64 <= width as i64
            && self.y as i64 + self.h as i64 <= height as i64
    }
}

/// The named HUD regions a snapshot reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    #[serde(rename = "score_region")]
    Score,
    #[serde(rename = "train_region")]
    Trains,
    #[serde(rename = "tunnel_region")]
    Tunnels,
    #[serde(rename = "lines_region")]
    Lines,
    #[serde(rename = "station_map_region")]
    StationMap,
    #[serde(rename = "wagon_region")]
    Wagons,
}

impl RegionKind {
    pub const ALL: [RegionKind; 6] = [
        RegionKind::Score,
        RegionKind::Trains,
        RegionKind::Tunnels,
        RegionKind::Lines,
        RegionKind::StationMap,
        RegionKind::Wagons,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RegionKind::Score => "score_region",
            RegionKind::Trains => "train_region",
            RegionKind::Tunnels => "tunnel_region",
            RegionKind::Lines => "lines_region",
            RegionKind::StationMap => "station_map_region",
            RegionKind::Wagons => "wagon_region",
        }
    }

    /// Default placement, tuned to the game's fixed HUD layout.
    pub fn default_region(&self) -> NormalizedRegion {
        match self {
            RegionKind::Score => NormalizedRegion::new(0.80, 0.00, 0.18, 0.10),
            RegionKind::Trains => NormalizedRegion::new(0.10, 0.85, 0.20, 0.10),
            RegionKind::Tunnels => NormalizedRegion::new(0.70, 0.85, 0.20, 0.10),
            RegionKind::Lines => NormalizedRegion::new(0.35, 0.85, 0.30, 0.10),
            RegionKind::StationMap => NormalizedRegion::new(0.00, 0.00, 1.00, 0.80),
            RegionKind::Wagons => NormalizedRegion::new(0.10, 0.75, 0.20, 0.10),
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Region table with defaults for every kind.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTable {
    regions: [NormalizedRegion; 6],
}

impl Default for RegionTable {
    fn default() -> Self {
        Self {
            regions: RegionKind::ALL.map(|kind| kind.default_region()),
        }
    }
}

impl RegionTable {
    /// Defaults merged per key with `overrides`; absent kinds keep their default.
    pub fn with_overrides(overrides: &HashMap<RegionKind, NormalizedRegion>) -> Self {
        let mut table = Self::default();
        for (kind, region) in overrides {
            table.set(*kind, *region);
        }
        table
    }

    pub fn get(&self, kind: RegionKind) -> NormalizedRegion {
        self.regions[kind.index()]
    }

    pub fn set(&mut self, kind: RegionKind, region: NormalizedRegion) {
        self.regions[kind.index()] = region;
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegionKind, NormalizedRegion)> + '_ {
        RegionKind::ALL.iter().map(move |kind| (*kind, self.get(*kind)))
    }
}
