/// Color handling
///
/// Colors are reported in `(b, g, r)` order, which is what the capture side
/// and the game palette tables use. HSV follows the 8-bit convention of most
/// vision toolkits: hue in `[0, 180)`, saturation and value in `[0, 255]`.
use image::Rgb;
use serde::{Deserialize, Serialize};

/// Reported color, serialized as `[b, g, r]`.
///
/// Channels are `u16` because quantized keys round up past 255 (e.g. 255
/// quantized to a step of 20 becomes 260).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "[u16; 3]")]
pub struct Bgr {
    pub b: u16,
    pub g: u16,
    pub r: u16,
}

impl Bgr {
    pub fn new(b: u16, g: u16, r: u16) -> Self {
        Self { b, g, r }
    }

    /// Truncate a per-channel mean (in `b, g, r` order) to whole values.
    pub fn from_mean(mean: [f64; 3]) -> Self {
        Self::new(mean[0] as u16, mean[1] as u16, mean[2] as u16)
    }

    /// Snap each channel of a mean to the nearest multiple of `step`.
    pub fn quantized(mean: [f64; 3], step: u16) -> Self {
        let step_f = step.max(1) as f64;
        let snap = |v: f64| ((v / step_f).round() * step_f) as u16;
        Self::new(snap(mean[0]), snap(mean[1]), snap(mean[2]))
    }
}

impl From<Bgr> for [u16; 3] {
    fn from(c: Bgr) -> Self {
        [c.b, c.g, c.r]
    }
}

/// 8-bit HSV triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn from_rgb(pixel: &Rgb<u8>) -> Self {
        let r = pixel[0] as f32;
        let g = pixel[1] as f32;
        let b = pixel[2] as f32;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let diff = max - min;

        let s = if max > 0.0 { 255.0 * diff / max } else { 0.0 };

        let mut h = if diff == 0.0 {
            0.0
        } else if max == r {
            60.0 * (g - b) / diff
        } else if max == g {
            120.0 + 60.0 * (b - r) / diff
        } else {
            240.0 + 60.0 * (r - g) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }

        Self {
            h: (((h / 2.0).round() as u16) % 180) as u8,
            s: s.round() as u8,
            v: max as u8,
        }
    }
}

/// Inclusive HSV box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        let values = [hsv.h, hsv.s, hsv.v];
        values
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(Hsv::from_rgb(&Rgb([255, 0, 0])), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(Hsv::from_rgb(&Rgb([0, 255, 0])), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(Hsv::from_rgb(&Rgb([0, 0, 255])), Hsv { h: 120, s: 255, v: 255 });
        assert_eq!(Hsv::from_rgb(&Rgb([255, 255, 0])), Hsv { h: 30, s: 255, v: 255 });
    }

    #[test]
    fn test_hsv_gray_has_no_saturation() {
        let hsv = Hsv::from_rgb(&Rgb([128, 128, 128]));
        assert_eq!(hsv.s, 0);
        assert_eq!(hsv.v, 128);

        let black = Hsv::from_rgb(&Rgb([0, 0, 0]));
        assert_eq!(black, Hsv { h: 0, s: 0, v: 0 });
    }

    #[test]
    fn test_quantized_rounds_to_step() {
        let key = Bgr::quantized([9.0, 10.0, 255.0], 20);
        assert_eq!(key, Bgr::new(0, 20, 260));

        let key = Bgr::quantized([31.2, 49.9, 50.1], 20);
        assert_eq!(key, Bgr::new(40, 40, 60));
    }

    #[test]
    fn test_range_is_inclusive() {
        let yellow = HsvRange::new([20, 100, 100], [35, 255, 255]);
        assert!(yellow.contains(Hsv { h: 20, s: 100, v: 100 }));
        assert!(yellow.contains(Hsv { h: 35, s: 255, v: 255 }));
        assert!(!yellow.contains(Hsv { h: 36, s: 200, v: 200 }));
        assert!(!yellow.contains(Hsv { h: 30, s: 99, v: 200 }));
    }

    #[test]
    fn test_bgr_serializes_as_triple() {
        let json = serde_json::to_string(&Bgr::new(1, 2, 3)).unwrap();
        assert_eq!(json, "[1,2,3]");
    }
}
