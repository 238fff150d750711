/// Placed route extraction
///
/// Routes are drawn as thin colored strokes. Strokes are found with a local
/// threshold, kept when their width sits in a narrow band relative to the
/// map width, and grouped by quantized color into one line per route.
use crate::color::Bgr;
use crate::contours::{blob_mean_color, external_contours, PixelPoint};
use crate::preprocessing;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Adaptive threshold window (odd).
    pub block_size: u32,
    /// How much darker than the local mean a stroke pixel must be.
    pub offset: f32,
    /// Accepted stroke widths as fractions of the region width.
    pub min_width_fraction: f64,
    pub max_width_fraction: f64,
    /// Anything wider is a river or other decoration.
    pub river_width_fraction: f64,
    /// Color grouping step per channel.
    pub color_quantum: u16,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2.0,
            min_width_fraction: 0.005,
            max_width_fraction: 0.015,
            river_width_fraction: 0.03,
            color_quantum: 20,
        }
    }
}

/// One stroke; endpoints are the far corners of its fitted rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineSegment {
    pub start: PixelPoint,
    pub end: PixelPoint,
    pub color: Bgr,
}

/// All strokes sharing a quantized color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedLine {
    pub color: Bgr,
    pub segments: Vec<LineSegment>,
}

/// Extract strokes from `map_image` and group them by color, in order of
/// first appearance.
pub fn detect_placed_lines(map_image: &RgbImage, config: &StrokeConfig) -> Vec<ConsolidatedLine> {
    let width = map_image.width();
    if width == 0 || map_image.height() == 0 {
        return Vec::new();
    }

    let river = (config.river_width_fraction * width as f64) as i32 as f64;
    let min_width = (config.min_width_fraction * width as f64) as i32 as f64;
    let max_width = (config.max_width_fraction * width as f64) as i32 as f64;

    let gray = preprocessing::to_grayscale(map_image);
    let binary = preprocessing::adaptive_threshold_inverse(&gray, config.block_size, config.offset);

    let mut lines: Vec<ConsolidatedLine> = Vec::new();
    let mut by_color: HashMap<Bgr, usize> = HashMap::new();
    let mut rejected = 0usize;

    for blob in external_contours(&binary) {
        let rect = blob.min_area_rect();
        let stroke_width = rect.short_side();
        if stroke_width > river || stroke_width < min_width || stroke_width > max_width {
            rejected += 1;
            continue;
        }

        let Some(mean) = blob_mean_color(map_image, &blob) else {
            continue;
        };
        let color = Bgr::quantized(mean, config.color_quantum);
        let (a, b) = rect.farthest_corners();
        let segment = LineSegment {
            start: PixelPoint::new(a.0.round() as i32, a.1.round() as i32),
            end: PixelPoint::new(b.0.round() as i32, b.1.round() as i32),
            color,
        };

        match by_color.get(&color) {
            Some(&idx) => lines[idx].segments.push(segment),
            None => {
                by_color.insert(color, lines.len());
                lines.push(ConsolidatedLine {
                    color,
                    segments: vec![segment],
                });
            }
        }
    }

    tracing::debug!(
        "Placed lines: {} colors, {} strokes rejected by width",
        lines.len(),
        rejected
    );
    lines
}
