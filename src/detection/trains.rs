/// Train detection on the map
///
/// Trains are short saturated rectangles in one of the line liveries. A
/// longer rectangle is a locomotive pulling a wagon.
use crate::color::{Bgr, HsvRange};
use crate::contours::{blob_mean_color, external_contours, BoundingBox, PixelPoint};
use crate::preprocessing::HsvImage;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Livery palette: yellow, red, blue, orange.
pub const DEFAULT_TRAIN_COLORS: [HsvRange; 4] = [
    HsvRange::new([20, 100, 100], [35, 255, 255]),
    HsvRange::new([0, 100, 100], [10, 255, 255]),
    HsvRange::new([100, 100, 100], [130, 255, 255]),
    HsvRange::new([10, 100, 100], [20, 255, 255]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub color_ranges: Vec<HsvRange>,
    pub min_area: f64,
    pub max_area: f64,
    /// Accepted bounding-box width/height range, inclusive.
    pub min_aspect: f64,
    pub max_aspect: f64,
    /// Above this aspect ratio a wagon is attached.
    pub wagon_aspect: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            color_ranges: DEFAULT_TRAIN_COLORS.to_vec(),
            min_area: 100.0,
            max_area: 2000.0,
            min_aspect: 1.5,
            max_aspect: 3.0,
            wagon_aspect: 2.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Train {
    pub position: PixelPoint,
    pub bbox: BoundingBox,
    /// Mean color under the token, in b, g, r order.
    pub color: Bgr,
    pub has_wagon: bool,
}

pub fn detect_trains(map_image: &RgbImage, config: &TrainConfig) -> Vec<Train> {
    if map_image.width() == 0 || map_image.height() == 0 {
        return Vec::new();
    }

    let mask = HsvImage::from_rgb(map_image).in_any_range(&config.color_ranges);

    let mut trains = Vec::new();
    for blob in external_contours(&mask) {
        let area = blob.area();
        if area < config.min_area || area > config.max_area {
            continue;
        }
        let bbox = blob.bounding_box();
        let aspect = bbox.aspect_ratio();
        if aspect < config.min_aspect || aspect > config.max_aspect {
            tracing::trace!("Blob at ({}, {}) rejected, aspect {:.2}", bbox.x, bbox.y, aspect);
            continue;
        }
        let Some(mean) = blob_mean_color(map_image, &blob) else {
            continue;
        };

        trains.push(Train {
            position: bbox.center(),
            bbox,
            color: Bgr::from_mean(mean),
            has_wagon: aspect > config.wagon_aspect,
        });
    }

    tracing::debug!("Detected {} trains", trains.len());
    trains
}
