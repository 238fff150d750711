/// Shape classification for stations and demand icons
///
/// Both use the same pipeline (dark blobs, polygon approximation, vertex
/// count) and differ only in their [`ShapeProfile`]: stations are large and
/// must clear a minimum bounding box, demand icons are tiny and read a
/// five-vertex outline as a bell.
use crate::contours::{external_contours, BoundingBox, PixelPoint};
use crate::frame::Frame;
use crate::preprocessing;
use crate::region::AbsoluteRegion;
use image::RgbImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeLabel {
    Circle,
    Square,
    Rectangle,
    Triangle,
    Pentagon,
    Cross,
    Bell,
    Unidentified,
}

/// Size gates and labelling rules for one use of the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeProfile {
    /// Inverse binarization cut: darker than this is foreground.
    pub binarize_threshold: u8,
    pub min_area: f64,
    pub max_area: f64,
    /// Both bounding-box sides must be at least this long (0 disables).
    pub min_bbox_size: i32,
    /// Polygon tolerance as a fraction of the contour perimeter.
    pub epsilon_fraction: f64,
    /// Tell squares from rectangles by aspect ratio; otherwise every
    /// quadrilateral is a square.
    pub split_quadrilaterals: bool,
    /// Open interval of aspect ratios that count as square.
    pub square_ratio: (f64, f64),
    pub five_vertex_label: ShapeLabel,
}

impl Default for ShapeProfile {
    fn default() -> Self {
        Self::stations()
    }
}

impl ShapeProfile {
    pub fn stations() -> Self {
        Self {
            binarize_threshold: 100,
            min_area: 50.0,
            max_area: 5000.0,
            min_bbox_size: 20,
            epsilon_fraction: 0.04,
            split_quadrilaterals: true,
            square_ratio: (0.9, 1.1),
            five_vertex_label: ShapeLabel::Pentagon,
        }
    }

    pub fn demand_icons() -> Self {
        Self {
            binarize_threshold: 100,
            min_area: 5.0,
            max_area: 100.0,
            min_bbox_size: 0,
            epsilon_fraction: 0.04,
            split_quadrilaterals: false,
            square_ratio: (0.9, 1.1),
            five_vertex_label: ShapeLabel::Bell,
        }
    }
}

/// Map a polygon's vertex count to a label.
pub fn label_for_vertices(vertices: usize, bbox: &BoundingBox, profile: &ShapeProfile) -> ShapeLabel {
    match vertices {
        3 => ShapeLabel::Triangle,
        4 if profile.split_quadrilaterals => {
            let ratio = bbox.aspect_ratio();
            let (lo, hi) = profile.square_ratio;
            if ratio > lo && ratio < hi {
                ShapeLabel::Square
            } else {
                ShapeLabel::Rectangle
            }
        }
        4 => ShapeLabel::Square,
        5 => profile.five_vertex_label,
        6 => ShapeLabel::Cross,
        n if n >= 8 => ShapeLabel::Circle,
        _ => ShapeLabel::Unidentified,
    }
}

/// A blob that passed the profile's size gates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedShape {
    pub label: ShapeLabel,
    pub bbox: BoundingBox,
}

/// Run the shared pipeline over `image`, in contour order.
pub fn classify_shapes(image: &RgbImage, profile: &ShapeProfile) -> Vec<ClassifiedShape> {
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }

    let gray = preprocessing::to_grayscale(image);
    let binary = preprocessing::binarize_inverse(&gray, profile.binarize_threshold);

    external_contours(&binary)
        .into_iter()
        .filter_map(|blob| {
            let area = blob.area();
            if area < profile.min_area || area > profile.max_area {
                return None;
            }
            let bbox = blob.bounding_box();
            if bbox.w < profile.min_bbox_size || bbox.h < profile.min_bbox_size {
                tracing::trace!("Shape rejected, bbox {}x{} too small", bbox.w, bbox.h);
                return None;
            }
            let vertices = blob.approximate_polygon(profile.epsilon_fraction).len();
            Some(ClassifiedShape {
                label: label_for_vertices(vertices, &bbox, profile),
                bbox,
            })
        })
        .collect()
}

/// Station marker, in the pixel space of the scanned region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Station {
    pub shape: ShapeLabel,
    pub position: PixelPoint,
    pub bbox: BoundingBox,
}

pub fn detect_stations(map_image: &RgbImage, profile: &ShapeProfile) -> Vec<Station> {
    let stations: Vec<Station> = classify_shapes(map_image, profile)
        .into_iter()
        .map(|shape| Station {
            shape: shape.label,
            position: shape.bbox.center(),
            bbox: shape.bbox,
        })
        .collect();
    tracing::debug!("Detected {} stations", stations.len());
    stations
}

/// Demand icons found next to one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationDemand {
    /// Index into the station list of the same analysis.
    pub station_id: usize,
    pub demands: Vec<ShapeLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandConfig {
    pub profile: ShapeProfile,
    /// Probe half-size as a fraction of the station's bbox size.
    pub probe_fraction: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            profile: ShapeProfile::demand_icons(),
            probe_fraction: 0.1,
        }
    }
}

/// Probe window above-right of a station, in frame pixels.
///
/// `origin` is where the station's scan region starts in the frame.
pub fn demand_probe(bbox: &BoundingBox, origin: (i32, i32), probe_fraction: f64) -> AbsoluteRegion {
    let dx = (probe_fraction * bbox.w as f64) as i32;
    let dy = (probe_fraction * bbox.h as f64) as i32;
    AbsoluteRegion::new(
        origin.0 + bbox.x + bbox.w - dx,
        (origin.1 + bbox.y - dy).max(0),
        2 * dx,
        2 * dy,
    )
}

/// Look for demand icons beside each station.
///
/// Stations whose probe window leaves the frame, or is empty, are left out
/// of the result.
pub fn detect_station_demands(
    frame: &Frame,
    stations: &[Station],
    origin: (i32, i32),
    config: &DemandConfig,
) -> Vec<StationDemand> {
    let (width, height) = frame.dimensions();
    let mut result = Vec::new();

    for (station_id, station) in stations.iter().enumerate() {
        let probe = demand_probe(&station.bbox, origin, config.probe_fraction);
        if probe.is_empty() || !probe.fits_within(width, height) {
            tracing::trace!("Station {} probe {:?} outside frame", station_id, probe);
            continue;
        }

        let (patch, _) = frame.crop(probe);
        let demands: Vec<ShapeLabel> = classify_shapes(&patch, &config.profile)
            .into_iter()
            .map(|shape| shape.label)
            .collect();
        result.push(StationDemand {
            station_id,
            demands,
        });
    }

    tracing::debug!("Probed demands for {}/{} stations", result.len(), stations.len());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
    use imageproc::point::Point;
    use imageproc::rect::Rect;

    fn white(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([255, 255, 255]))
    }

    #[test]
    fn test_vertex_mapping() {
        let profile = ShapeProfile::stations();
        let square = BoundingBox::new(0, 0, 40, 40);
        let wide = BoundingBox::new(0, 0, 60, 30);

        assert_eq!(label_for_vertices(3, &square, &profile), ShapeLabel::Triangle);
        assert_eq!(label_for_vertices(4, &square, &profile), ShapeLabel::Square);
        assert_eq!(label_for_vertices(4, &wide, &profile), ShapeLabel::Rectangle);
        assert_eq!(label_for_vertices(5, &square, &profile), ShapeLabel::Pentagon);
        assert_eq!(label_for_vertices(6, &square, &profile), ShapeLabel::Cross);
        assert_eq!(label_for_vertices(7, &square, &profile), ShapeLabel::Unidentified);
        assert_eq!(label_for_vertices(8, &square, &profile), ShapeLabel::Circle);
        assert_eq!(label_for_vertices(20, &square, &profile), ShapeLabel::Circle);
        assert_eq!(label_for_vertices(2, &square, &profile), ShapeLabel::Unidentified);

        let icons = ShapeProfile::demand_icons();
        assert_eq!(label_for_vertices(4, &wide, &icons), ShapeLabel::Square);
        assert_eq!(label_for_vertices(5, &square, &icons), ShapeLabel::Bell);
    }

    #[test]
    fn test_square_ratio_is_exclusive() {
        let profile = ShapeProfile::stations();
        let edge = BoundingBox::new(0, 0, 33, 30); // 1.1 exactly
        assert_eq!(label_for_vertices(4, &edge, &profile), ShapeLabel::Rectangle);
    }

    #[test]
    fn test_detects_square_station() {
        let mut img = white(120, 100);
        draw_filled_rect_mut(&mut img, Rect::at(30, 20).of_size(40, 40), Rgb([0, 0, 0]));

        let stations = detect_stations(&img, &ShapeProfile::stations());
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].shape, ShapeLabel::Square);
        assert_eq!(stations[0].bbox, BoundingBox::new(30, 20, 40, 40));
        assert_eq!(stations[0].position, PixelPoint::new(50, 40));
    }

    #[test]
    fn test_detects_station_in_frame_corner() {
        let mut img = white(120, 100);
        draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(40, 40), Rgb([0, 0, 0]));

        let stations = detect_stations(&img, &ShapeProfile::stations());
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].shape, ShapeLabel::Square);
        assert_eq!(stations[0].bbox, BoundingBox::new(0, 0, 40, 40));
    }

    #[test]
    fn test_detects_triangle_station() {
        let mut img = white(120, 100);
        draw_polygon_mut(
            &mut img,
            &[Point::new(50, 20), Point::new(20, 80), Point::new(80, 80)],
            Rgb([20, 20, 20]),
        );

        let stations = detect_stations(&img, &ShapeProfile::stations());
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].shape, ShapeLabel::Triangle);
    }

    #[test]
    fn test_small_blobs_are_not_stations() {
        let mut img = white(120, 100);
        // Area passes, bounding box does not
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(60, 6), Rgb([0, 0, 0]));
        draw_filled_rect_mut(&mut img, Rect::at(10, 40).of_size(5, 5), Rgb([0, 0, 0]));
        assert!(detect_stations(&img, &ShapeProfile::stations()).is_empty());
    }

    #[test]
    fn test_black_frame_has_no_stations() {
        let img = RgbImage::new(200, 150);
        assert!(detect_stations(&img, &ShapeProfile::stations()).is_empty());
    }

    #[test]
    fn test_demand_probe_geometry() {
        let bbox = BoundingBox::new(100, 50, 40, 30);
        let probe = demand_probe(&bbox, (0, 0), 0.1);
        assert_eq!(probe, AbsoluteRegion::new(136, 47, 8, 6));

        let top = BoundingBox::new(10, 1, 40, 30);
        assert_eq!(demand_probe(&top, (0, 0), 0.1).y, 0);

        let shifted = demand_probe(&bbox, (5, 7), 0.1);
        assert_eq!(shifted, AbsoluteRegion::new(141, 54, 8, 6));
    }

    #[test]
    fn test_demands_found_and_out_of_frame_skipped() {
        let mut img = white(200, 200);
        // Station 0 probes (130, 50) 20x20; station 1 probes past the right edge
        draw_filled_rect_mut(&mut img, Rect::at(134, 52).of_size(6, 6), Rgb([0, 0, 0]));
        let frame = Frame::new(img);

        let stations = vec![
            Station {
                shape: ShapeLabel::Square,
                position: PixelPoint::new(90, 110),
                bbox: BoundingBox::new(40, 60, 100, 100),
            },
            Station {
                shape: ShapeLabel::Circle,
                position: PixelPoint::new(185, 100),
                bbox: BoundingBox::new(170, 90, 30, 30),
            },
        ];

        let demands = detect_station_demands(&frame, &stations, (0, 0), &DemandConfig::default());
        assert_eq!(demands.len(), 1);
        assert_eq!(demands[0].station_id, 0);
        assert_eq!(demands[0].demands, vec![ShapeLabel::Square]);
    }

    #[test]
    fn test_no_stations_no_demands() {
        let frame = Frame::new(white(50, 50));
        assert!(detect_station_demands(&frame, &[], (0, 0), &DemandConfig::default()).is_empty());
    }
}
