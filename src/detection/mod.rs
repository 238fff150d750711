/// Detection module
///
/// One detector per on-screen feature. Every detector takes an already
/// cropped sub-image and returns plain records in that sub-image's pixel
/// space; mapping regions and cropping is the snapshot's job.
///
/// ## Architecture
///
/// ```text
/// SnapshotAnalyzer
///   ├── Numeric reader (ocr)      score, trains, tunnels, wagons
///   ├── count_line_tokens         route-unlock panel (circles)
///   ├── detect_stations           shapes, station profile
///   │     └── detect_station_demands   shapes, demand profile
///   ├── detect_placed_lines       strokes grouped by color
///   └── detect_trains             livery color masks
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// use metro_vision::detection::{detect_trains, TrainConfig};
///
/// let trains = detect_trains(&map_image, &TrainConfig::default());
/// for train in &trains {
///     println!("train at {:?}, wagon: {}", train.position, train.has_wagon);
/// }
/// ```

pub mod circles;
pub mod lines;
pub mod shapes;
pub mod tokens;
pub mod trains;

// Re-export commonly used types
pub use circles::{hough_circles, Circle, HoughParams};
pub use lines::{detect_placed_lines, ConsolidatedLine, LineSegment, StrokeConfig};
pub use shapes::{
    classify_shapes, detect_station_demands, detect_stations, label_for_vertices, DemandConfig,
    ShapeLabel, ShapeProfile, Station, StationDemand,
};
pub use tokens::{classify_token, count_line_tokens, LineTokenCounts, TokenConfig, TokenState};
pub use trains::{detect_trains, Train, TrainConfig};
