/// Snapshot orchestration
///
/// [`SnapshotAnalyzer`] maps the configured regions onto a frame, crops
/// each one, and runs the matching detector. The full pass is
/// [`SnapshotAnalyzer::analyze`]; every detector is also exposed on its own
/// with the same `(frame, width, height, region)` calling convention.
///
/// `width` and `height` are the logical window size used for region
/// mapping. They may differ from the frame's own dimensions; mapped regions
/// are clipped to the frame before cropping.
use crate::config::{AnalyzerConfig, DetectionConfig};
use crate::detection::{
    count_line_tokens, detect_placed_lines, detect_station_demands, detect_stations,
    detect_trains, ConsolidatedLine, LineTokenCounts, Station, StationDemand, Train,
};
use crate::frame::Frame;
use crate::ocr::{self, DigitRecognizer};
use crate::region::{AbsoluteRegion, NormalizedRegion, RegionKind, RegionTable};
use image::RgbImage;
use serde::Serialize;

/// Everything read from one frame.
///
/// Station, line, and train coordinates are relative to the station map
/// region (they equal frame coordinates when that region starts at the
/// window origin, as the default does).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameStateSnapshot {
    pub score: u32,
    pub available_trains: u32,
    pub available_tunnels: u32,
    pub available_wagons: u32,
    pub available_lines: LineTokenCounts,
    pub stations: Vec<Station>,
    pub placed_lines: Vec<ConsolidatedLine>,
    pub trains: Vec<Train>,
    pub station_demands: Vec<StationDemand>,
}

impl GameStateSnapshot {
    /// A live game always shows a positive score.
    pub fn is_game_running(&self) -> bool {
        self.score > 0
    }
}

/// Runs every detector over a frame.
///
/// Holds no per-frame state; one analyzer can serve any number of frames,
/// from several threads when its recognizer allows it.
pub struct SnapshotAnalyzer<R: DigitRecognizer> {
    recognizer: R,
    regions: RegionTable,
    config: DetectionConfig,
}

impl<R: DigitRecognizer> SnapshotAnalyzer<R> {
    /// Analyzer with the default HUD layout and thresholds.
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            regions: RegionTable::default(),
            config: DetectionConfig::default(),
        }
    }

    /// Analyzer configured from a loaded [`AnalyzerConfig`].
    pub fn from_config(recognizer: R, config: &AnalyzerConfig) -> Self {
        Self {
            recognizer,
            regions: config.region_table(),
            config: config.detection.clone(),
        }
    }

    pub fn with_regions(mut self, regions: RegionTable) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_detection_config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn detection_config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run every detector, in a fixed order, and assemble the snapshot.
    pub fn analyze(&self, frame: &Frame, width: u32, height: u32) -> GameStateSnapshot {
        let score = self.read_score(frame, width, height, None);
        let available_trains = self.read_trains(frame, width, height, None);
        let available_tunnels = self.read_tunnels(frame, width, height, None);
        let available_lines = self.read_line_tokens(frame, width, height, None);
        let stations = self.detect_stations(frame, width, height, None);
        let placed_lines = self.detect_placed_lines(frame, width, height, None);
        let trains = self.detect_trains(frame, width, height, None);
        let available_wagons = self.read_wagons(frame, width, height, None);
        let station_demands = self.detect_station_demands(frame, width, height, &stations, None);

        tracing::debug!(
            "Snapshot: score={} stations={} lines={} trains={}",
            score,
            stations.len(),
            placed_lines.len(),
            trains.len()
        );

        GameStateSnapshot {
            score,
            available_trains,
            available_tunnels,
            available_wagons,
            available_lines,
            stations,
            placed_lines,
            trains,
            station_demands,
        }
    }

    pub fn read_score(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        region: Option<NormalizedRegion>,
    ) -> u32 {
        self.read_counter(frame, width, height, RegionKind::Score, region)
    }

    pub fn read_trains(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        region: Option<NormalizedRegion>,
    ) -> u32 {
        self.read_counter(frame, width, height, RegionKind::Trains, region)
    }

    pub fn read_tunnels(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        region: Option<NormalizedRegion>,
    ) -> u32 {
        self.read_counter(frame, width, height, RegionKind::Tunnels, region)
    }

    pub fn read_wagons(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        region: Option<NormalizedRegion>,
    ) -> u32 {
        self.read_counter(frame, width, height, RegionKind::Wagons, region)
    }

    pub fn read_line_tokens(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        region: Option<NormalizedRegion>,
    ) -> LineTokenCounts {
        let (panel, _) = self.crop(frame, width, height, RegionKind::Lines, region);
        count_line_tokens(&panel, &self.config.tokens)
    }

    pub fn detect_stations(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        region: Option<NormalizedRegion>,
    ) -> Vec<Station> {
        let (map, _) = self.crop(frame, width, height, RegionKind::StationMap, region);
        detect_stations(&map, &self.config.stations)
    }

    pub fn detect_placed_lines(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        region: Option<NormalizedRegion>,
    ) -> Vec<ConsolidatedLine> {
        let (map, _) = self.crop(frame, width, height, RegionKind::StationMap, region);
        detect_placed_lines(&map, &self.config.strokes)
    }

    pub fn detect_trains(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        region: Option<NormalizedRegion>,
    ) -> Vec<Train> {
        let (map, _) = self.crop(frame, width, height, RegionKind::StationMap, region);
        detect_trains(&map, &self.config.trains)
    }

    /// Demand icons for `stations`, which must come from
    /// [`Self::detect_stations`] with the same `region`.
    pub fn detect_station_demands(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        stations: &[Station],
        region: Option<NormalizedRegion>,
    ) -> Vec<StationDemand> {
        let scanned = self.scan_region(frame, width, height, RegionKind::StationMap, region);
        detect_station_demands(frame, stations, (scanned.x, scanned.y), &self.config.demands)
    }

    fn read_counter(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        kind: RegionKind,
        region: Option<NormalizedRegion>,
    ) -> u32 {
        let (sub_image, _) = self.crop(frame, width, height, kind, region);
        let value = ocr::read_number(&sub_image, self.config.ocr_threshold, &self.recognizer);
        tracing::trace!("{} = {}", kind.name(), value);
        value
    }

    /// Mapped and clipped pixel rectangle for `kind` (or an explicit region).
    fn scan_region(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        kind: RegionKind,
        region: Option<NormalizedRegion>,
    ) -> AbsoluteRegion {
        let normalized = region.unwrap_or_else(|| self.regions.get(kind));
        normalized
            .map(width, height)
            .clip_to(frame.width(), frame.height())
    }

    fn crop(
        &self,
        frame: &Frame,
        width: u32,
        height: u32,
        kind: RegionKind,
        region: Option<NormalizedRegion>,
    ) -> (RgbImage, AbsoluteRegion) {
        let absolute = self.scan_region(frame, width, height, kind, region);
        if absolute.is_empty() {
            tracing::debug!("{} maps outside the frame", kind.name());
        }
        frame.crop(absolute)
    }
}
