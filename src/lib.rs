//! Game-state extraction from Mini Metro screen frames.
//!
//! Given one captured frame and the logical window size, [`SnapshotAnalyzer`]
//! reads the HUD counters with OCR, counts route-unlock tokens, and finds
//! stations with their demand icons, placed routes, and trains on the map.
//!
//! ```rust,no_run
//! use metro_vision::{Frame, NoOcr, SnapshotAnalyzer};
//!
//! let frame = Frame::open("screenshot.png")?;
//! let (width, height) = frame.dimensions();
//! let snapshot = SnapshotAnalyzer::new(NoOcr).analyze(&frame, width, height);
//! println!("{} stations", snapshot.stations.len());
//! # Ok::<(), metro_vision::error::FrameError>(())
//! ```

pub mod color;
pub mod config;
pub mod contours;
pub mod detection;
pub mod error;
pub mod frame;
pub mod ocr;
pub mod overlay;
pub mod preprocessing;
pub mod region;
pub mod snapshot;

pub use config::{AnalyzerConfig, DetectionConfig, OcrSettings};
pub use frame::Frame;
#[cfg(feature = "tesseract")]
pub use ocr::TesseractRecognizer;
pub use ocr::{read_number, DigitRecognizer, NoOcr};
pub use region::{AbsoluteRegion, NormalizedRegion, RegionKind, RegionTable};
pub use snapshot::{GameStateSnapshot, SnapshotAnalyzer};
