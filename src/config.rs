use crate::detection::{DemandConfig, ShapeProfile, StrokeConfig, TokenConfig, TrainConfig};
use crate::error::ConfigError;
use crate::ocr::DEFAULT_BINARIZE_THRESHOLD;
use crate::region::{NormalizedRegion, RegionKind, RegionTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "metro-vision";
const CONFIG_FILE: &str = "regions_config.json";

/// Every heuristic threshold the detectors use, tuned to the game's
/// default visual theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Binary threshold for HUD counter OCR (0-255)
    pub ocr_threshold: u8,

    pub tokens: TokenConfig,

    pub stations: ShapeProfile,

    pub demands: DemandConfig,

    pub strokes: StrokeConfig,

    pub trains: TrainConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ocr_threshold: DEFAULT_BINARIZE_THRESHOLD,
            tokens: TokenConfig::default(),
            stations: ShapeProfile::stations(),
            demands: DemandConfig::default(),
            strokes: StrokeConfig::default(),
            trains: TrainConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Tesseract data directory; `None` uses `./tessdata` or the system install
    pub datapath: Option<PathBuf>,

    /// Traineddata name, `eng` when unset
    pub language: Option<String>,
}

impl OcrSettings {
    pub fn language_or_default(&self) -> &str {
        self.language.as_deref().unwrap_or("eng")
    }
}

/// Analyzer settings read from `regions_config.json`.
///
/// Region overrides sit at the top level under their external names
/// (`score_region`, `station_map_region`, ...), so a plain region file is a
/// valid config. Regions missing from the file keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Per-region overrides of the default HUD layout
    #[serde(flatten)]
    pub regions: HashMap<RegionKind, NormalizedRegion>,

    pub detection: DetectionConfig,

    pub ocr: OcrSettings,
}

impl AnalyzerConfig {
    /// Load configuration from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: AnalyzerConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;

        tracing::info!("✓ Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Load from the platform config directory, or defaults when no file exists.
    ///
    /// Never creates or rewrites the file.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                tracing::debug!("No config at {}, using defaults", Self::config_dir_display());
                Ok(Self::default())
            }
        }
    }

    /// `<config dir>/metro-vision/regions_config.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Get the config file path (for display purposes)
    pub fn config_dir_display() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Defaults merged with this file's overrides.
    pub fn region_table(&self) -> RegionTable {
        RegionTable::with_overrides(&self.regions)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (kind, region) in &self.regions {
            if !region.is_finite() {
                return Err(ConfigError::InvalidRegion {
                    name: kind.name(),
                    values: region.to_array(),
                });
            }
        }
        Ok(())
    }
}
