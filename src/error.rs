use thiserror::Error;

/// Library errors using thiserror for structured error handling.
///
/// Detectors never surface these to the snapshot: OCR failures collapse to
/// zero and frame/config problems are reported before analysis starts.

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine")]
    InitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to configure OCR engine: {setting}")]
    ConfigureFailed {
        setting: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("OCR engine rejected the image")]
    ImageRejected(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to perform OCR on image")]
    RecognitionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("OCR support not compiled in")]
    Unavailable,
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height}x3")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to load frame from {path}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration from {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid region {name}: {values:?}")]
    InvalidRegion { name: &'static str, values: [f64; 4] },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
