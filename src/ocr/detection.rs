/// Digit recognition backends
///
/// `DigitRecognizer` is the seam between the numeric reader and the OCR
/// engine. The Tesseract backend opens a fresh engine for every call and
/// drops it before returning, so one recognizer can be shared freely across
/// threads without any engine state leaking between reads.
use crate::error::OcrError;
use image::GrayImage;

/// Characters the engine is allowed to emit for HUD counters.
pub const DIGIT_WHITELIST: &str = "0123456789";

/// Turns a binarized single-line image into raw text.
pub trait DigitRecognizer {
    /// Recognize the text in `binary` (white glyphs or black glyphs, one line).
    fn recognize(&self, binary: &GrayImage) -> Result<String, OcrError>;
}

impl<R: DigitRecognizer + ?Sized> DigitRecognizer for &R {
    fn recognize(&self, binary: &GrayImage) -> Result<String, OcrError> {
        (**self).recognize(binary)
    }
}

impl<R: DigitRecognizer + ?Sized> DigitRecognizer for Box<R> {
    fn recognize(&self, binary: &GrayImage) -> Result<String, OcrError> {
        (**self).recognize(binary)
    }
}

/// Recognizer used when no OCR engine is available; every read is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcr;

impl DigitRecognizer for NoOcr {
    fn recognize(&self, _binary: &GrayImage) -> Result<String, OcrError> {
        Err(OcrError::Unavailable)
    }
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod tesseract {
    use super::{DigitRecognizer, DIGIT_WHITELIST};
    use crate::error::OcrError;
    use image::{GrayImage, ImageFormat};
    use leptess::{LepTess, Variable};
    use std::io::Cursor;
    use std::path::PathBuf;

    /// PSM 7 = treat the image as a single text line
    const PAGE_SEG_SINGLE_LINE: &str = "7";

    /// Tesseract-backed recognizer.
    ///
    /// Holds only the engine settings; the engine itself lives for the
    /// duration of one [`DigitRecognizer::recognize`] call.
    #[derive(Debug, Clone)]
    pub struct TesseractRecognizer {
        datapath: Option<PathBuf>,
        language: String,
    }

    impl Default for TesseractRecognizer {
        fn default() -> Self {
            Self::new(Self::bundled_tessdata_path(), "eng")
        }
    }

    impl TesseractRecognizer {
        /// # Arguments
        /// * `datapath` - tessdata directory, `None` for the system install / `TESSDATA_PREFIX`
        /// * `language` - traineddata name, usually `"eng"`
        pub fn new(datapath: Option<PathBuf>, language: impl Into<String>) -> Self {
            Self {
                datapath,
                language: language.into(),
            }
        }

        /// `./tessdata` next to the working directory, when it exists.
        pub fn bundled_tessdata_path() -> Option<PathBuf> {
            let root = std::env::current_dir().ok()?;
            let tessdata_dir = root.join("tessdata");
            if tessdata_dir.exists() {
                tracing::debug!("Using bundled Tesseract data from {}", tessdata_dir.display());
                Some(tessdata_dir)
            } else {
                None
            }
        }

        fn open_engine(&self) -> Result<LepTess, OcrError> {
            let datapath = self.datapath.as_ref().and_then(|p| p.to_str());
            let mut tess = LepTess::new(datapath, &self.language)
                .map_err(|e| OcrError::InitFailed(e.to_string().into()))?;

            tess.set_variable(Variable::TesseditPagesegMode, PAGE_SEG_SINGLE_LINE)
                .map_err(|e| OcrError::ConfigureFailed {
                    setting: "tessedit_pageseg_mode",
                    source: e.to_string().into(),
                })?;
            tess.set_variable(Variable::TesseditCharWhitelist, DIGIT_WHITELIST)
                .map_err(|e| OcrError::ConfigureFailed {
                    setting: "tessedit_char_whitelist",
                    source: e.to_string().into(),
                })?;

            Ok(tess)
        }
    }

    impl DigitRecognizer for TesseractRecognizer {
        fn recognize(&self, binary: &GrayImage) -> Result<String, OcrError> {
            // Encode in memory; concurrent reads must not share a temp file
            let mut png = Vec::new();
            binary
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| OcrError::ImageRejected(Box::new(e)))?;

            let mut tess = self.open_engine()?;
            tess.set_image_from_mem(&png)
                .map_err(|e| OcrError::ImageRejected(e.to_string().into()))?;
            let text = tess
                .get_utf8_text()
                .map_err(|e| OcrError::RecognitionFailed(Box::new(e)))?;

            let text = text.trim().to_string();
            if !text.is_empty() {
                tracing::trace!("[metro-vision][ocr-detect] {}", text);
            }
            Ok(text)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use image::Luma;

        #[test]
        #[ignore = "needs a system Tesseract install"]
        fn test_tesseract_blank_image_has_no_digits() {
            let recognizer = TesseractRecognizer::default();
            let img = GrayImage::from_pixel(100, 30, Luma([255]));

            match recognizer.recognize(&img) {
                Ok(text) => assert!(!text.chars().any(|c| c.is_ascii_digit())),
                Err(_) => {} // OCR error is acceptable for a blank image
            }
        }

        #[test]
        fn test_missing_language_fails_to_init() {
            let recognizer = TesseractRecognizer::new(
                Some(PathBuf::from("/nonexistent/tessdata")),
                "definitely-not-a-language",
            );
            let img = GrayImage::from_pixel(10, 10, Luma([0]));
            assert!(matches!(recognizer.recognize(&img), Err(OcrError::InitFailed(_))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_no_ocr_is_unavailable() {
        let img = GrayImage::from_pixel(10, 10, Luma([0]));
        assert!(matches!(NoOcr.recognize(&img), Err(OcrError::Unavailable)));
        assert!(matches!((&NoOcr).recognize(&img), Err(OcrError::Unavailable)));
    }
}
