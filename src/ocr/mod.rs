mod detection;
/// OCR module for numeric HUD counters
///
/// Reads the score and the remaining trains/tunnels/wagons from small
/// screen regions.
///
/// # Architecture
///
/// - `preprocessing` (crate level): grayscale and fixed-threshold binarization
/// - `detection`: the `DigitRecognizer` seam and its Tesseract backend
/// - `text_extraction`: turning OCR text into a number
///
/// # Failure policy
///
/// [`read_number`] never fails. An engine that cannot start, text without
/// digits, or a number that overflows all read as `0`; callers cannot tell a
/// real zero from a failed read.
pub mod text_extraction;

#[cfg(feature = "tesseract")]
pub use detection::TesseractRecognizer;
pub use detection::{DigitRecognizer, NoOcr, DIGIT_WHITELIST};

use crate::preprocessing;
use image::RgbImage;

/// Default binarization cut: brighter than this is glyph.
pub const DEFAULT_BINARIZE_THRESHOLD: u8 = 150;

/// Read a non-negative integer from a HUD sub-image.
///
/// Steps:
/// 1. Convert to grayscale
/// 2. Binarize at `threshold` (above becomes white)
/// 3. Recognize a single line restricted to digits
/// 4. Keep the digits and parse them
pub fn read_number<R: DigitRecognizer + ?Sized>(
    sub_image: &RgbImage,
    threshold: u8,
    recognizer: &R,
) -> u32 {
    if sub_image.width() == 0 || sub_image.height() == 0 {
        tracing::debug!("Empty region, reading 0");
        return 0;
    }

    let gray = preprocessing::to_grayscale(sub_image);
    let binary = preprocessing::binarize(&gray, threshold);

    let text = match recognizer.recognize(&binary) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("OCR failed, reading 0: {}", e);
            return 0;
        }
    };

    text_extraction::parse_digits(&text).unwrap_or_else(|| {
        tracing::trace!("No usable digits in OCR text {:?}", text);
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use image::{GrayImage, Rgb};
    use std::cell::RefCell;

    /// Recognizer returning canned text and remembering what it was shown.
    struct Canned {
        text: &'static str,
        seen: RefCell<Vec<GrayImage>>,
    }

    impl Canned {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl DigitRecognizer for Canned {
        fn recognize(&self, binary: &GrayImage) -> Result<String, OcrError> {
            self.seen.borrow_mut().push(binary.clone());
            Ok(self.text.to_string())
        }
    }

    struct Broken;

    impl DigitRecognizer for Broken {
        fn recognize(&self, _binary: &GrayImage) -> Result<String, OcrError> {
            Err(OcrError::InitFailed("no tessdata".into()))
        }
    }

    #[test]
    fn test_read_number_parses_digits() {
        let img = RgbImage::from_pixel(40, 20, Rgb([0, 0, 0]));
        assert_eq!(read_number(&img, 150, &Canned::new("1,250\n")), 1250);
    }

    #[test]
    fn test_read_number_binarizes_before_ocr() {
        let mut img = RgbImage::from_pixel(4, 1, Rgb([150, 150, 150]));
        img.put_pixel(0, 0, Rgb([255, 255, 255]));

        let recognizer = Canned::new("3");
        read_number(&img, 150, &recognizer);

        let seen = recognizer.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_raw(), &vec![255, 0, 0, 0]);
    }

    #[test]
    fn test_read_number_degrades_to_zero() {
        let img = RgbImage::from_pixel(40, 20, Rgb([0, 0, 0]));
        assert_eq!(read_number(&img, 150, &Canned::new("")), 0);
        assert_eq!(read_number(&img, 150, &Canned::new("abc")), 0);
        assert_eq!(read_number(&img, 150, &Canned::new("123456789012345")), 0);
        assert_eq!(read_number(&img, 150, &Broken), 0);
        assert_eq!(read_number(&img, 150, &NoOcr), 0);
    }

    #[test]
    fn test_read_number_skips_empty_region() {
        let recognizer = Canned::new("9");
        assert_eq!(read_number(&RgbImage::new(0, 0), 150, &recognizer), 0);
        assert!(recognizer.seen.borrow().is_empty());
    }
}
