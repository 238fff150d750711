use crate::error::FrameError;
use crate::region::AbsoluteRegion;
use image::{imageops, RgbImage};
use std::path::Path;

/// One captured game frame.
///
/// Pixels are held as RGB internally. The capture side usually hands over
/// BGR bytes (what screen grabbers and OpenCV-style pipelines produce), so
/// [`Frame::from_bgr_bytes`] is the main entry point for raw buffers.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: RgbImage,
}

impl Frame {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Build a frame from a row-major `height x width x 3` BGR buffer.
    pub fn from_bgr_bytes(width: u32, height: u32, mut data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 3;
        let actual = data.len();
        let size_error = FrameError::BufferSizeMismatch {
            width,
            height,
            expected,
            actual,
        };
        if actual != expected {
            return Err(size_error);
        }

        for chunk in data.chunks_exact_mut(3) {
            chunk.swap(0, 2); // B <-> R
        }

        let pixels = RgbImage::from_raw(width, height, data).ok_or(size_error)?;
        Ok(Self { pixels })
    }

    /// Load a screenshot from disk (PNG or JPEG).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FrameError> {
        let path = path.as_ref();
        let pixels = image::open(path)
            .map_err(|source| FrameError::Load {
                path: path.display().to_string(),
                source,
            })?
            .to_rgb8();
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Copy out the part of `region` that overlaps the frame.
    ///
    /// Also returns the clipped rectangle so callers know the origin of the
    /// sub-image. A region with no overlap gives an empty (0-sized) image.
    pub fn crop(&self, region: AbsoluteRegion) -> (RgbImage, AbsoluteRegion) {
        let clipped = region.clip_to(self.width(), self.height());
        if clipped.is_empty() {
            return (RgbImage::new(0, 0), clipped);
        }

        let sub = imageops::crop_imm(
            &self.pixels,
            clipped.x as u32,
            clipped.y as u32,
            clipped.w as u32,
            clipped.h as u32,
        )
        .to_image();
        (sub, clipped)
    }
}

impl From<RgbImage> for Frame {
    fn from(pixels: RgbImage) -> Self {
        Self::new(pixels)
    }
}
