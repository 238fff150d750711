/// Image preprocessing shared by every detector
///
/// Grayscale conversion, the three binarization flavours the detectors use
/// (fixed, fixed-inverse, Gaussian adaptive), median smoothing, and HSV
/// masks. Per-pixel passes split the buffer into rows and run them on rayon.
use crate::color::{Hsv, HsvRange};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use rayon::prelude::*;

/// Luma from RGB using fixed-point `(77*R + 150*G + 29*B) / 256`.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return gray;
    }

    let src = image.as_raw();
    let row_size = width as usize;
    let dst: &mut [u8] = &mut gray;
    dst.par_chunks_mut(row_size)
        .enumerate()
        .for_each(|(y, row_buffer)| {
            let row = &src[y * row_size * 3..(y + 1) * row_size * 3];
            for (out, px) in row_buffer.iter_mut().zip(row.chunks_exact(3)) {
                *out = luma(px[0], px[1], px[2]);
            }
        });

    gray
}

/// Pixels strictly above `threshold` become white, the rest black.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    map_pixels(gray, |v| if v > threshold { 255 } else { 0 })
}

/// Pixels strictly above `threshold` become black, the rest white.
pub fn binarize_inverse(gray: &GrayImage, threshold: u8) -> GrayImage {
    map_pixels(gray, |v| if v > threshold { 0 } else { 255 })
}

fn map_pixels(gray: &GrayImage, f: impl Fn(u8) -> u8 + Sync) -> GrayImage {
    let mut out = gray.clone();
    let dst: &mut [u8] = &mut out;
    dst.par_iter_mut().for_each(|v| *v = f(*v));
    out
}

/// Local inverse binarization against a Gaussian-weighted neighbourhood mean.
///
/// A pixel turns white when it is at least `offset` darker than the weighted
/// mean of its `block_size` window. Sigma follows the usual block-size rule
/// `0.3 * ((block_size - 1) / 2 - 1) + 0.8`.
pub fn adaptive_threshold_inverse(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }

    let sigma = (0.3 * ((block_size.max(3) as f32 - 1.0) * 0.5 - 1.0) + 0.8).max(0.1);
    let as_float: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([gray.get_pixel(x, y)[0] as f32]));
    let mean = imageproc::filter::gaussian_blur_f32(&as_float, sigma);

    let mut out = GrayImage::new(width, height);
    let src = gray.as_raw();
    let mean_raw = mean.as_raw();
    let dst: &mut [u8] = &mut out;
    dst.par_iter_mut()
        .zip(src.par_iter().zip(mean_raw.par_iter()))
        .for_each(|(out, (&v, &m))| {
            *out = if v as f32 > m - offset { 0 } else { 255 };
        });
    out
}

/// Median filter with a square `ksize` window (odd, e.g. 5).
pub fn median_blur(gray: &GrayImage, ksize: u32) -> GrayImage {
    let radius = ksize / 2;
    if radius == 0 || gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    imageproc::filter::median_filter(gray, radius, radius)
}

/// Row-major HSV copy of an RGB image.
#[derive(Debug, Clone)]
pub struct HsvImage {
    width: u32,
    height: u32,
    data: Vec<Hsv>,
}

impl HsvImage {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = vec![Hsv { h: 0, s: 0, v: 0 }; width as usize * height as usize];
        if !data.is_empty() {
            let row_size = width as usize;
            data.par_chunks_mut(row_size)
                .enumerate()
                .for_each(|(y, row_buffer)| {
                    for (x, out) in row_buffer.iter_mut().enumerate() {
                        *out = Hsv::from_rgb(image.get_pixel(x as u32, y as u32));
                    }
                });
        }
        Self { width, height, data }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> Hsv {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Mean of each HSV channel over the inclusive window, clipped to the image.
    /// `None` when the clipped window is empty.
    pub fn window_mean(&self, cx: i32, cy: i32, half: i32) -> Option<[f64; 3]> {
        let x0 = (cx - half).max(0);
        let y0 = (cy - half).max(0);
        let x1 = (cx + half).min(self.width as i32 - 1);
        let y1 = (cy + half).min(self.height as i32 - 1);
        if x0 > x1 || y0 > y1 {
            return None;
        }

        let mut sum = [0u64; 3];
        let mut count = 0u64;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let hsv = self.get(x as u32, y as u32);
                sum[0] += hsv.h as u64;
                sum[1] += hsv.s as u64;
                sum[2] += hsv.v as u64;
                count += 1;
            }
        }
        Some(sum.map(|s| s as f64 / count as f64))
    }

    /// White where the pixel falls inside any of `ranges`.
    pub fn in_any_range(&self, ranges: &[HsvRange]) -> GrayImage {
        let mut mask = GrayImage::new(self.width, self.height);
        let dst: &mut [u8] = &mut mask;
        dst.par_iter_mut()
            .zip(self.data.par_iter())
            .for_each(|(out, hsv)| {
                if ranges.iter().any(|range| range.contains(*hsv)) {
                    *out = 255;
                }
            });
        mask
    }
}
