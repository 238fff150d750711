/// Contour extraction and contour geometry
///
/// Thin layer over `imageproc::contours` that keeps only outermost borders
/// and adds the measurements detectors filter on: enclosed area, bounding
/// box, closed polygon approximation, minimum-area rotated rectangle, and
/// the mean color under a filled contour.
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length, convex_hull};
use imageproc::point::Point;
use serde::Serialize;

/// Integer pixel position, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "[i32; 2]")]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<PixelPoint> for [i32; 2] {
    fn from(p: PixelPoint) -> Self {
        [p.x, p.y]
    }
}

/// Axis-aligned box, inclusive of the border pixels; serialized as `[x, y, w, h]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "[i32; 4]")]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Center with integer division, matching how markers are positioned.
    pub fn center(&self) -> PixelPoint {
        PixelPoint::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Width over height; 0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f64 {
        if self.h <= 0 {
            0.0
        } else {
            self.w as f64 / self.h as f64
        }
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

/// Rotated rectangle with corners in traversal order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub corners: [(f64, f64); 4],
}

impl RotatedRect {
    fn side(&self, i: usize) -> f64 {
        let (ax, ay) = self.corners[i];
        let (bx, by) = self.corners[(i + 1) % 4];
        ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt()
    }

    /// Length of the shorter side.
    pub fn short_side(&self) -> f64 {
        self.side(0).min(self.side(1))
    }

    /// Length of the longer side.
    pub fn long_side(&self) -> f64 {
        self.side(0).max(self.side(1))
    }

    /// The pair of corners furthest apart (first pair wins ties).
    pub fn farthest_corners(&self) -> ((f64, f64), (f64, f64)) {
        let mut best = (0, 2);
        let mut best_dist = -1.0;
        for i in 0..4 {
            for j in (i + 1)..4 {
                let (ax, ay) = self.corners[i];
                let (bx, by) = self.corners[j];
                let dist = (bx - ax).powi(2) + (by - ay).powi(2);
                if dist > best_dist {
                    best_dist = dist;
                    best = (i, j);
                }
            }
        }
        (self.corners[best.0], self.corners[best.1])
    }
}

/// One outer boundary traced from a binary image.
#[derive(Debug, Clone)]
pub struct Blob {
    pub points: Vec<Point<i32>>,
}

impl Blob {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Enclosed polygon area (shoelace over the traced boundary).
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        arc_length(&self.points, true)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let Some(first) = self.points.first() else {
            return BoundingBox::new(0, 0, 0, 0);
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    /// Closed-curve polygon approximation with tolerance `epsilon_fraction * perimeter`.
    pub fn approximate_polygon(&self, epsilon_fraction: f64) -> Vec<Point<i32>> {
        approximate_closed(&self.points, epsilon_fraction * self.perimeter())
    }

    pub fn min_area_rect(&self) -> RotatedRect {
        min_area_rect(&self.points)
    }

    /// Filled mask of the contour on a `width` x `height` canvas.
    pub fn mask(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        let mut poly = self.points.clone();
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }

        if poly.len() >= 3 {
            imageproc::drawing::draw_polygon_mut(&mut mask, &poly, Luma([255u8]));
        }
        // Boundary pixels are always part of the blob, including degenerate ones.
        for p in &self.points {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
                mask.put_pixel(p.x as u32, p.y as u32, Luma([255u8]));
            }
        }
        mask
    }
}

/// Outermost borders of the white regions of `binary`.
///
/// Regions touching the image border are included.
pub fn external_contours(binary: &GrayImage) -> Vec<Blob> {
    let (w, h) = binary.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    // find_contours misreads blobs on the left edge as holes; a zero border
    // keeps every blob surrounded by background
    let mut padded = GrayImage::new(w + 2, h + 2);
    image::imageops::replace(&mut padded, binary, 1, 1);

    let (max_x, max_y) = (w as i32 - 1, h as i32 - 1);
    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            Blob::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new((p.x - 1).clamp(0, max_x), (p.y - 1).clamp(0, max_y)))
                    .collect(),
            )
        })
        .collect()
}

/// Mean color of `image` where `mask` is white, in `(b, g, r)` order.
///
/// `None` when the mask selects nothing.
pub fn masked_mean(image: &RgbImage, mask: &GrayImage) -> Option<[f64; 3]> {
    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for (pixel, m) in image.pixels().zip(mask.pixels()) {
        if m[0] == 0 {
            continue;
        }
        sum[0] += pixel[2] as u64;
        sum[1] += pixel[1] as u64;
        sum[2] += pixel[0] as u64;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(sum.map(|s| s as f64 / count as f64))
}

/// Mean color under the filled blob, in `(b, g, r)` order.
///
/// Rasterizes only the blob's bounding box. `None` when the blob does not
/// overlap `image`.
pub fn blob_mean_color(image: &RgbImage, blob: &Blob) -> Option<[f64; 3]> {
    let bbox = blob.bounding_box();
    let clipped = crate::region::AbsoluteRegion::new(bbox.x, bbox.y, bbox.w, bbox.h)
        .clip_to(image.width(), image.height());
    if clipped.is_empty() {
        return None;
    }

    let local = Blob::new(
        blob.points
            .iter()
            .map(|p| Point::new(p.x - clipped.x, p.y - clipped.y))
            .collect(),
    );
    let mask = local.mask(clipped.w as u32, clipped.h as u32);
    let patch = image::imageops::crop_imm(
        image,
        clipped.x as u32,
        clipped.y as u32,
        clipped.w as u32,
        clipped.h as u32,
    )
    .to_image();
    masked_mean(&patch, &mask)
}

fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, a) in points.iter().enumerate() {
        let b = &points[(i + 1) % points.len()];
        twice_area += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (twice_area as f64 / 2.0).abs()
}

/// Douglas-Peucker on a closed curve.
///
/// The curve is cut at its first point and the point furthest from it; each
/// half is simplified as an open polyline and the two are joined without
/// repeating the shared endpoints.
fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let epsilon = epsilon.max(f64::EPSILON);

    let start = points[0];
    let (far_idx, _) = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let dx = (p.x - start.x) as i64;
            let dy = (p.y - start.y) as i64;
            (i, dx * dx + dy * dy)
        })
        .fold((0, -1i64), |best, cur| if cur.1 > best.1 { cur } else { best });
    if far_idx == 0 {
        return vec![start];
    }

    let first_half = &points[..=far_idx];
    let mut second_half: Vec<Point<i32>> = points[far_idx..].to_vec();
    second_half.push(start);

    let mut polygon = approximate_polygon_dp(first_half, epsilon, false);
    let tail = approximate_polygon_dp(&second_half, epsilon, false);
    if tail.len() > 2 {
        polygon.extend_from_slice(&tail[1..tail.len() - 1]);
    }
    polygon
}

/// Minimum-area enclosing rectangle via rotating calipers over the convex hull.
fn min_area_rect(points: &[Point<i32>]) -> RotatedRect {
    let hull: Vec<(f64, f64)> = if points.len() >= 3 {
        convex_hull(points)
            .into_iter()
            .map(|p| (p.x as f64, p.y as f64))
            .collect()
    } else {
        points.iter().map(|p| (p.x as f64, p.y as f64)).collect()
    };

    match hull.len() {
        0 => return RotatedRect { corners: [(0.0, 0.0); 4] },
        1 => return RotatedRect { corners: [hull[0]; 4] },
        _ => {}
    }

    let mut best: Option<(f64, RotatedRect)> = None;
    for i in 0..hull.len() {
        let (ax, ay) = hull[i];
        let (bx, by) = hull[(i + 1) % hull.len()];
        let len = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
        if len < f64::EPSILON {
            continue;
        }
        // Edge direction u and its normal v
        let (ux, uy) = ((bx - ax) / len, (by - ay) / len);
        let (vx, vy) = (-uy, ux);

        let (mut min_u, mut max_u, mut min_v, mut max_v) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for &(px, py) in &hull {
            let pu = px * ux + py * uy;
            let pv = px * vx + py * vy;
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if best.as_ref().is_some_and(|(a, _)| *a <= area) {
            continue;
        }
        let corner = |u: f64, v: f64| (u * ux + v * vx, u * uy + v * vy);
        let rect = RotatedRect {
            corners: [
                corner(min_u, min_v),
                corner(max_u, min_v),
                corner(max_u, max_v),
                corner(min_u, max_v),
            ],
        };
        best = Some((area, rect));
    }

    best.map(|(_, rect)| rect)
        .unwrap_or(RotatedRect { corners: [hull[0]; 4] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn filled_rect_image(w: u32, h: u32, rect: Rect) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        draw_filled_rect_mut(&mut img, rect, Luma([255u8]));
        img
    }

    #[test]
    fn test_external_contours_skip_nested() {
        let mut img = filled_rect_image(60, 60, Rect::at(5, 5).of_size(50, 50));
        draw_filled_rect_mut(&mut img, Rect::at(15, 15).of_size(30, 30), Luma([0u8]));
        draw_filled_rect_mut(&mut img, Rect::at(25, 25).of_size(10, 10), Luma([255u8]));

        let blobs = external_contours(&img);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].bounding_box(), BoundingBox::new(5, 5, 50, 50));
    }

    #[test]
    fn test_external_contours_include_border_blobs() {
        let cases = [
            (Rect::at(0, 30).of_size(20, 20), BoundingBox::new(0, 30, 20, 20)),
            (Rect::at(30, 0).of_size(20, 20), BoundingBox::new(30, 0, 20, 20)),
            (Rect::at(60, 30).of_size(20, 20), BoundingBox::new(60, 30, 20, 20)),
            (Rect::at(30, 60).of_size(20, 20), BoundingBox::new(30, 60, 20, 20)),
            (Rect::at(0, 0).of_size(20, 20), BoundingBox::new(0, 0, 20, 20)),
        ];
        for (rect, expected) in cases {
            let blobs = external_contours(&filled_rect_image(80, 80, rect));
            assert_eq!(blobs.len(), 1, "{rect:?}");
            assert_eq!(blobs[0].bounding_box(), expected);
            assert!((blobs[0].area() - 19.0 * 19.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_area_and_polygon_of_square() {
        let img = filled_rect_image(80, 80, Rect::at(20, 20).of_size(40, 40));
        let blobs = external_contours(&img);
        assert_eq!(blobs.len(), 1);

        let blob = &blobs[0];
        assert!((blob.area() - 39.0 * 39.0).abs() < 1e-6);
        assert_eq!(blob.approximate_polygon(0.04).len(), 4);
    }

    #[test]
    fn test_min_area_rect_of_bar() {
        let img = filled_rect_image(120, 40, Rect::at(10, 10).of_size(100, 7));
        let blobs = external_contours(&img);
        let rect = blobs[0].min_area_rect();

        assert!((rect.short_side() - 6.0).abs() < 1e-6);
        assert!((rect.long_side() - 99.0).abs() < 1e-6);

        let (a, b) = rect.farthest_corners();
        let diagonal = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        assert!((diagonal - (99.0f64.powi(2) + 36.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_mask_and_masked_mean() {
        let mut rgb = RgbImage::from_pixel(30, 30, Rgb([255, 255, 255]));
        for y in 10..20 {
            for x in 10..20 {
                rgb.put_pixel(x, y, Rgb([200, 100, 50]));
            }
        }
        let binary = filled_rect_image(30, 30, Rect::at(10, 10).of_size(10, 10));
        let blobs = external_contours(&binary);
        let mask = blobs[0].mask(30, 30);

        assert_eq!(mask.pixels().filter(|p| p[0] > 0).count(), 100);
        assert_eq!(masked_mean(&rgb, &mask), Some([50.0, 100.0, 200.0]));
        assert_eq!(masked_mean(&rgb, &GrayImage::new(30, 30)), None);
        assert_eq!(blob_mean_color(&rgb, &blobs[0]), Some([50.0, 100.0, 200.0]));
    }

    #[test]
    fn test_single_pixel_blob_is_degenerate() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(4, 4, Luma([255u8]));
        let blobs = external_contours(&img);
        assert_eq!(blobs.len(), 1);

        let blob = &blobs[0];
        assert_eq!(blob.area(), 0.0);
        assert_eq!(blob.bounding_box(), BoundingBox::new(4, 4, 1, 1));
        assert_eq!(blob.mask(10, 10).pixels().filter(|p| p[0] > 0).count(), 1);
        assert_eq!(blob.min_area_rect().short_side(), 0.0);
    }
}
