/// Circular Hough transform (gradient voting)
///
/// Edge pixels vote along their gradient direction, in both senses, for every
/// radius in range. Centers are accumulator peaks; each center then takes the
/// radius most edge pixels agree on, provided they cover enough of its
/// circumference.
use image::GrayImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoughParams {
    /// Image-to-accumulator resolution ratio.
    pub dp: f32,
    /// Minimum distance between accepted centers (pixels).
    pub min_dist: f32,
    /// Upper Canny threshold; the lower one is half of it.
    pub canny_high: f32,
    /// Votes a center (and its radius) needs to be accepted.
    pub acc_threshold: u32,
    /// Fraction of the circumference `2*pi*r` that must be edge pixels.
    pub min_edge_coverage: f32,
    pub min_radius: u32,
    pub max_radius: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            dp: 1.2,
            min_dist: 20.0,
            canny_high: 50.0,
            acc_threshold: 30,
            min_edge_coverage: 0.5,
            min_radius: 3,
            max_radius: 30,
        }
    }
}

/// A detected circle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: u32,
    /// Accumulator votes around the center.
    pub votes: u32,
}

/// Find circles in a (pre-smoothed) grayscale image.
///
/// Returns circles strongest first.
pub fn hough_circles(gray: &GrayImage, params: &HoughParams) -> Vec<Circle> {
    let (w, h) = gray.dimensions();
    if w < 4 || h < 4 || params.max_radius < params.min_radius || params.max_radius == 0 {
        return Vec::new();
    }
    let dp = params.dp.max(1.0);

    let edges = imageproc::edges::canny(gray, params.canny_high * 0.5, params.canny_high);
    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);

    // Edge pixels with a usable gradient direction
    let mut edge_points: Vec<(f32, f32, f32, f32)> = Vec::new();
    for (x, y, px) in edges.enumerate_pixels() {
        if px[0] == 0 {
            continue;
        }
        let dx = gx.get_pixel(x, y)[0] as f32;
        let dy = gy.get_pixel(x, y)[0] as f32;
        let mag = (dx * dx + dy * dy).sqrt();
        if mag < 1e-3 {
            continue;
        }
        edge_points.push((x as f32, y as f32, dx / mag, dy / mag));
    }
    if edge_points.is_empty() {
        return Vec::new();
    }

    let acc_w = (w as f32 / dp).ceil() as usize;
    let acc_h = (h as f32 / dp).ceil() as usize;
    let mut accum = vec![0u32; acc_w * acc_h];

    let r_min = params.min_radius as f32;
    let r_max = params.max_radius as f32;
    for &(x, y, ux, uy) in &edge_points {
        for sign in [1.0f32, -1.0] {
            // Step one accumulator cell at a time; each cell counts once per ray
            let mut last_cell = usize::MAX;
            let mut r = r_min;
            while r <= r_max {
                let cx = x + sign * ux * r;
                let cy = y + sign * uy * r;
                if cx < 0.0 || cy < 0.0 || cx >= w as f32 || cy >= h as f32 {
                    break;
                }
                let cell = (cy / dp) as usize * acc_w + (cx / dp) as usize;
                if cell != last_cell {
                    accum[cell] += 1;
                    last_cell = cell;
                }
                r += dp;
            }
        }
    }

    // Votes scatter over neighbouring cells, so peaks are taken on 3x3 sums
    let mut support = vec![0u32; acc_w * acc_h];
    for ay in 1..acc_h.saturating_sub(1) {
        for ax in 1..acc_w.saturating_sub(1) {
            let mut sum = 0;
            for ny in ay - 1..=ay + 1 {
                let row = ny * acc_w;
                sum += accum[row + ax - 1] + accum[row + ax] + accum[row + ax + 1];
            }
            support[ay * acc_w + ax] = sum;
        }
    }

    // Local maxima above threshold, ties broken toward the later cell
    let mut peaks: Vec<(usize, usize, u32)> = Vec::new();
    for ay in 1..acc_h.saturating_sub(1) {
        for ax in 1..acc_w.saturating_sub(1) {
            let idx = ay * acc_w + ax;
            let v = support[idx];
            if v <= params.acc_threshold {
                continue;
            }
            if v > support[idx - 1]
                && v >= support[idx + 1]
                && v > support[idx - acc_w]
                && v >= support[idx + acc_w]
            {
                peaks.push((ax, ay, v));
            }
        }
    }
    peaks.sort_by(|a, b| b.2.cmp(&a.2).then((a.1, a.0).cmp(&(b.1, b.0))));

    let mut circles: Vec<Circle> = Vec::new();
    for (ax, ay, votes) in peaks {
        let (cx, cy) = refine_center(&accum, acc_w, ax, ay, dp);
        // Suppression distance grows with the accepted circle: no center
        // may sit inside another circle.
        if circles.iter().any(|c| {
            let reach = params.min_dist.max(c.radius as f32);
            (c.x - cx).powi(2) + (c.y - cy).powi(2) < reach * reach
        }) {
            tracing::trace!("Center ({:.1}, {:.1}) suppressed", cx, cy);
            continue;
        }

        let Some(radius) = best_radius(&edge_points, cx, cy, params) else {
            tracing::trace!("Center ({:.1}, {:.1}) has no radius support", cx, cy);
            continue;
        };
        circles.push(Circle {
            x: cx,
            y: cy,
            radius,
            votes,
        });
    }
    circles
}

/// Vote-weighted centroid of the 3x3 cells around a peak, in image pixels.
fn refine_center(accum: &[u32], acc_w: usize, ax: usize, ay: usize, dp: f32) -> (f32, f32) {
    let (mut sx, mut sy, mut total) = (0.0f32, 0.0f32, 0.0f32);
    for ny in ay - 1..=ay + 1 {
        for nx in ax - 1..=ax + 1 {
            let v = accum[ny * acc_w + nx] as f32;
            sx += v * (nx as f32 + 0.5);
            sy += v * (ny as f32 + 0.5);
            total += v;
        }
    }
    (sx / total * dp, sy / total * dp)
}

/// Radius with the most edge pixels at that distance (+-1 px), if enough agree.
///
/// Enough means at least `acc_threshold` pixels and at least
/// `min_edge_coverage` of the circumference at that radius.
fn best_radius(
    edge_points: &[(f32, f32, f32, f32)],
    cx: f32,
    cy: f32,
    params: &HoughParams,
) -> Option<u32> {
    let max_r = params.max_radius as usize;
    let mut histogram = vec![0u32; max_r + 2];
    for &(x, y, _, _) in edge_points {
        let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt().round();
        if d >= params.min_radius as f32 && d <= params.max_radius as f32 {
            histogram[d as usize] += 1;
        }
    }

    let mut best: Option<(u32, u32)> = None;
    for r in params.min_radius.max(1)..=params.max_radius {
        let r_idx = r as usize;
        let support = histogram[r_idx - 1] + histogram[r_idx] + histogram[r_idx + 1];
        if best.map_or(true, |(_, s)| support > s) {
            best = Some((r, support));
        }
    }

    best.filter(|&(r, support)| {
        let needed = (params.min_edge_coverage * std::f32::consts::TAU * r as f32).ceil() as u32;
        support >= params.acc_threshold.max(needed)
    })
    .map(|(r, _)| r)
}
