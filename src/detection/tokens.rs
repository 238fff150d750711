/// Route-unlock panel token classifier
///
/// The panel shows one circular token per route. Gray tokens are locked,
/// enlarged ones are in use on the map, the rest can still be placed.
use super::circles::{hough_circles, HoughParams};
use crate::preprocessing::{self, HsvImage};
use image::RgbImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Available,
    Locked,
    Placed,
}

/// Per-state totals for the panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineTokenCounts {
    pub available: u32,
    pub locked: u32,
    pub placed: u32,
}

impl LineTokenCounts {
    pub fn total(&self) -> u32 {
        self.available + self.locked + self.placed
    }

    fn add(&mut self, state: TokenState) {
        match state {
            TokenState::Available => self.available += 1,
            TokenState::Locked => self.locked += 1,
            TokenState::Placed => self.placed += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Median blur window before circle fitting.
    pub median_ksize: u32,
    pub dp: f32,
    pub min_dist: f32,
    pub canny_high: f32,
    pub acc_threshold: u32,
    /// Share of a circle's circumference its edge pixels must cover.
    pub min_edge_coverage: f32,
    /// Radius search range as fractions of the panel width.
    pub min_radius_fraction: f64,
    pub max_radius_fraction: f64,
    /// Tokens at least this large (fraction of panel width) are placed.
    pub placed_radius_fraction: f64,
    /// Mean saturation below this means a locked (gray) token.
    pub locked_saturation: f64,
    /// Color sample half-window around the center, inclusive.
    pub sample_half_window: i32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            median_ksize: 5,
            dp: 1.2,
            min_dist: 20.0,
            canny_high: 50.0,
            acc_threshold: 30,
            min_edge_coverage: 0.5,
            min_radius_fraction: 0.03,
            max_radius_fraction: 0.15,
            placed_radius_fraction: 0.12,
            locked_saturation: 50.0,
            sample_half_window: 2,
        }
    }
}

impl TokenConfig {
    fn hough_params(&self, panel_width: u32) -> HoughParams {
        HoughParams {
            dp: self.dp,
            min_dist: self.min_dist,
            canny_high: self.canny_high,
            acc_threshold: self.acc_threshold,
            min_edge_coverage: self.min_edge_coverage,
            min_radius: (self.min_radius_fraction * panel_width as f64) as u32,
            max_radius: (self.max_radius_fraction * panel_width as f64) as u32,
        }
    }
}

/// Saturation first, then size: a gray token is locked whatever its radius.
pub fn classify_token(
    mean_saturation: f64,
    radius: u32,
    panel_width: u32,
    config: &TokenConfig,
) -> TokenState {
    let placed_radius = (config.placed_radius_fraction * panel_width as f64) as u32;
    if mean_saturation < config.locked_saturation {
        TokenState::Locked
    } else if radius >= placed_radius {
        TokenState::Placed
    } else {
        TokenState::Available
    }
}

/// Count tokens per state in a cropped panel image.
pub fn count_line_tokens(panel: &RgbImage, config: &TokenConfig) -> LineTokenCounts {
    let mut counts = LineTokenCounts::default();
    let (width, height) = panel.dimensions();
    if width == 0 || height == 0 {
        return counts;
    }

    let gray = preprocessing::median_blur(&preprocessing::to_grayscale(panel), config.median_ksize);
    let circles = hough_circles(&gray, &config.hough_params(width));
    let hsv = HsvImage::from_rgb(panel);

    for circle in &circles {
        let Some(mean) = hsv.window_mean(
            circle.x as i32,
            circle.y as i32,
            config.sample_half_window,
        ) else {
            continue;
        };
        let state = classify_token(mean[1], circle.radius, width, config);
        tracing::trace!(
            "Token at ({:.0}, {:.0}) r={} sat={:.0} -> {:?}",
            circle.x,
            circle.y,
            circle.radius,
            mean[1],
            state
        );
        counts.add(state);
    }

    tracing::debug!(
        "Line tokens: {} available, {} locked, {} placed",
        counts.available,
        counts.locked,
        counts.placed
    );
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_circle_mut;

    #[test]
    fn test_classification_order() {
        let config = TokenConfig::default();
        // 200 px panel: placed from radius 24
        assert_eq!(classify_token(200.0, 16, 200, &config), TokenState::Available);
        assert_eq!(classify_token(200.0, 24, 200, &config), TokenState::Placed);
        assert_eq!(classify_token(10.0, 16, 200, &config), TokenState::Locked);
        assert_eq!(classify_token(49.9, 28, 200, &config), TokenState::Locked);
        assert_eq!(classify_token(50.0, 23, 200, &config), TokenState::Available);
    }

    #[test]
    fn test_single_red_token_is_available() {
        let mut panel = RgbImage::from_pixel(200, 100, Rgb([230, 230, 230]));
        draw_filled_circle_mut(&mut panel, (100, 50), 16, Rgb([220, 30, 30]));

        let counts = count_line_tokens(&panel, &TokenConfig::default());
        assert_eq!(
            counts,
            LineTokenCounts {
                available: 1,
                locked: 0,
                placed: 0
            }
        );
    }

    #[test]
    fn test_mixed_panel_counts_sum() {
        let mut panel = RgbImage::from_pixel(400, 120, Rgb([235, 235, 235]));
        draw_filled_circle_mut(&mut panel, (60, 60), 20, Rgb([30, 60, 200]));
        draw_filled_circle_mut(&mut panel, (180, 60), 20, Rgb([90, 90, 90]));
        draw_filled_circle_mut(&mut panel, (310, 60), 52, Rgb([30, 160, 40]));

        let counts = count_line_tokens(&panel, &TokenConfig::default());
        assert_eq!(counts.available, 1);
        assert_eq!(counts.locked, 1);
        assert_eq!(counts.placed, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_large_token_on_wide_panel_counts_once() {
        // 1920-wide window: the default lines panel is 576 x 108
        let config = TokenConfig::default();
        for radius in [40, 52] {
            let mut panel = RgbImage::from_pixel(576, 108, Rgb([235, 235, 235]));
            draw_filled_circle_mut(&mut panel, (288, 54), radius, Rgb([220, 30, 30]));

            let counts = count_line_tokens(&panel, &config);
            assert_eq!(counts.total(), 1, "radius {radius}: {counts:?}");
            assert_eq!(counts.available, 1);
        }

        let mut panel = RgbImage::from_pixel(576, 160, Rgb([235, 235, 235]));
        draw_filled_circle_mut(&mut panel, (288, 80), 70, Rgb([220, 30, 30]));
        let counts = count_line_tokens(&panel, &config);
        assert_eq!(
            counts,
            LineTokenCounts {
                available: 0,
                locked: 0,
                placed: 1
            }
        );
    }

    #[test]
    fn test_empty_panel() {
        let counts = count_line_tokens(&RgbImage::new(0, 0), &TokenConfig::default());
        assert_eq!(counts.total(), 0);
    }
}
