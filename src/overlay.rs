/// Debug overlay
///
/// Draws the configured regions and a snapshot's detections onto a copy of
/// the frame so region tuning can be checked by eye. Map detections are
/// region-local, so they are shifted by the map region's origin.
use crate::color::Bgr;
use crate::frame::Frame;
use crate::region::{AbsoluteRegion, RegionKind, RegionTable};
use crate::snapshot::GameStateSnapshot;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

const REGION_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const MAP_REGION_COLOR: Rgb<u8> = Rgb([0, 120, 255]);
const STATION_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

/// Annotated copy of `frame`.
///
/// `width`/`height` are the window size the snapshot was produced with.
pub fn annotate(
    frame: &Frame,
    width: u32,
    height: u32,
    regions: &RegionTable,
    snapshot: &GameStateSnapshot,
) -> RgbImage {
    let mut canvas = frame.pixels().clone();
    let (frame_w, frame_h) = frame.dimensions();

    for (kind, region) in regions.iter() {
        let absolute = region.map(width, height).clip_to(frame_w, frame_h);
        let color = if kind == RegionKind::StationMap {
            MAP_REGION_COLOR
        } else {
            REGION_COLOR
        };
        draw_rect(&mut canvas, absolute, color);
    }

    let map = regions
        .get(RegionKind::StationMap)
        .map(width, height)
        .clip_to(frame_w, frame_h);
    let (ox, oy) = (map.x, map.y);

    for line in &snapshot.placed_lines {
        let color = to_rgb(line.color);
        for segment in &line.segments {
            draw_line_segment_mut(
                &mut canvas,
                ((segment.start.x + ox) as f32, (segment.start.y + oy) as f32),
                ((segment.end.x + ox) as f32, (segment.end.y + oy) as f32),
                color,
            );
        }
    }

    for station in &snapshot.stations {
        let b = station.bbox;
        draw_rect(&mut canvas, AbsoluteRegion::new(b.x + ox, b.y + oy, b.w, b.h), STATION_COLOR);
    }

    for train in &snapshot.trains {
        let b = train.bbox;
        // One pixel outside the token so its own color stays visible
        let outline = AbsoluteRegion::new(b.x + ox - 1, b.y + oy - 1, b.w + 2, b.h + 2);
        draw_rect(&mut canvas, outline, to_rgb(train.color));
    }

    canvas
}

fn draw_rect(canvas: &mut RgbImage, region: AbsoluteRegion, color: Rgb<u8>) {
    if region.is_empty() {
        return;
    }
    let rect = Rect::at(region.x, region.y).of_size(region.w as u32, region.h as u32);
    draw_hollow_rect_mut(canvas, rect, color);
}

fn to_rgb(color: Bgr) -> Rgb<u8> {
    let clamp = |v: u16| v.min(255) as u8;
    Rgb([clamp(color.r), clamp(color.g), clamp(color.b)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contours::{BoundingBox, PixelPoint};
    use crate::detection::{ShapeLabel, Station};
    use crate::region::NormalizedRegion;

    #[test]
    fn test_annotate_draws_regions_and_stations() {
        let frame = Frame::new(RgbImage::from_pixel(200, 100, Rgb([0, 0, 0])));
        let mut regions = RegionTable::default();
        regions.set(RegionKind::StationMap, NormalizedRegion::new(0.1, 0.1, 0.5, 0.5));

        let snapshot = GameStateSnapshot {
            stations: vec![Station {
                shape: ShapeLabel::Circle,
                position: PixelPoint::new(15, 15),
                bbox: BoundingBox::new(10, 10, 10, 10),
            }],
            ..GameStateSnapshot::default()
        };

        let out = annotate(&frame, 200, 100, &regions, &snapshot);
        assert_eq!(out.dimensions(), (200, 100));
        // Map region corner at (20, 10)
        assert_eq!(*out.get_pixel(20, 10), MAP_REGION_COLOR);
        // Station drawn in frame coordinates: (10 + 20, 10 + 10)
        assert_eq!(*out.get_pixel(30, 20), STATION_COLOR);
        // Source frame untouched
        assert_eq!(*frame.pixels().get_pixel(30, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_quantized_colors_clamp() {
        assert_eq!(to_rgb(Bgr::new(260, 40, 0)), Rgb([0, 40, 255]));
    }
}
