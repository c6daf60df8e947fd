//! Debug overlay rendering. Purely observational, never feeds control.

use image::{imageops, GrayImage, Rgb, RgbImage};

use crate::geometry::Segment;

const STEEP_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const SHALLOW_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const STEEP_SLOPE: f64 = 0.3;

const INSET_SCALE: f64 = 0.28;
const INSET_ALPHA: f32 = 0.85;
const INSET_PADDING: u32 = 8;
const INSET_BORDER: Rgb<u8> = Rgb([200, 200, 200]);

/// Stamp a filled disc of `thickness` diameter along the segment.
pub fn draw_thick_line(canvas: &mut RgbImage, seg: &Segment, color: Rgb<u8>, thickness: u32) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let r = thickness as i64 / 2;
    let dx = (seg.x2 - seg.x1) as f64;
    let dy = (seg.y2 - seg.y1) as f64;
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i64;

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let cx = (seg.x1 as f64 + dx * t).round() as i64;
        let cy = (seg.y1 as f64 + dy * t).round() as i64;
        for oy in -r..=r {
            for ox in -r..=r {
                if ox * ox + oy * oy > r * r {
                    continue;
                }
                let (x, y) = (cx + ox, cy + oy);
                if x >= 0 && y >= 0 && x < w && y < h {
                    canvas.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
}

/// Blank BEV-sized canvas with every segment drawn; steep segments are
/// brighter and thicker.
pub fn render_segments(width: u32, height: u32, segments: &[Segment]) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    for seg in segments {
        let dx = (seg.x2 - seg.x1) as f64;
        let steep = dx == 0.0 || ((seg.y2 - seg.y1) as f64 / dx).abs() > STEEP_SLOPE;
        if steep {
            draw_thick_line(&mut canvas, seg, STEEP_COLOR, 3);
        } else {
            draw_thick_line(&mut canvas, seg, SHALLOW_COLOR, 2);
        }
    }
    canvas
}

/// Per-channel saturating add of `layer` onto `base`. Sizes must match.
pub fn saturating_add(base: &mut RgbImage, layer: &RgbImage) {
    for (b, l) in base.pixels_mut().zip(layer.pixels()) {
        for c in 0..3 {
            b[c] = b[c].saturating_add(l[c]);
        }
    }
}

/// Composite the BEV mask as a bordered inset in the bottom-left corner.
pub fn composite_inset(overlay: &mut RgbImage, bev_mask: &GrayImage) {
    let (w, h) = overlay.dimensions();
    let (mw, mh) = bev_mask.dimensions();
    if mw == 0 || mh == 0 {
        return;
    }
    let inset_w = (w as f64 * INSET_SCALE).round() as u32;
    let inset_h = (inset_w as f64 * mh as f64 / mw as f64).round() as u32;
    if inset_w < 2 || inset_h < 2 || inset_w + INSET_PADDING > w || inset_h + INSET_PADDING > h {
        return;
    }

    let rgb = RgbImage::from_fn(mw, mh, |x, y| {
        let v = bev_mask.get_pixel(x, y)[0];
        Rgb([v, v, v])
    });
    let thumb = imageops::resize(&rgb, inset_w, inset_h, imageops::FilterType::Triangle);

    let x0 = INSET_PADDING;
    let y0 = h - inset_h - INSET_PADDING;
    for (tx, ty, px) in thumb.enumerate_pixels() {
        let dst = overlay.get_pixel_mut(x0 + tx, y0 + ty);
        for c in 0..3 {
            let mixed = INSET_ALPHA * px[c] as f32 + (1.0 - INSET_ALPHA) * dst[c] as f32;
            dst[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }

    for tx in 0..inset_w {
        overlay.put_pixel(x0 + tx, y0, INSET_BORDER);
        overlay.put_pixel(x0 + tx, y0 + inset_h - 1, INSET_BORDER);
    }
    for ty in 0..inset_h {
        overlay.put_pixel(x0, y0 + ty, INSET_BORDER);
        overlay.put_pixel(x0 + inset_w - 1, y0 + ty, INSET_BORDER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_saturating_add_clips() {
        let mut base = RgbImage::from_pixel(2, 2, Rgb([200, 10, 0]));
        let layer = RgbImage::from_pixel(2, 2, Rgb([100, 20, 0]));
        saturating_add(&mut base, &layer);
        assert_eq!(*base.get_pixel(0, 0), Rgb([255, 30, 0]));
    }

    #[test]
    fn test_steep_segment_drawn_thick() {
        let canvas = render_segments(20, 20, &[Segment::new(10, 2, 10, 17)]);
        assert_eq!(*canvas.get_pixel(10, 10), STEEP_COLOR);
        assert_eq!(*canvas.get_pixel(9, 10), STEEP_COLOR);
        assert_eq!(*canvas.get_pixel(11, 10), STEEP_COLOR);
        assert_eq!(*canvas.get_pixel(13, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_inset_lands_bottom_left() {
        let mut overlay = RgbImage::new(100, 80);
        let mask = GrayImage::from_pixel(100, 80, Luma([255]));
        composite_inset(&mut overlay, &mask);
        // border corner at (8, 80 - 22 - 8)
        assert_eq!(*overlay.get_pixel(8, 50), INSET_BORDER);
        // inside: mostly white blended over black
        let inner = overlay.get_pixel(15, 60);
        assert!(inner[0] > 200);
        // top-right corner untouched
        assert_eq!(*overlay.get_pixel(90, 5), Rgb([0, 0, 0]));
    }
}
