//! Lateral position of the rover relative to the lane marking.

use contracts::LateralPosition;
use image::GrayImage;

/// Classify from the bottom `band` fraction of the BEV mask.
///
/// A marking left of the center band means the rover sits to its right.
pub fn estimate_lateral_position(
    bev_mask: &GrayImage,
    band: f64,
    tolerance: f64,
    min_pixels: usize,
) -> LateralPosition {
    let (w, h) = bev_mask.dimensions();
    if w == 0 || h == 0 {
        return LateralPosition::Unknown;
    }
    let band = band.clamp(0.0, 1.0);
    let start = ((h as f64) * (1.0 - band)).floor() as u32;

    let mut count = 0usize;
    let mut min_x = u32::MAX;
    let mut max_x = 0u32;
    for y in start.min(h)..h {
        for x in 0..w {
            if bev_mask.get_pixel(x, y)[0] != 0 {
                count += 1;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
            }
        }
    }
    if count == 0 || count < min_pixels {
        return LateralPosition::Unknown;
    }

    let lane_center = (min_x + max_x) as f64 / 2.0;
    let frame_center = w as f64 / 2.0;
    let tol = w as f64 * tolerance;

    if lane_center < frame_center - tol {
        LateralPosition::Right
    } else if lane_center > frame_center + tol {
        LateralPosition::Left
    } else {
        LateralPosition::Center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with_stripe(x0: u32, x1: u32) -> GrayImage {
        let mut m = GrayImage::new(100, 100);
        for y in 70..100 {
            for x in x0..x1 {
                m.put_pixel(x, y, Luma([255]));
            }
        }
        m
    }

    #[test]
    fn test_marking_on_left_means_rover_right() {
        let m = mask_with_stripe(5, 15);
        assert_eq!(
            estimate_lateral_position(&m, 0.3, 0.2, 10),
            LateralPosition::Right
        );
    }

    #[test]
    fn test_marking_on_right_means_rover_left() {
        let m = mask_with_stripe(85, 95);
        assert_eq!(
            estimate_lateral_position(&m, 0.3, 0.2, 10),
            LateralPosition::Left
        );
    }

    #[test]
    fn test_centered_marking() {
        let m = mask_with_stripe(45, 55);
        assert_eq!(
            estimate_lateral_position(&m, 0.3, 0.2, 10),
            LateralPosition::Center
        );
    }

    #[test]
    fn test_too_few_pixels_is_unknown() {
        let mut m = GrayImage::new(100, 100);
        m.put_pixel(10, 90, Luma([255]));
        assert_eq!(
            estimate_lateral_position(&m, 0.3, 0.2, 10),
            LateralPosition::Unknown
        );
        assert_eq!(
            estimate_lateral_position(&GrayImage::new(100, 100), 0.3, 0.2, 10),
            LateralPosition::Unknown
        );
    }

    #[test]
    fn test_pixels_above_band_ignored() {
        let mut m = GrayImage::new(100, 100);
        for y in 0..50 {
            m.put_pixel(10, y, Luma([255]));
        }
        assert_eq!(
            estimate_lateral_position(&m, 0.3, 0.2, 10),
            LateralPosition::Unknown
        );
    }
}
