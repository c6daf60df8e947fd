//! RGB → HLS conversion and range thresholding.
//!
//! Uses the 8-bit convention common to camera tooling: H in [0, 180),
//! L and S in [0, 255].

use image::{GrayImage, RgbImage};

/// Convert one RGB pixel to 8-bit HLS.
pub fn rgb_to_hls(r: u8, g: u8, b: u8) -> [u8; 3] {
    let rf = r as f32 / 255.0;
    let gf = g as f32 / 255.0;
    let bf = b as f32 / 255.0;

    let vmax = rf.max(gf).max(bf);
    let vmin = rf.min(gf).min(bf);
    let diff = vmax - vmin;
    let l = (vmax + vmin) * 0.5;

    let (h, s) = if diff <= f32::EPSILON {
        (0.0, 0.0)
    } else {
        let s = if l < 0.5 {
            diff / (vmax + vmin)
        } else {
            diff / (2.0 - vmax - vmin)
        };
        let mut h = if vmax == rf {
            60.0 * (gf - bf) / diff
        } else if vmax == gf {
            120.0 + 60.0 * (bf - rf) / diff
        } else {
            240.0 + 60.0 * (rf - gf) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }
        (h, s)
    };

    [
        saturate((h * 0.5).round()),
        saturate((l * 255.0).round()),
        saturate((s * 255.0).round()),
    ]
}

#[inline]
fn saturate(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Binary mask of pixels whose HLS value lies inside `[lower, upper]` on all channels.
pub fn hls_in_range(frame: &RgbImage, lower: [u8; 3], upper: [u8; 3]) -> GrayImage {
    let mut mask = GrayImage::new(frame.width(), frame.height());
    for (dst, px) in mask.as_mut().iter_mut().zip(frame.as_raw().chunks_exact(3)) {
        let (r, g, b) = (px[0], px[1], px[2]);
        // lightness is (max + min) / 2; reject on it before the float path,
        // with one level of slack for rounding
        let sum = r.max(g).max(b) as u16 + r.min(g).min(b) as u16;
        if sum / 2 + 1 < lower[1] as u16 || sum / 2 > upper[1] as u16 + 1 {
            continue;
        }
        let hls = rgb_to_hls(r, g, b);
        if (0..3).all(|c| hls[c] >= lower[c] && hls[c] <= upper[c]) {
            *dst = 255;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_gray_levels_have_no_saturation() {
        assert_eq!(rgb_to_hls(0, 0, 0), [0, 0, 0]);
        assert_eq!(rgb_to_hls(255, 255, 255), [0, 255, 0]);
        assert_eq!(rgb_to_hls(128, 128, 128), [0, 128, 0]);
    }

    #[test]
    fn test_primary_hues() {
        assert_eq!(rgb_to_hls(255, 0, 0), [0, 128, 255]);
        assert_eq!(rgb_to_hls(0, 255, 0), [60, 128, 255]);
        assert_eq!(rgb_to_hls(0, 0, 255), [120, 128, 255]);
    }

    #[test]
    fn test_lightness_shortcut_agrees_with_full_conversion() {
        let lower = [0, 150, 0];
        let upper = [255, 255, 255];
        let frame = RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        });
        let mask = hls_in_range(&frame, lower, upper);
        for (x, y, px) in frame.enumerate_pixels() {
            let hls = rgb_to_hls(px[0], px[1], px[2]);
            let inside = (0..3).all(|c| hls[c] >= lower[c] && hls[c] <= upper[c]);
            assert_eq!(mask.get_pixel(x, y)[0] == 255, inside, "({x},{y}) {px:?}");
        }
    }

    #[test]
    fn test_threshold_keeps_bright_pixels() {
        let mut frame = RgbImage::from_pixel(4, 2, Rgb([40, 40, 40]));
        frame.put_pixel(1, 0, Rgb([240, 240, 240]));
        frame.put_pixel(3, 1, Rgb([200, 220, 190]));

        let mask = hls_in_range(&frame, [0, 150, 0], [255, 255, 255]);
        assert_eq!(mask.get_pixel(1, 0)[0], 255);
        assert_eq!(mask.get_pixel(3, 1)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.pixels().filter(|p| p[0] == 255).count(), 2);
    }
}
