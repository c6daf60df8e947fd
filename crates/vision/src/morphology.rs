//! 3×3 binary morphology.
//!
//! Out-of-bounds neighbours are ignored, so the border never erodes a
//! marking and never dilates one into existence.

use image::GrayImage;

/// 3-wide min/max along one axis of a raw buffer. `step` is the distance
/// between neighbours, `len` the number of samples per line and `lines`
/// the start offsets of each line.
fn pass3(
    src: &[u8],
    dst: &mut [u8],
    step: usize,
    len: usize,
    lines: impl Iterator<Item = usize>,
    pick: fn(u8, u8) -> u8,
) {
    for start in lines {
        for i in 0..len {
            let at = |k: usize| src[start + k * step];
            let mut acc = at(i);
            if i > 0 {
                acc = pick(acc, at(i - 1));
            }
            if i + 1 < len {
                acc = pick(acc, at(i + 1));
            }
            dst[start + i * step] = acc;
        }
    }
}

/// The 3×3 window with ignored out-of-bounds taps is a clipped rectangle,
/// so it splits into a row pass followed by a column pass.
fn filter3(src: &GrayImage, pick_max: bool) -> GrayImage {
    let (w, h) = src.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let pick: fn(u8, u8) -> u8 = if pick_max { u8::max } else { u8::min };

    let mut rows = vec![0u8; wu * hu];
    pass3(src.as_raw(), &mut rows, 1, wu, (0..hu).map(|y| y * wu), pick);

    let mut out = GrayImage::new(w, h);
    pass3(&rows, out.as_mut(), wu, hu, 0..wu, pick);
    out
}

pub fn erode3(src: &GrayImage) -> GrayImage {
    filter3(src, false)
}

pub fn dilate3(src: &GrayImage) -> GrayImage {
    filter3(src, true)
}

/// Erode then dilate: removes isolated speckle.
pub fn open3(src: &GrayImage) -> GrayImage {
    dilate3(&erode3(src))
}

/// Dilate then erode: fills pinholes and small gaps.
pub fn close3(src: &GrayImage) -> GrayImage {
    erode3(&dilate3(src))
}

/// Opening followed by closing. The order matters: closing first would
/// grow speckle into blobs that opening can no longer remove.
pub fn clean_mask(src: &GrayImage) -> GrayImage {
    close3(&open3(src))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn count_on(img: &GrayImage) -> usize {
        img.pixels().filter(|p| p[0] > 0).count()
    }

    #[test]
    fn test_open_removes_isolated_pixel() {
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(4, 4, Luma([255]));
        assert_eq!(count_on(&open3(&img)), 0);
    }

    #[test]
    fn test_close_fills_pinhole() {
        let mut img = GrayImage::from_pixel(9, 9, Luma([255]));
        img.put_pixel(4, 4, Luma([0]));
        let closed = close3(&img);
        assert_eq!(closed.get_pixel(4, 4)[0], 255);
    }

    #[test]
    fn test_thick_stripe_survives_cleanup() {
        let mut img = GrayImage::new(20, 20);
        for y in 0..20 {
            for x in 8..13 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let cleaned = clean_mask(&img);
        assert_eq!(cleaned, img);
    }

    /// Direct 3×3 window, for checking the separable passes
    fn reference(src: &GrayImage, pick_max: bool) -> GrayImage {
        let (w, h) = src.dimensions();
        GrayImage::from_fn(w, h, |x, y| {
            let mut acc = if pick_max { 0 } else { 255 };
            for yy in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for xx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let v = src.get_pixel(xx, yy)[0];
                    acc = if pick_max { acc.max(v) } else { acc.min(v) };
                }
            }
            Luma([acc])
        })
    }

    #[test]
    fn test_separable_passes_match_full_window() {
        let img = GrayImage::from_fn(23, 17, |x, y| {
            Luma([if (x * 31 + y * 17) % 7 < 3 { 255 } else { 0 }])
        });
        assert_eq!(erode3(&img), reference(&img, false));
        assert_eq!(dilate3(&img), reference(&img, true));
    }

    #[test]
    fn test_order_matters_for_speckle_pairs() {
        // four speckles on a 2 px grid: close-then-open merges them into a
        // blob that survives; open-then-close removes all of them.
        let mut img = GrayImage::new(11, 11);
        for (x, y) in [(4, 4), (6, 4), (4, 6), (6, 6)] {
            img.put_pixel(x, y, Luma([255]));
        }

        assert_eq!(count_on(&clean_mask(&img)), 0);
        let reversed = open3(&close3(&img));
        assert!(count_on(&reversed) > 0);
    }
}
