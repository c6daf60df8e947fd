//! Canny edge detector.
//!
//! Sobel 3×3 with replicated borders, L1 gradient magnitude, non-maximum
//! suppression on four quantised directions, then 8-connected hysteresis.

use image::{GrayImage, Luma};

/// tan(22.5°) in 15-bit fixed point
const TAN22_5: i64 = 13573;
const SHIFT: u32 = 15;

fn sobel(src: &GrayImage) -> (Vec<i32>, Vec<i32>) {
    let (w, h) = src.dimensions();
    let (w, h) = (w as i64, h as i64);
    let data = src.as_raw();
    let at = |x: i64, y: i64| -> i32 {
        let cx = x.clamp(0, w - 1);
        let cy = y.clamp(0, h - 1);
        data[(cy * w + cx) as usize] as i32
    };

    let n = (w * h) as usize;
    let mut dx = vec![0i32; n];
    let mut dy = vec![0i32; n];
    for y in 0..h {
        for x in 0..w {
            let gx = (at(x + 1, y - 1) + 2 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2 * at(x, y - 1) + at(x + 1, y - 1));
            let i = (y * w + x) as usize;
            dx[i] = gx;
            dy[i] = gy;
        }
    }
    (dx, dy)
}

/// Binary edge map (255 = edge).
pub fn canny(src: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    if w < 3 || h < 3 {
        return out;
    }
    let (low, high) = if low > high { (high, low) } else { (low, high) };
    let low = low.floor() as i32;
    let high = high.floor() as i32;

    let (dx, dy) = sobel(src);
    let mag: Vec<i32> = dx.iter().zip(&dy).map(|(a, b)| a.abs() + b.abs()).collect();

    let wu = w as usize;
    let hu = h as usize;
    // 0 = suppressed, 1 = weak candidate, 2 = strong
    let mut class = vec![0u8; wu * hu];
    let mut stack: Vec<usize> = Vec::new();

    for y in 1..hu - 1 {
        for x in 1..wu - 1 {
            let i = y * wu + x;
            let m = mag[i];
            if m <= low {
                continue;
            }
            let xs = dx[i] as i64;
            let ys = dy[i] as i64;
            let ax = xs.abs();
            let ay = ys.abs() << SHIFT;
            let tg22x = ax * TAN22_5;

            let is_max = if ay < tg22x {
                m > mag[i - 1] && m >= mag[i + 1]
            } else {
                let tg67x = tg22x + (ax << (SHIFT + 1));
                if ay > tg67x {
                    m > mag[i - wu] && m >= mag[i + wu]
                } else {
                    let diag = if (xs ^ ys) < 0 { -1i64 } else { 1 };
                    let a = mag[(i as i64 - wu as i64 - diag) as usize];
                    let b = mag[(i as i64 + wu as i64 + diag) as usize];
                    m > a && m > b
                }
            };
            if !is_max {
                continue;
            }
            if m > high {
                class[i] = 2;
                stack.push(i);
            } else {
                class[i] = 1;
            }
        }
    }

    while let Some(i) = stack.pop() {
        let x = (i % wu) as i64;
        let y = (i / wu) as i64;
        for oy in -1..=1 {
            for ox in -1..=1 {
                let nx = x + ox;
                let ny = y + oy;
                if nx < 0 || ny < 0 || nx >= wu as i64 || ny >= hu as i64 {
                    continue;
                }
                let j = ny as usize * wu + nx as usize;
                if class[j] == 1 {
                    class[j] = 2;
                    stack.push(j);
                }
            }
        }
    }

    for (i, c) in class.iter().enumerate() {
        if *c == 2 {
            out.put_pixel((i % wu) as u32, (i / wu) as u32, Luma([255]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_image_has_no_edges() {
        let img = GrayImage::from_pixel(16, 16, Luma([255]));
        assert!(canny(&img, 40.0, 120.0).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_vertical_step_yields_vertical_edge() {
        let mut img = GrayImage::new(20, 20);
        for y in 0..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let edges = canny(&img, 40.0, 120.0);
        let cols: Vec<u32> = edges
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == 255)
            .map(|(x, _, _)| x)
            .collect();
        assert!(!cols.is_empty());
        assert!(cols.iter().all(|&x| x == 9 || x == 10), "{cols:?}");
        // one pixel wide after suppression
        let row5 = (0..20).filter(|&x| edges.get_pixel(x, 5)[0] == 255).count();
        assert_eq!(row5, 1);
    }

    #[test]
    fn test_weak_gradient_is_dropped() {
        let mut img = GrayImage::new(20, 20);
        for y in 0..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Luma([5]));
            }
        }
        assert!(canny(&img, 40.0, 120.0).pixels().all(|p| p[0] == 0));
    }
}
