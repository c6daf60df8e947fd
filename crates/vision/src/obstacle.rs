//! Vision-derived obstacle cue.
//!
//! Anything in the lower part of the BEV that is not lane marking is a
//! candidate. The largest 8-connected blob wins; it yields a side but never
//! a distance.

use contracts::ObstacleSide;
use image::GrayImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionObstacle {
    pub side: ObstacleSide,
    /// Blob size in pixels
    pub area: usize,
    /// Centroid in full BEV coordinates
    pub centroid: (f64, f64),
}

/// Largest non-marking blob in the bottom `roi` fraction of the BEV mask, if
/// its area reaches `min_area`.
pub fn detect_obstacle(bev_mask: &GrayImage, roi: f64, min_area: usize) -> Option<VisionObstacle> {
    let (w, h) = bev_mask.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let roi = roi.clamp(0.0, 1.0);
    let y_start = ((h as f64) * (1.0 - roi)).floor() as u32;
    let roi_h = h.saturating_sub(y_start);
    if roi_h == 0 {
        return None;
    }

    let wu = w as usize;
    let n = wu * roi_h as usize;
    // inverted mask: free space / obstacles are the non-marking pixels
    let roi_start = y_start as usize * wu;
    let mut open: Vec<bool> = bev_mask.as_raw()[roi_start..roi_start + n]
        .iter()
        .map(|&v| v == 0)
        .collect();

    let mut best: Option<(usize, f64, f64)> = None;
    let mut stack = Vec::new();
    for seed in 0..n {
        if !open[seed] {
            continue;
        }
        open[seed] = false;
        stack.push(seed);
        let (mut area, mut sx, mut sy) = (0usize, 0f64, 0f64);

        while let Some(i) = stack.pop() {
            let x = (i % wu) as i64;
            let y = (i / wu) as i64;
            area += 1;
            sx += x as f64;
            sy += y as f64;
            for oy in -1..=1 {
                for ox in -1..=1 {
                    let (nx, ny) = (x + ox, y + oy);
                    if nx < 0 || ny < 0 || nx >= wu as i64 || ny >= roi_h as i64 {
                        continue;
                    }
                    let j = ny as usize * wu + nx as usize;
                    if open[j] {
                        open[j] = false;
                        stack.push(j);
                    }
                }
            }
        }

        if best.map_or(true, |(a, _, _)| area > a) {
            best = Some((area, sx, sy));
        }
    }

    let (area, sx, sy) = best?;
    if area < min_area.max(1) {
        return None;
    }
    let cx = sx / area as f64;
    let cy = sy / area as f64 + y_start as f64;
    let side = if cx < w as f64 / 2.0 {
        ObstacleSide::Left
    } else {
        ObstacleSide::Right
    };
    Some(VisionObstacle {
        side,
        area,
        centroid: (cx, cy),
    })
}
