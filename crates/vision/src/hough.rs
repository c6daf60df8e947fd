//! Progressive probabilistic Hough transform.
//!
//! Points are visited in random order; each votes into the (θ, ρ)
//! accumulator, and as soon as a bin reaches the threshold the corridor along
//! that line is walked in both directions, the resulting segment is emitted
//! if long enough, and its pixels are removed from both the mask and the
//! accumulator. The RNG is seeded so a given mask always yields the same
//! segments.

use std::f64::consts::PI;

use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::Segment;

const SHIFT: u32 = 16;
const SEED: u64 = 0x5eed_1a4e;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    /// Distance resolution in pixels
    pub rho: f64,
    /// Angle resolution in radians
    pub theta: f64,
    pub threshold: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
    /// 0 = unlimited
    pub max_lines: usize,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: PI / 180.0,
            threshold: 25,
            min_line_length: 25,
            max_line_gap: 20,
            max_lines: 0,
        }
    }
}

pub fn hough_lines_p(edges: &GrayImage, params: &HoughParams) -> Vec<Segment> {
    let (width, height) = edges.dimensions();
    let (w, h) = (width as i64, height as i64);
    let mut lines = Vec::new();
    if w == 0 || h == 0 || params.rho <= 0.0 || params.theta <= 0.0 {
        return lines;
    }

    let irho = 1.0 / params.rho;
    let numangle = ((PI / params.theta).round() as usize).max(1);
    let numrho = (((w + h) * 2 + 1) as f64 / params.rho).round() as i64;
    let half = (numrho - 1) / 2;
    let threshold = params.threshold.max(1) as i32;
    let line_gap = params.max_line_gap as i64;
    let line_length = params.min_line_length as i64;

    let trig: Vec<(f64, f64)> = (0..numangle)
        .map(|n| {
            let a = n as f64 * params.theta;
            (a.cos() * irho, a.sin() * irho)
        })
        .collect();

    let mut accum = vec![0i32; numangle * numrho as usize];
    let mut mask = vec![false; (w * h) as usize];
    let mut points: Vec<(i64, i64)> = Vec::new();
    for (x, y, px) in edges.enumerate_pixels() {
        if px[0] != 0 {
            mask[(y as i64 * w + x as i64) as usize] = true;
            points.push((x as i64, y as i64));
        }
    }

    let rho_bin = |n: usize, x: i64, y: i64| -> usize {
        let (c, s) = trig[n];
        let r = (x as f64 * c + y as f64 * s).round() as i64 + half;
        n * numrho as usize + r.clamp(0, numrho - 1) as usize
    };

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut count = points.len();
    while count > 0 {
        let idx = rng.random_range(0..count);
        let (px, py) = points[idx];
        points[idx] = points[count - 1];
        count -= 1;

        if !mask[(py * w + px) as usize] {
            continue;
        }

        let mut max_val = threshold - 1;
        let mut max_n = 0usize;
        for n in 0..numangle {
            let bin = rho_bin(n, px, py);
            accum[bin] += 1;
            if accum[bin] > max_val {
                max_val = accum[bin];
                max_n = n;
            }
        }
        if max_val < threshold {
            continue;
        }

        // walk direction along the winning line, fixed point on the minor axis
        let a = -trig[max_n].1;
        let b = trig[max_n].0;
        let scale = (1i64 << SHIFT) as f64;
        let (xflag, dx0, dy0, x0, y0) = if a.abs() > b.abs() {
            (
                true,
                if a > 0.0 { 1 } else { -1 },
                (b * scale / a.abs()).round() as i64,
                px,
                (py << SHIFT) + (1 << (SHIFT - 1)),
            )
        } else {
            (
                false,
                (a * scale / b.abs()).round() as i64,
                if b > 0.0 { 1 } else { -1 },
                (px << SHIFT) + (1 << (SHIFT - 1)),
                py,
            )
        };
        let to_pixel = |x: i64, y: i64| -> (i64, i64) {
            if xflag {
                (x, y >> SHIFT)
            } else {
                (x >> SHIFT, y)
            }
        };

        let mut line_end = [(px, py), (px, py)];
        for (k, end) in line_end.iter_mut().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            let mut gap = 0;
            loop {
                let (j1, i1) = to_pixel(x, y);
                if j1 < 0 || j1 >= w || i1 < 0 || i1 >= h {
                    break;
                }
                if mask[(i1 * w + j1) as usize] {
                    gap = 0;
                    *end = (j1, i1);
                } else {
                    gap += 1;
                    if gap > line_gap {
                        break;
                    }
                }
                x += dx;
                y += dy;
            }
        }

        let good_line = (line_end[1].0 - line_end[0].0).abs() >= line_length
            || (line_end[1].1 - line_end[0].1).abs() >= line_length;

        for (k, end) in line_end.iter().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            loop {
                let (j1, i1) = to_pixel(x, y);
                if j1 < 0 || j1 >= w || i1 < 0 || i1 >= h {
                    break;
                }
                let m = (i1 * w + j1) as usize;
                if mask[m] {
                    if good_line {
                        for n in 0..numangle {
                            accum[rho_bin(n, j1, i1)] -= 1;
                        }
                    }
                    mask[m] = false;
                }
                if (j1, i1) == *end {
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        if good_line {
            lines.push(Segment::new(
                line_end[0].0 as i32,
                line_end[0].1 as i32,
                line_end[1].0 as i32,
                line_end[1].1 as i32,
            ));
            if params.max_lines > 0 && lines.len() >= params.max_lines {
                break;
            }
        }
    }
    lines
}
