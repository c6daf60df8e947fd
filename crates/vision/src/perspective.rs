//! Bird's-eye-view rectification.
//!
//! The forward homography maps the road trapezoid in the camera image onto
//! an upright rectangle. Both directions, and their per-pixel remap tables,
//! are built once per frame size.

use image::{GrayImage, RgbImage};
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::VisionError;

const EPS: f64 = 1e-12;

/// Solve the 3×3 homography taking `src[i]` to `dst[i]` (h33 fixed to 1).
pub fn homography_from_points(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Matrix3<f64>, VisionError> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for i in 0..4 {
        let [x, y] = src[i];
        let [u, v] = dst[i];
        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b).ok_or(VisionError::DegenerateHomography)?;
    Ok(Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    ))
}

/// Apply a homography to one point. `None` when the point maps to infinity.
pub fn map_point(h: &Matrix3<f64>, x: f64, y: f64) -> Option<[f64; 2]> {
    let v = h * Vector3::new(x, y, 1.0);
    let w = v[2];
    if !w.is_finite() || w.abs() <= EPS {
        return None;
    }
    Some([v[0] / w, v[1] / w])
}

/// Bilinear source position for one output pixel
#[derive(Debug, Clone, Copy)]
struct Tap {
    x0: i32,
    y0: i32,
    fx: f32,
    fy: f32,
}

/// Per-pixel source lookup for a fixed homography and image size
///
/// Built once; every warp afterwards is table lookups plus bilinear blends.
#[derive(Debug, Clone)]
pub struct RemapTable {
    src_w: u32,
    src_h: u32,
    out_w: u32,
    out_h: u32,
    taps: Vec<Option<Tap>>,
}

impl RemapTable {
    /// `dst_to_src` maps output pixels back into the source image.
    pub fn new(dst_to_src: &Matrix3<f64>, src_w: u32, src_h: u32, out_w: u32, out_h: u32) -> Self {
        let taps = (0..out_h)
            .flat_map(|y| (0..out_w).map(move |x| (x, y)))
            .map(|(x, y)| {
                let [sx, sy] = map_point(dst_to_src, x as f64, y as f64)?;
                if !sx.is_finite() || !sy.is_finite() {
                    return None;
                }
                let x0 = sx.floor();
                let y0 = sy.floor();
                if x0 < -1.0 || y0 < -1.0 || x0 >= src_w as f64 || y0 >= src_h as f64 {
                    return None;
                }
                Some(Tap {
                    x0: x0 as i32,
                    y0: y0 as i32,
                    fx: (sx - x0) as f32,
                    fy: (sy - y0) as f32,
                })
            })
            .collect();
        Self {
            src_w,
            src_h,
            out_w,
            out_h,
            taps,
        }
    }

    /// Blend channel `c` of a `channels`-wide raw buffer; out-of-bounds
    /// taps read as zero.
    #[inline]
    fn blend(&self, data: &[u8], channels: usize, c: usize, tap: Tap) -> u8 {
        let (w, h) = (self.src_w as i32, self.src_h as i32);
        let at = |x: i32, y: i32| -> f32 {
            if x < 0 || y < 0 || x >= w || y >= h {
                0.0
            } else {
                data[(y as usize * w as usize + x as usize) * channels + c] as f32
            }
        };
        let top = at(tap.x0, tap.y0) * (1.0 - tap.fx) + at(tap.x0 + 1, tap.y0) * tap.fx;
        let bottom = at(tap.x0, tap.y0 + 1) * (1.0 - tap.fx) + at(tap.x0 + 1, tap.y0 + 1) * tap.fx;
        (top * (1.0 - tap.fy) + bottom * tap.fy)
            .round()
            .clamp(0.0, 255.0) as u8
    }

    pub fn warp_gray(&self, src: &GrayImage) -> GrayImage {
        debug_assert_eq!(src.dimensions(), (self.src_w, self.src_h));
        let data = src.as_raw();
        let mut out = GrayImage::new(self.out_w, self.out_h);
        for (dst, tap) in out.as_mut().iter_mut().zip(&self.taps) {
            if let Some(tap) = *tap {
                *dst = self.blend(data, 1, 0, tap);
            }
        }
        out
    }

    pub fn warp_rgb(&self, src: &RgbImage) -> RgbImage {
        debug_assert_eq!(src.dimensions(), (self.src_w, self.src_h));
        let data = src.as_raw();
        let mut out = RgbImage::new(self.out_w, self.out_h);
        for (dst, tap) in out.as_mut().chunks_exact_mut(3).zip(&self.taps) {
            if let Some(tap) = *tap {
                for (c, slot) in dst.iter_mut().enumerate() {
                    *slot = self.blend(data, 3, c, tap);
                }
            }
        }
        out
    }
}

/// Fixed camera ↔ BEV mapping for one frame size
#[derive(Debug, Clone)]
pub struct PerspectiveMap {
    /// camera → BEV
    forward: Matrix3<f64>,
    /// BEV → camera
    inverse: Matrix3<f64>,
    /// BEV pixel → camera sample
    to_bev: RemapTable,
    /// camera pixel → BEV sample
    from_bev: RemapTable,
}

impl PerspectiveMap {
    /// Trapezoid (40%w,60%h) (60%w,60%h) (10%w,95%h) (90%w,95%h) onto a
    /// full-height rectangle inset by 20% of the width on each side.
    pub fn for_frame(width: u32, height: u32) -> Result<Self, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::FrameSize {
                expected: (1, 1),
                actual: (width, height),
            });
        }
        let w = width as f64;
        let h = height as f64;
        let src = [
            [w * 0.40, h * 0.60],
            [w * 0.60, h * 0.60],
            [w * 0.10, h * 0.95],
            [w * 0.90, h * 0.95],
        ];
        let offset = w * 0.2;
        let dst = [[offset, 0.0], [w - offset, 0.0], [offset, h], [w - offset, h]];

        let forward = homography_from_points(&src, &dst)?;
        let inverse = homography_from_points(&dst, &src)?;
        Ok(Self {
            to_bev: RemapTable::new(&inverse, width, height, width, height),
            from_bev: RemapTable::new(&forward, width, height, width, height),
            forward,
            inverse,
        })
    }

    pub fn forward(&self) -> &Matrix3<f64> {
        &self.forward
    }

    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }

    /// Camera-space mask → BEV mask
    pub fn to_bev(&self, mask: &GrayImage) -> GrayImage {
        self.to_bev.warp_gray(mask)
    }

    /// BEV-space canvas → camera perspective
    pub fn from_bev(&self, canvas: &RgbImage) -> RgbImage {
        self.from_bev.warp_rgb(canvas)
    }
}

/// Warp a single-channel image. `dst_to_src` maps output pixels back into `src`.
///
/// Builds a throwaway table; hot paths keep a [`RemapTable`] instead.
pub fn warp_gray(src: &GrayImage, dst_to_src: &Matrix3<f64>, out_w: u32, out_h: u32) -> GrayImage {
    let (w, h) = src.dimensions();
    RemapTable::new(dst_to_src, w, h, out_w, out_h).warp_gray(src)
}

/// Warp an RGB image. `dst_to_src` maps output pixels back into `src`.
pub fn warp_rgb(src: &RgbImage, dst_to_src: &Matrix3<f64>, out_w: u32, out_h: u32) -> RgbImage {
    let (w, h) = src.dimensions();
    RemapTable::new(dst_to_src, w, h, out_w, out_h).warp_rgb(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn assert_close(p: [f64; 2], q: [f64; 2]) {
        assert!(
            (p[0] - q[0]).abs() < 1e-6 && (p[1] - q[1]).abs() < 1e-6,
            "{p:?} != {q:?}"
        );
    }

    #[test]
    fn test_trapezoid_maps_to_rectangle() {
        let map = PerspectiveMap::for_frame(640, 480).unwrap();
        let f = map.forward();
        assert_close(map_point(f, 256.0, 288.0).unwrap(), [128.0, 0.0]);
        assert_close(map_point(f, 384.0, 288.0).unwrap(), [512.0, 0.0]);
        assert_close(map_point(f, 64.0, 456.0).unwrap(), [128.0, 480.0]);
        assert_close(map_point(f, 576.0, 456.0).unwrap(), [512.0, 480.0]);
    }

    #[test]
    fn test_inverse_round_trips() {
        let map = PerspectiveMap::for_frame(640, 480).unwrap();
        let bev = map_point(map.forward(), 300.0, 400.0).unwrap();
        let back = map_point(map.inverse(), bev[0], bev[1]).unwrap();
        assert_close(back, [300.0, 400.0]);
    }

    #[test]
    fn test_degenerate_points_rejected() {
        let src = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let dst = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        assert!(homography_from_points(&src, &dst).is_err());
    }

    #[test]
    fn test_identity_warp_preserves_image() {
        let mut img = GrayImage::new(8, 6);
        img.put_pixel(3, 2, Luma([200]));
        let out = warp_gray(&img, &Matrix3::identity(), 8, 6);
        assert_eq!(out, img);
    }

    #[test]
    fn test_table_warp_matches_direct_bilinear() {
        let map = PerspectiveMap::for_frame(64, 48).unwrap();
        let mask = GrayImage::from_fn(64, 48, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let bev = map.to_bev(&mask);

        for (x, y) in [(32u32, 10u32), (20, 40), (45, 47), (30, 25)] {
            let [sx, sy] = map_point(map.inverse(), x as f64, y as f64).unwrap();
            let (x0, y0) = (sx.floor(), sy.floor());
            let (fx, fy) = (sx - x0, sy - y0);
            let at = |px: f64, py: f64| -> f64 {
                if px < 0.0 || py < 0.0 || px >= 64.0 || py >= 48.0 {
                    0.0
                } else {
                    mask.get_pixel(px as u32, py as u32)[0] as f64
                }
            };
            let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1.0, y0) * fx;
            let bottom = at(x0, y0 + 1.0) * (1.0 - fx) + at(x0 + 1.0, y0 + 1.0) * fx;
            let expected = top * (1.0 - fy) + bottom * fy;
            let got = bev.get_pixel(x, y)[0] as f64;
            assert!((got - expected).abs() <= 1.0, "({x},{y}): {got} vs {expected}");
        }
    }

    #[test]
    fn test_rgb_warp_keeps_channels_apart() {
        let img = RgbImage::from_pixel(8, 6, image::Rgb([10, 120, 250]));
        let out = warp_rgb(&img, &Matrix3::identity(), 8, 6);
        assert_eq!(*out.get_pixel(3, 3), image::Rgb([10, 120, 250]));
    }

    #[test]
    fn test_bev_of_blank_mask_is_blank() {
        let map = PerspectiveMap::for_frame(64, 48).unwrap();
        let bev = map.to_bev(&GrayImage::new(64, 48));
        assert!(bev.pixels().all(|p| p[0] == 0));
    }
}
