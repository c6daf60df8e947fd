//! Synthetic lane source.
//!
//! Draws a straight lane marking in bird's-eye-view coordinates and projects
//! it into the camera perspective, so the extractor sees what a real camera
//! would. Behaves like a finite recording of `frame_count` frames.

use std::f64::consts::PI;

use contracts::{ContractError, FrameSource, FrameSourceKind, SyntheticConfig};
use image::{Rgb, RgbImage};
use vision::{map_point, PerspectiveMap};

use crate::error::Result;

const SKY: Rgb<u8> = Rgb([90, 110, 140]);
const ROAD: Rgb<u8> = Rgb([55, 55, 60]);
const MARKING: Rgb<u8> = Rgb([235, 235, 230]);

/// Fraction of the BEV height the marking passes through
const ANCHOR_Y: f64 = 0.85;

pub struct SyntheticSource {
    name: String,
    config: SyntheticConfig,
    width: u32,
    height: u32,
    /// camera pixel → BEV point, `None` above the horizon
    ground: Vec<Option<[f64; 2]>>,
    index: u32,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig, width: u32, height: u32) -> Result<Self> {
        let map = PerspectiveMap::for_frame(width, height)?;
        let f = map.forward();
        let ground = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x as f64, y as f64)))
            .map(|(x, y)| {
                // the image origin is always above the horizon; ground pixels
                // have the opposite homogeneous sign
                let w = f[(2, 0)] * x + f[(2, 1)] * y + f[(2, 2)];
                if w * f[(2, 2)] < 0.0 {
                    map_point(f, x, y)
                } else {
                    None
                }
            })
            .collect();
        Ok(Self {
            name: "synthetic".to_string(),
            config,
            width,
            height,
            ground,
            index: 0,
        })
    }

    /// Marking angle for frame `i`
    pub fn tilt_at(&self, i: u32) -> f64 {
        let n = self.config.frame_count.max(1) as f64;
        self.config.tilt_deg + self.config.sway_deg * (2.0 * PI * i as f64 / n).sin()
    }

    /// Render frame `i` without advancing.
    pub fn render(&self, i: u32) -> RgbImage {
        let w = self.width as f64;
        let h = self.height as f64;
        let cx = w / 2.0 + self.config.lateral_offset * w;
        let cy = h * ANCHOR_Y;
        let t = self.tilt_at(i).to_radians();
        let (dx, dy) = (t.cos(), t.sin());
        let half_width = (w / 80.0).max(3.0);

        let mut img = RgbImage::new(self.width, self.height);
        for (idx, px) in img.pixels_mut().enumerate() {
            *px = match self.ground[idx] {
                None => SKY,
                Some([bx, by]) => {
                    // perpendicular distance to the marking's center line
                    let d = ((bx - cx) * dy - (by - cy) * dx).abs();
                    if d <= half_width {
                        MARKING
                    } else {
                        ROAD
                    }
                }
            };
        }
        img
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FrameSourceKind {
        FrameSourceKind::Recording
    }

    fn read_frame(&mut self) -> std::result::Result<RgbImage, ContractError> {
        if self.index >= self.config.frame_count {
            return Err(ContractError::frame_read(&self.name, "end of synthetic sequence"));
        }
        let img = self.render(self.index);
        self.index += 1;
        Ok(img)
    }

    fn rewind(&mut self) -> std::result::Result<(), ContractError> {
        self.index = 0;
        Ok(())
    }
}
