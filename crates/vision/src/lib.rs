//! # Vision
//!
//! Lane geometry extraction: one camera frame in, lane angle / status /
//! lateral position out, plus the BEV mask and a debug overlay.
//!
//! Pipeline: HLS threshold → open/close cleanup → BEV warp → Canny →
//! probabilistic Hough → per-segment angle mean. The BEV mask also feeds the
//! vision-side obstacle cue.

mod color;
mod draw;
mod edges;
mod error;
mod geometry;
mod hough;
mod morphology;
mod obstacle;
mod perspective;
mod position;

pub use color::{hls_in_range, rgb_to_hls};
pub use draw::{composite_inset, render_segments, saturating_add};
pub use edges::canny;
pub use error::VisionError;
pub use geometry::{mean_angle_deg, raw_angle_deg, Segment};
pub use hough::{hough_lines_p, HoughParams};
pub use morphology::clean_mask;
pub use obstacle::{detect_obstacle, VisionObstacle};
pub use perspective::{homography_from_points, map_point, PerspectiveMap};
pub use position::estimate_lateral_position;

use contracts::{LaneResult, LaneStatus, VisionConfig};
use image::{GrayImage, RgbImage};
use tracing::trace;

/// Everything one extractor pass produces
#[derive(Debug, Clone)]
pub struct LaneAnalysis {
    pub result: LaneResult,
    pub bev_mask: GrayImage,
    pub overlay: RgbImage,
    pub segments: Vec<Segment>,
}

/// Lane Geometry Extractor for a fixed frame size
#[derive(Debug, Clone)]
pub struct LaneExtractor {
    config: VisionConfig,
    hough: HoughParams,
    map: PerspectiveMap,
    width: u32,
    height: u32,
}

impl LaneExtractor {
    pub fn new(config: VisionConfig, width: u32, height: u32) -> Result<Self, VisionError> {
        let map = PerspectiveMap::for_frame(width, height)?;
        let hough = HoughParams {
            threshold: config.hough_threshold,
            min_line_length: config.min_line_length,
            max_line_gap: config.max_line_gap,
            ..HoughParams::default()
        };
        Ok(Self {
            config,
            hough,
            map,
            width,
            height,
        })
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn perspective(&self) -> &PerspectiveMap {
        &self.map
    }

    /// Binary lane mask in camera perspective
    pub fn lane_mask(&self, frame: &RgbImage) -> GrayImage {
        let raw = hls_in_range(frame, self.config.hls_lower, self.config.hls_upper);
        clean_mask(&raw)
    }

    pub fn process(&self, frame: &RgbImage) -> Result<LaneAnalysis, VisionError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(VisionError::FrameSize {
                expected: (self.width, self.height),
                actual: frame.dimensions(),
            });
        }

        let mask = self.lane_mask(frame);
        let bev_mask = self.map.to_bev(&mask);
        let edges = canny(&bev_mask, self.config.canny_low, self.config.canny_high);
        let segments = hough_lines_p(&edges, &self.hough);

        let lateral_position = estimate_lateral_position(
            &bev_mask,
            self.config.position_band,
            self.config.position_tolerance,
            self.config.min_position_pixels,
        );

        let result = match mean_angle_deg(&segments) {
            Some(angle_deg) => LaneResult {
                angle_deg,
                status: LaneStatus::Detected,
                lateral_position,
            },
            None => LaneResult {
                angle_deg: 0.0,
                status: LaneStatus::Lost,
                lateral_position,
            },
        };

        let mut overlay = frame.clone();
        if !segments.is_empty() {
            let canvas = render_segments(self.width, self.height, &segments);
            saturating_add(&mut overlay, &self.map.from_bev(&canvas));
        }
        if self.config.bev_inset {
            composite_inset(&mut overlay, &bev_mask);
        }

        trace!(
            segments = segments.len(),
            angle = result.angle_deg,
            position = result.lateral_position.as_str(),
            "lane frame processed"
        );

        Ok(LaneAnalysis {
            result,
            bev_mask,
            overlay,
            segments,
        })
    }

    /// Vision-side obstacle cue from an extractor BEV mask
    pub fn detect_obstacle(&self, bev_mask: &GrayImage) -> Option<VisionObstacle> {
        detect_obstacle(
            bev_mask,
            self.config.obstacle_roi,
            self.config.obstacle_min_area,
        )
    }
}
