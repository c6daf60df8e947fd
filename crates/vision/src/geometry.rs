//! Segment angle measurement.
//!
//! Angles are measured in BEV image coordinates (x right, y down) as
//! `atan(dy/dx)`, so a segment's angle does not depend on which endpoint
//! comes first.

use contracts::clamp_steer;

/// Below this |dx| a segment counts as vertical
pub const VERTICAL_DX_EPS: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Segment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Unclamped angle in degrees, in (-90, 90]
    pub fn raw_angle_deg(&self) -> f64 {
        raw_angle_deg(
            self.x1 as f64,
            self.y1 as f64,
            self.x2 as f64,
            self.y2 as f64,
        )
    }

    pub fn angle_deg(&self) -> f64 {
        clamp_steer(self.raw_angle_deg())
    }

    pub fn length(&self) -> f64 {
        let dx = (self.x2 - self.x1) as f64;
        let dy = (self.y2 - self.y1) as f64;
        dx.hypot(dy)
    }
}

pub fn raw_angle_deg(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx.abs() < VERTICAL_DX_EPS {
        return 90.0;
    }
    (dy / dx).atan().to_degrees()
}

/// Clamped per-segment angles averaged with equal weight. `None` for no segments.
pub fn mean_angle_deg(segments: &[Segment]) -> Option<f64> {
    if segments.is_empty() {
        return None;
    }
    let sum: f64 = segments.iter().map(Segment::angle_deg).sum();
    Some(clamp_steer(sum / segments.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirty_degree_line() {
        // four collinear points on a 30° line, take the outer pair
        let t = 30f64.to_radians();
        let pts: Vec<(f64, f64)> = (0..4)
            .map(|i| (10.0 + 40.0 * i as f64 * t.cos(), 5.0 + 40.0 * i as f64 * t.sin()))
            .collect();
        let (a, b) = (pts[0], pts[3]);
        let fwd = raw_angle_deg(a.0, a.1, b.0, b.1);
        assert!((fwd - 30.0).abs() < 1.0, "{fwd}");
        assert!((clamp_steer(fwd) - 30.0).abs() < 1.0);
    }

    #[test]
    fn test_endpoint_order_keeps_sign() {
        let s = Segment::new(100, 200, 187, 150);
        let r = Segment::new(187, 150, 100, 200);
        assert_eq!(s.angle_deg(), r.angle_deg());
        assert!(s.angle_deg() < 0.0);
    }

    #[test]
    fn test_vertical_segment() {
        let s = Segment::new(50, 10, 50, 90);
        assert_eq!(s.raw_angle_deg(), 90.0);
        assert_eq!(s.angle_deg(), 45.0);
    }

    #[test]
    fn test_mean_is_unweighted() {
        let short = Segment::new(0, 0, 10, 0);
        let long = Segment::new(0, 0, 100, 100);
        let mean = mean_angle_deg(&[short, long]).unwrap();
        assert!((mean - 22.5).abs() < 1e-9);
        assert_eq!(mean_angle_deg(&[]), None);
    }
}
