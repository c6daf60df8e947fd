//! LaneResult - Lane Geometry Extractor output

use serde::{Deserialize, Serialize};

/// Lane-marking detection status for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LaneStatus {
    /// At least one line segment was found in the BEV mask
    Detected,
    /// No segment found
    #[default]
    Lost,
}

/// Where the rover sits relative to the lane marking
///
/// A marking seen left of the frame center means the rover has drifted
/// `Right` of it, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LateralPosition {
    Left,
    Right,
    Center,
    #[default]
    Unknown,
}

impl LateralPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
            Self::Unknown => "unknown",
        }
    }
}

/// Per-tick lane geometry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LaneResult {
    /// Mean segment angle, clamped to ±[`STEER_LIMIT_DEG`](crate::STEER_LIMIT_DEG)
    pub angle_deg: f64,

    pub status: LaneStatus,

    pub lateral_position: LateralPosition,
}

impl LaneResult {
    /// Result for a tick where nothing could be measured
    pub fn lost() -> Self {
        Self::default()
    }

    pub fn is_detected(&self) -> bool {
        self.status == LaneStatus::Detected
    }
}
