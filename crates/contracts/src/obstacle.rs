//! Obstacle belief and the sensor readings that feed it

use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Side of the rover an obstacle was seen on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleSide {
    Left,
    Right,
    Center,
}

impl ObstacleSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        }
    }
}

impl FromStr for ObstacleSide {
    type Err = ();

    /// Accepts single-letter firmware tags (`L`, `R`, `C`) and full names, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Ok(Self::Left),
            "r" | "right" => Ok(Self::Right),
            "c" | "center" | "centre" => Ok(Self::Center),
            _ => Err(()),
        }
    }
}

/// Which producer wrote the current belief
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeliefSource {
    #[default]
    None,
    Sensor,
    Vision,
}

/// Fused obstacle estimate read by the control policy once per tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObstacleBelief {
    pub detected: bool,

    /// Range in centimeters; vision cues never carry one
    pub distance_cm: Option<f64>,

    pub side: Option<ObstacleSide>,

    pub source: BeliefSource,

    pub last_update: Option<Instant>,
}

impl ObstacleBelief {
    /// Nothing detected, no reading
    pub fn clear() -> Self {
        Self::default()
    }

    /// Distance usable for control decisions
    pub fn range_cm(&self) -> Option<f64> {
        self.distance_cm.filter(|d| d.is_finite() && *d >= 0.0)
    }

    /// Detected with a usable range
    ///
    /// A belief that claims detection without a finite distance is treated
    /// as not detected by the control policy.
    pub fn ranged(&self) -> Option<f64> {
        if self.detected {
            self.range_cm()
        } else {
            None
        }
    }
}

/// One obstacle reading decoded from a sensor datagram
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObstacleReading {
    /// Compact `distance[:side]` token; replaces the whole reading group.
    /// `detected` is derived from the detection range by the fusion layer.
    Ranged {
        distance_cm: f64,
        side: Option<ObstacleSide>,
    },

    /// Structured or tagged message; only the fields present change
    Fields {
        detected: Option<bool>,
        distance_cm: Option<f64>,
        side: Option<ObstacleSide>,
    },
}

/// Decoded sensor datagram
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReport {
    /// Reported wheel speed (cm/s)
    pub speed_cm_s: Option<f64>,

    pub obstacle: Option<ObstacleReading>,
}

impl SensorReport {
    pub fn is_empty(&self) -> bool {
        self.speed_cm_s.is_none() && self.obstacle.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_str() {
        assert_eq!("L".parse::<ObstacleSide>(), Ok(ObstacleSide::Left));
        assert_eq!("right".parse::<ObstacleSide>(), Ok(ObstacleSide::Right));
        assert_eq!(" C ".parse::<ObstacleSide>(), Ok(ObstacleSide::Center));
        assert!("up".parse::<ObstacleSide>().is_err());
    }

    #[test]
    fn test_detected_without_distance_is_not_ranged() {
        let belief = ObstacleBelief {
            detected: true,
            distance_cm: None,
            side: Some(ObstacleSide::Left),
            source: BeliefSource::Vision,
            last_update: None,
        };
        assert_eq!(belief.ranged(), None);

        let nan = ObstacleBelief {
            distance_cm: Some(f64::NAN),
            ..belief
        };
        assert_eq!(nan.ranged(), None);
    }

    #[test]
    fn test_ranged_requires_detected() {
        let belief = ObstacleBelief {
            detected: false,
            distance_cm: Some(30.0),
            ..Default::default()
        };
        assert_eq!(belief.ranged(), None);
        assert_eq!(belief.range_cm(), Some(30.0));
    }
}
