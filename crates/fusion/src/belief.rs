//! Obstacle belief fusion: sensor channel first, vision cue as fallback.

use std::time::{Duration, Instant};

use contracts::{BeliefSource, ObstacleBelief, ObstacleReading, ObstacleSide};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SensorGroup {
    detected: bool,
    distance_cm: Option<f64>,
    side: Option<ObstacleSide>,
    at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct VisionCue {
    side: ObstacleSide,
    at: Instant,
}

/// Two-producer obstacle belief
///
/// The sensor group is written asynchronously by the datagram listener and
/// always replaced or patched as one unit. The vision cue is rewritten every
/// tick by the control loop.
#[derive(Debug, Clone)]
pub struct ObstacleFusion {
    sensor: Option<SensorGroup>,
    vision: Option<VisionCue>,
    detection_range_cm: f64,
    stale_after: Option<Duration>,
}

impl ObstacleFusion {
    /// `stale_after = None` keeps sensor readings forever
    pub fn new(detection_range_cm: f64, stale_after: Option<Duration>) -> Self {
        Self {
            sensor: None,
            vision: None,
            detection_range_cm,
            stale_after,
        }
    }

    fn live_sensor(&self, now: Instant) -> Option<&SensorGroup> {
        self.sensor.as_ref().filter(|g| match self.stale_after {
            Some(window) => now.saturating_duration_since(g.at) <= window,
            None => true,
        })
    }

    /// Apply one decoded sensor reading.
    pub fn apply_reading(&mut self, reading: ObstacleReading, now: Instant) {
        let group = match reading {
            ObstacleReading::Ranged { distance_cm, side } => {
                let usable = distance_cm.is_finite() && distance_cm >= 0.0;
                SensorGroup {
                    detected: usable && distance_cm < self.detection_range_cm,
                    distance_cm: usable.then_some(distance_cm),
                    side,
                    at: now,
                }
            }
            ObstacleReading::Fields {
                detected,
                distance_cm,
                side,
            } => {
                let mut group = self.live_sensor(now).copied().unwrap_or(SensorGroup {
                    detected: false,
                    distance_cm: None,
                    side: None,
                    at: now,
                });
                if let Some(d) = detected {
                    group.detected = d;
                }
                if let Some(d) = distance_cm {
                    group.distance_cm = (d.is_finite() && d >= 0.0).then_some(d);
                }
                if side.is_some() {
                    group.side = side;
                }
                group.at = now;
                group
            }
        };

        if self.sensor.map(|g| g.detected) != Some(group.detected) {
            debug!(
                detected = group.detected,
                distance_cm = ?group.distance_cm,
                side = ?group.side,
                "sensor obstacle state changed"
            );
        }
        self.sensor = Some(group);
    }

    /// Replace the vision cue; `None` clears it.
    pub fn apply_vision(&mut self, side: Option<ObstacleSide>, now: Instant) {
        self.vision = side.map(|side| VisionCue { side, at: now });
    }

    /// Belief for one tick.
    pub fn belief(&self, now: Instant) -> ObstacleBelief {
        let sensor = self.live_sensor(now);

        if let Some(g) = sensor.filter(|g| g.detected) {
            return ObstacleBelief {
                detected: true,
                distance_cm: g.distance_cm,
                side: g.side,
                source: BeliefSource::Sensor,
                last_update: Some(g.at),
            };
        }

        if let Some(v) = self.vision {
            return ObstacleBelief {
                detected: true,
                distance_cm: None,
                side: Some(v.side),
                source: BeliefSource::Vision,
                last_update: Some(v.at),
            };
        }

        match sensor {
            Some(g) => ObstacleBelief {
                detected: false,
                distance_cm: g.distance_cm,
                side: g.side,
                source: BeliefSource::Sensor,
                last_update: Some(g.at),
            },
            None => ObstacleBelief::clear(),
        }
    }

    pub fn clear(&mut self) {
        self.sensor = None;
        self.vision = None;
    }
}
