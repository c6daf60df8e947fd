//! ControlCommand / ControlState - Control Policy output

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Steering and lane-angle bound (degrees)
pub const STEER_LIMIT_DEG: f64 = 45.0;

/// Full-scale actuator speed command
pub const MAX_SPEED_CMD: f64 = 255.0;

/// Discrete policy state, persists across ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlState {
    #[default]
    Normal,
    Avoiding,
    Returning,
}

/// Actuator command for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlCommand {
    /// Steering angle in [-45, 45], positive turns right
    pub steer_deg: f64,

    /// Motor command in [0, MAX_SPEED_CMD]
    pub speed_cmd: f64,
}

impl ControlCommand {
    /// All-stop
    pub const STOP: Self = Self {
        steer_deg: 0.0,
        speed_cmd: 0.0,
    };

    /// Build a command, clamping both fields into their legal range.
    /// Non-finite inputs collapse to zero.
    pub fn new(steer_deg: f64, speed_cmd: f64) -> Self {
        Self {
            steer_deg: clamp_finite(steer_deg, -STEER_LIMIT_DEG, STEER_LIMIT_DEG),
            speed_cmd: clamp_finite(speed_cmd, 0.0, MAX_SPEED_CMD),
        }
    }

    pub fn is_stop(&self) -> bool {
        self.steer_deg == 0.0 && self.speed_cmd == 0.0
    }

    /// ASCII actuator datagram: `"{steer:.2},{speed:.2}\n"`
    pub fn encode(&self) -> Bytes {
        Bytes::from(format!("{:.2},{:.2}\n", self.steer_deg, self.speed_cmd))
    }
}

/// Clamp to ±[`STEER_LIMIT_DEG`]
pub fn clamp_steer(value: f64) -> f64 {
    clamp_finite(value, -STEER_LIMIT_DEG, STEER_LIMIT_DEG)
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}
