//! Steering PID filter.

use std::time::Instant;

use contracts::{clamp_steer, PidGains};

/// Substituted for non-positive time steps
pub const MIN_DT_SECS: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    integral: f64,
    prev_error: Option<f64>,
    last_at: Option<Instant>,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            prev_error: None,
            last_at: None,
        }
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.last_at = None;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// One step with `dt` measured from the wall clock since the previous call.
    pub fn update(&mut self, error: f64, now: Instant) -> f64 {
        let dt = self
            .last_at
            .map(|last| now.saturating_duration_since(last).as_secs_f64());
        self.last_at = Some(now);
        match dt {
            Some(dt) => self.next(error, dt),
            None => {
                self.prev_error = Some(error);
                clamp_steer(self.gains.kp * error)
            }
        }
    }

    /// One step with an explicit `dt` in seconds.
    pub fn next(&mut self, error: f64, dt: f64) -> f64 {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { MIN_DT_SECS };
        let limit = self.gains.integral_limit.abs();
        self.integral = (self.integral + error * dt).clamp(-limit, limit);

        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };
        self.prev_error = Some(error);

        clamp_steer(self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative)
    }
}
