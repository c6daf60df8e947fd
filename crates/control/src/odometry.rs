//! Distance accumulator.

use std::time::Instant;

use contracts::OdometryConfig;

/// Integrates speed (cm/s) over wall-clock time into meters.
#[derive(Debug, Clone, Default)]
pub struct Odometer {
    distance_m: f64,
    last_at: Option<Instant>,
}

impl Odometer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Add `speed_cm_s · dt`. The first call only sets the time base, and a
    /// zero `dt` leaves the total unchanged.
    pub fn advance(&mut self, speed_cm_s: f64, now: Instant) -> f64 {
        if let Some(last) = self.last_at {
            let dt = now.saturating_duration_since(last).as_secs_f64();
            if speed_cm_s.is_finite() && speed_cm_s > 0.0 {
                self.distance_m += speed_cm_s / 100.0 * dt;
            }
        }
        self.last_at = Some(now);
        self.distance_m
    }

    /// Zero the total and restart the time base at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.distance_m = 0.0;
        self.last_at = Some(now);
    }
}

/// Speed fed to the odometer: the sensor-reported wheel speed when one is
/// live, otherwise an estimate from the motor command.
pub fn effective_speed(reported: Option<f64>, speed_cmd: f64, config: &OdometryConfig) -> f64 {
    match reported {
        Some(v) if v.is_finite() && v > config.min_reported_speed => v,
        _ => speed_cmd.max(0.0) * config.cm_s_per_speed_cmd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_integrates_cm_per_second_to_meters() {
        let mut odo = Odometer::new();
        let t0 = Instant::now();
        odo.advance(50.0, t0);
        let d = odo.advance(50.0, t0 + Duration::from_secs(2));
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dt_is_idempotent() {
        let mut odo = Odometer::new();
        let t0 = Instant::now();
        odo.advance(100.0, t0);
        let a = odo.advance(100.0, t0 + Duration::from_millis(500));
        let b = odo.advance(100.0, t0 + Duration::from_millis(500));
        assert_eq!(a, b);
    }

    #[test]
    fn test_reset_zeroes_exactly() {
        let mut odo = Odometer::new();
        let t0 = Instant::now();
        odo.advance(80.0, t0);
        odo.advance(80.0, t0 + Duration::from_secs(3));
        let t1 = t0 + Duration::from_secs(3);
        odo.reset(t1);
        assert_eq!(odo.distance_m(), 0.0);
        assert_eq!(odo.advance(80.0, t1), 0.0);
    }

    #[test]
    fn test_effective_speed_prefers_reported() {
        let cfg = OdometryConfig::default();
        assert_eq!(effective_speed(Some(30.0), 255.0, &cfg), 30.0);
        assert_eq!(effective_speed(None, 100.0, &cfg), 100.0 * cfg.cm_s_per_speed_cmd);
        assert_eq!(effective_speed(Some(0.0), 100.0, &cfg), 100.0 * cfg.cm_s_per_speed_cmd);
    }
}
