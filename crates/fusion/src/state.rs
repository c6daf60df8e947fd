//! State shared between the control loop, the sensor listener and the
//! operator server.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use contracts::{ObstacleBelief, ObstacleReading, ObstacleSide, SensorLinkConfig, SensorReport};
use tracing::info;

use crate::ObstacleFusion;

/// Shared, field-group-granular rover state
///
/// Created once and handed to every task as `Arc<SharedState>`. The obstacle
/// belief and the reported speed sit behind their own locks; the run flag and
/// control requests are lock-free. Sensor-fed values expire after the same
/// staleness window.
#[derive(Debug)]
pub struct SharedState {
    obstacle: Mutex<ObstacleFusion>,
    running: AtomicBool,
    /// Bumped on every false → true transition of `running`
    start_epoch: AtomicU64,
    /// Last wheel speed and when it arrived
    speed: Mutex<Option<(f64, Instant)>>,
    stale_after: Option<Duration>,
    reset_requested: AtomicBool,
}

impl SharedState {
    pub fn new(detection_range_cm: f64, stale_after: Option<Duration>) -> Self {
        Self {
            obstacle: Mutex::new(ObstacleFusion::new(detection_range_cm, stale_after)),
            running: AtomicBool::new(false),
            start_epoch: AtomicU64::new(0),
            speed: Mutex::new(None),
            stale_after,
            reset_requested: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &SensorLinkConfig) -> Self {
        let stale = (config.stale_after_ms > 0).then(|| Duration::from_millis(config.stale_after_ms));
        Self::new(config.detection_range_cm, stale)
    }

    fn fusion(&self) -> MutexGuard<'_, ObstacleFusion> {
        // updates replace whole groups, a poisoned lock still holds a valid belief
        self.obstacle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a decoded sensor datagram.
    pub fn apply_report(&self, report: &SensorReport, now: Instant) {
        if let Some(speed) = report.speed_cm_s {
            self.set_reported_speed(speed, now);
        }
        if let Some(reading) = report.obstacle {
            self.apply_reading(reading, now);
        }
    }

    pub fn apply_reading(&self, reading: ObstacleReading, now: Instant) {
        self.fusion().apply_reading(reading, now);
    }

    pub fn apply_vision(&self, side: Option<ObstacleSide>, now: Instant) {
        self.fusion().apply_vision(side, now);
    }

    pub fn obstacle(&self, now: Instant) -> ObstacleBelief {
        self.fusion().belief(now)
    }

    fn speed_slot(&self) -> MutexGuard<'_, Option<(f64, Instant)>> {
        self.speed.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_reported_speed(&self, speed_cm_s: f64, now: Instant) {
        if speed_cm_s.is_finite() {
            *self.speed_slot() = Some((speed_cm_s, now));
        }
    }

    /// Last wheel speed reported by the sensor link, `None` once it is older
    /// than the staleness window
    pub fn reported_speed(&self, now: Instant) -> Option<f64> {
        let (speed, at) = (*self.speed_slot())?;
        match self.stale_after {
            Some(window) if now.saturating_duration_since(at) > window => None,
            _ => Some(speed),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Set the run flag. Returns the previous value.
    pub fn set_running(&self, running: bool) -> bool {
        let was = self.running.swap(running, Ordering::AcqRel);
        if running && !was {
            self.start_epoch.fetch_add(1, Ordering::AcqRel);
        }
        if was != running {
            info!(running, "run flag changed");
        }
        was
    }

    /// Number of starts so far; a change between two ticks means the rover
    /// was (re)started in between.
    pub fn start_epoch(&self) -> u64 {
        self.start_epoch.load(Ordering::Acquire)
    }

    pub fn request_distance_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
    }

    /// Consume a pending odometer reset request.
    pub fn take_distance_reset(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn state() -> SharedState {
        SharedState::new(50.0, None)
    }

    #[test]
    fn test_speed_starts_unknown() {
        let s = state();
        let now = Instant::now();
        assert_eq!(s.reported_speed(now), None);
        s.set_reported_speed(42.5, now);
        assert_eq!(s.reported_speed(now), Some(42.5));
        s.set_reported_speed(f64::NAN, now);
        assert_eq!(s.reported_speed(now), Some(42.5));
    }

    #[test]
    fn test_speed_expires_with_sensor_silence() {
        let s = SharedState::new(50.0, Some(Duration::from_millis(1000)));
        let t0 = Instant::now();
        s.set_reported_speed(30.0, t0);
        assert_eq!(s.reported_speed(t0 + Duration::from_millis(1000)), Some(30.0));
        assert_eq!(s.reported_speed(t0 + Duration::from_millis(1001)), None);

        // a fresh report revives it
        let t1 = t0 + Duration::from_secs(5);
        s.set_reported_speed(10.0, t1);
        assert_eq!(s.reported_speed(t1), Some(10.0));
    }

    #[test]
    fn test_start_epoch_counts_rising_edges() {
        let s = state();
        assert_eq!(s.start_epoch(), 0);
        s.set_running(true);
        s.set_running(true);
        assert_eq!(s.start_epoch(), 1);
        s.set_running(false);
        s.set_running(true);
        assert_eq!(s.start_epoch(), 2);
        assert!(s.is_running());
    }

    #[test]
    fn test_distance_reset_consumed_once() {
        let s = state();
        assert!(!s.take_distance_reset());
        s.request_distance_reset();
        assert!(s.take_distance_reset());
        assert!(!s.take_distance_reset());
    }

    #[test]
    fn test_report_updates_speed_and_obstacle() {
        let s = state();
        let now = Instant::now();
        s.apply_report(
            &SensorReport {
                speed_cm_s: Some(12.0),
                obstacle: Some(ObstacleReading::Ranged {
                    distance_cm: 18.0,
                    side: Some(ObstacleSide::Center),
                }),
            },
            now,
        );
        assert_eq!(s.reported_speed(now), Some(12.0));
        assert_eq!(s.obstacle(now).ranged(), Some(18.0));
    }

    #[test]
    fn test_concurrent_writers() {
        let s = Arc::new(state());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for d in 0..100 {
                        s.apply_reading(
                            ObstacleReading::Ranged {
                                distance_cm: (i * 100 + d) as f64,
                                side: None,
                            },
                            Instant::now(),
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(s.obstacle(Instant::now()).distance_cm.is_some());
    }
}
