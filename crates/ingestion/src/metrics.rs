//! Sensor link counters

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total datagrams received
    pub datagrams_received: AtomicU64,

    /// Datagrams applied to the shared state
    pub datagrams_applied: AtomicU64,

    /// Malformed or empty datagrams dropped
    pub malformed: AtomicU64,

    /// Socket receive errors
    pub recv_errors: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        counter!("lane_rover_sensor_datagrams_total").increment(1);
    }

    pub fn record_applied(&self) {
        self.datagrams_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
        counter!("lane_rover_sensor_datagrams_malformed_total").increment(1);
    }

    pub fn record_recv_error(&self) {
        self.recv_errors.fetch_add(1, Ordering::Relaxed);
        counter!("lane_rover_sensor_recv_errors_total").increment(1);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_applied: self.datagrams_applied.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub datagrams_applied: u64,
    pub malformed: u64,
    pub recv_errors: u64,
}
