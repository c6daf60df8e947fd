//! Pipeline statistics.

use std::time::Duration;

use observability::LoopStatsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Control ticks executed
    pub ticks: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Actuator datagrams sent, including the final stop
    pub commands_sent: u64,

    /// Actuator datagrams dropped on a full socket buffer
    pub commands_dropped: u64,

    /// Sensor datagram counters
    pub sensor: ingestion::MetricsSnapshot,

    /// Operator stream counters, summed over all observers
    pub operator: dispatcher::MetricsSnapshot,

    /// Per-tick aggregates
    pub loop_stats: LoopStatsAggregator,
}

impl PipelineStats {
    /// Achieved control frequency
    pub fn tick_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Lane Rover Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks);
        println!("   ├─ Tick rate: {:.2} Hz", self.tick_rate());
        println!(
            "   └─ Commands sent/dropped: {}/{}",
            self.commands_sent, self.commands_dropped
        );

        println!("\nSensor link");
        println!("   ├─ Datagrams received: {}", self.sensor.datagrams_received);
        println!("   ├─ Applied: {}", self.sensor.datagrams_applied);
        println!("   └─ Malformed: {}", self.sensor.malformed);

        println!("\nOperator stream");
        println!("   ├─ Messages written: {}", self.operator.write_count);
        println!("   ├─ Dropped (queue full): {}", self.operator.dropped_count);
        println!("   └─ Write failures: {}", self.operator.failure_count);

        println!("\n{}", self.loop_stats.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_rate() {
        let stats = PipelineStats {
            ticks: 60,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.tick_rate() - 30.0).abs() < 1e-9);
        assert_eq!(PipelineStats::default().tick_rate(), 0.0);
    }
}
