//! 控制循环指标收集模块
//!
//! 每个周期产生一个 `TickSample`，既写入 `metrics` facade，也在内存中聚合成运行摘要。

use contracts::{ControlCommand, ControlState, LaneStatus};
use metrics::{counter, gauge, histogram};

/// 单个控制周期的观测结果
#[derive(Debug, Clone, Copy)]
pub struct TickSample {
    pub tick: u64,
    /// 周期内处理耗时 (毫秒)
    pub latency_ms: f64,
    /// 处理耗时超过周期
    pub overrun: bool,
    /// 本周期没有拿到相机帧
    pub frame_missing: bool,
    pub lane: LaneStatus,
    pub state: ControlState,
    pub command: ControlCommand,
    pub running: bool,
    /// 累计里程 (米)
    pub distance_m: f64,
}

fn lane_label(lane: LaneStatus) -> &'static str {
    match lane {
        LaneStatus::Detected => "detected",
        LaneStatus::Lost => "lost",
    }
}

fn state_label(state: ControlState) -> &'static str {
    match state {
        ControlState::Normal => "normal",
        ControlState::Avoiding => "avoiding",
        ControlState::Returning => "returning",
    }
}

/// 从 TickSample 记录指标
pub fn record_tick_metrics(sample: &TickSample) {
    counter!("lane_rover_ticks_total").increment(1);
    gauge!("lane_rover_last_tick").set(sample.tick as f64);
    histogram!("lane_rover_tick_latency_ms").record(sample.latency_ms);

    if sample.overrun {
        counter!("lane_rover_tick_overruns_total").increment(1);
    }
    if sample.frame_missing {
        counter!("lane_rover_frames_missing_total").increment(1);
    }

    counter!("lane_rover_lane_status_total", "status" => lane_label(sample.lane)).increment(1);
    gauge!("lane_rover_control_state").set(match sample.state {
        ControlState::Normal => 0.0,
        ControlState::Avoiding => 1.0,
        ControlState::Returning => 2.0,
    });

    gauge!("lane_rover_steer_deg").set(sample.command.steer_deg);
    gauge!("lane_rover_speed_cmd").set(sample.command.speed_cmd);
    gauge!("lane_rover_running").set(if sample.running { 1.0 } else { 0.0 });
    gauge!("lane_rover_distance_m").set(sample.distance_m);
}

/// 记录状态机转换
pub fn record_state_transition(from: ControlState, to: ControlState) {
    counter!(
        "lane_rover_state_transitions_total",
        "from" => state_label(from),
        "to" => state_label(to)
    )
    .increment(1);
}

/// 控制循环指标聚合器
#[derive(Debug, Clone, Default)]
pub struct LoopStatsAggregator {
    pub total_ticks: u64,
    pub overruns: u64,
    pub frames_missing: u64,
    pub lane_detected: u64,
    pub stop_commands: u64,
    pub ticks_avoiding: u64,
    pub ticks_returning: u64,
    pub transitions: u64,
    pub latency_stats: RunningStats,
    pub steer_stats: RunningStats,
    last_state: Option<ControlState>,
    last_distance_m: f64,
}

impl LoopStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, sample: &TickSample) {
        self.total_ticks += 1;
        if sample.overrun {
            self.overruns += 1;
        }
        if sample.frame_missing {
            self.frames_missing += 1;
        }
        if sample.lane == LaneStatus::Detected {
            self.lane_detected += 1;
        }
        if sample.command.is_stop() {
            self.stop_commands += 1;
        }
        match sample.state {
            ControlState::Normal => {}
            ControlState::Avoiding => self.ticks_avoiding += 1,
            ControlState::Returning => self.ticks_returning += 1,
        }
        if let Some(prev) = self.last_state {
            if prev != sample.state {
                self.transitions += 1;
                record_state_transition(prev, sample.state);
            }
        }
        self.last_state = Some(sample.state);
        self.last_distance_m = sample.distance_m;

        self.latency_stats.push(sample.latency_ms);
        self.steer_stats.push(sample.command.steer_deg);
    }

    pub fn summary(&self) -> LoopSummary {
        let pct = |n: u64| {
            if self.total_ticks > 0 {
                n as f64 / self.total_ticks as f64 * 100.0
            } else {
                0.0
            }
        };
        LoopSummary {
            total_ticks: self.total_ticks,
            overruns: self.overruns,
            overrun_rate: pct(self.overruns),
            frames_missing: self.frames_missing,
            detection_rate: pct(self.lane_detected),
            stop_commands: self.stop_commands,
            ticks_avoiding: self.ticks_avoiding,
            ticks_returning: self.ticks_returning,
            transitions: self.transitions,
            distance_m: self.last_distance_m,
            latency_ms: StatsSummary::from(&self.latency_stats),
            steer_deg: StatsSummary::from(&self.steer_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 运行摘要
#[derive(Debug, Clone, Default)]
pub struct LoopSummary {
    pub total_ticks: u64,
    pub overruns: u64,
    pub overrun_rate: f64,
    pub frames_missing: u64,
    pub detection_rate: f64,
    pub stop_commands: u64,
    pub ticks_avoiding: u64,
    pub ticks_returning: u64,
    pub transitions: u64,
    pub distance_m: f64,
    pub latency_ms: StatsSummary,
    pub steer_deg: StatsSummary,
}

impl std::fmt::Display for LoopSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Control Loop Summary ===")?;
        writeln!(f, "Total ticks: {}", self.total_ticks)?;
        writeln!(
            f,
            "Overruns: {} ({:.2}%)",
            self.overruns, self.overrun_rate
        )?;
        writeln!(f, "Ticks without frame: {}", self.frames_missing)?;
        writeln!(f, "Lane detected: {:.2}%", self.detection_rate)?;
        writeln!(f, "Stop commands: {}", self.stop_commands)?;
        writeln!(
            f,
            "Avoiding/Returning ticks: {}/{} ({} transitions)",
            self.ticks_avoiding, self.ticks_returning, self.transitions
        )?;
        writeln!(f, "Distance traveled: {:.3} m", self.distance_m)?;
        writeln!(f, "Tick latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Steer (deg): {}", self.steer_deg)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64, state: ControlState, command: ControlCommand) -> TickSample {
        TickSample {
            tick,
            latency_ms: 4.0 + tick as f64,
            overrun: tick == 2,
            frame_missing: false,
            lane: LaneStatus::Detected,
            state,
            command,
            running: true,
            distance_m: tick as f64 * 0.1,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_transitions() {
        let mut agg = LoopStatsAggregator::new();
        agg.update(&sample(0, ControlState::Normal, ControlCommand::new(5.0, 255.0)));
        agg.update(&sample(1, ControlState::Avoiding, ControlCommand::new(45.0, 150.0)));
        agg.update(&sample(2, ControlState::Avoiding, ControlCommand::STOP));
        agg.update(&sample(3, ControlState::Returning, ControlCommand::new(-20.0, 150.0)));

        let summary = agg.summary();
        assert_eq!(summary.total_ticks, 4);
        assert_eq!(summary.transitions, 2);
        assert_eq!(summary.ticks_avoiding, 2);
        assert_eq!(summary.ticks_returning, 1);
        assert_eq!(summary.stop_commands, 1);
        assert_eq!(summary.overruns, 1);
        assert!((summary.overrun_rate - 25.0).abs() < 1e-9);
        assert!((summary.distance_m - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let mut agg = LoopStatsAggregator::new();
        agg.update(&sample(0, ControlState::Normal, ControlCommand::STOP));
        let output = format!("{}", agg.summary());
        assert!(output.contains("Total ticks: 1"));
        assert!(output.contains("Lane detected: 100.00%"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = LoopStatsAggregator::new().summary();
        assert_eq!(summary.detection_rate, 0.0);
        assert_eq!(format!("{}", summary.latency_ms), "N/A");
    }
}
