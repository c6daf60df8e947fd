//! Control policy: safety overrides, avoidance state machine, PID lane
//! following.
//!
//! Rules are evaluated in priority order every tick:
//!
//! 1. lane lost → stop, state untouched
//! 2. ranged obstacle inside the danger distance → stop, state untouched
//! 3. ranged obstacle inside the entry distance → `Avoiding`, hard steer away
//! 4. `Avoiding`: cleared (no distance at all, or beyond the exit distance) →
//!    `Returning` with the counter-steer; otherwise the softer avoid command
//! 5. `Returning`: |angle| under the exit angle → `Normal`; otherwise keep
//!    counter-steering
//! 6. `Normal`: PID on the lane angle plus a speed tier

use std::time::Instant;

use contracts::{
    AvoidanceConfig, ControlCommand, ControlConfig, ControlState, LaneResult, ObstacleBelief,
    ObstacleSide,
};
use tracing::{debug, info};

use crate::pid::Pid;
use crate::speed::speed_for_steer;

/// Steering sign that moves the rover away from an obstacle on `side`.
///
/// Positive steer turns right, so an obstacle on the left is avoided with a
/// positive angle. A centered or unlabelled obstacle is passed on the right.
pub fn away_from(side: Option<ObstacleSide>) -> f64 {
    match side {
        Some(ObstacleSide::Right) => -1.0,
        Some(ObstacleSide::Left) | Some(ObstacleSide::Center) | None => 1.0,
    }
}

#[derive(Debug, Clone)]
pub struct ControlPolicy {
    config: ControlConfig,
    pid: Pid,
    state: ControlState,
    /// +1 / -1, fixed when avoidance starts
    avoid_dir: f64,
}

impl ControlPolicy {
    pub fn new(config: ControlConfig) -> Self {
        let pid = Pid::new(config.pid);
        Self {
            config,
            pid,
            state: ControlState::Normal,
            avoid_dir: 1.0,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Back to `Normal` with a fresh PID.
    pub fn reset(&mut self) {
        if self.state != ControlState::Normal {
            info!(from = ?self.state, "control policy reset");
        }
        self.state = ControlState::Normal;
        self.avoid_dir = 1.0;
        self.pid.reset();
    }

    fn transition(&mut self, to: ControlState) {
        if self.state != to {
            info!(from = ?self.state, to = ?to, "control state transition");
            self.state = to;
        }
    }

    fn avoidance(&self) -> &AvoidanceConfig {
        &self.config.avoidance
    }

    fn return_command(&self) -> ControlCommand {
        let a = self.avoidance();
        ControlCommand::new(-self.avoid_dir * a.return_steer_deg, a.return_speed)
    }

    pub fn decide(
        &mut self,
        lane: &LaneResult,
        obstacle: &ObstacleBelief,
        now: Instant,
    ) -> ControlCommand {
        if !lane.is_detected() {
            return ControlCommand::STOP;
        }

        let a = *self.avoidance();
        let range = obstacle.ranged();

        if let Some(d) = range {
            if d < a.danger_cm {
                debug!(distance_cm = d, "obstacle inside danger distance, stopping");
                return ControlCommand::STOP;
            }
            if d < a.enter_cm {
                if self.state != ControlState::Avoiding {
                    self.avoid_dir = away_from(obstacle.side);
                    self.pid.reset();
                    self.transition(ControlState::Avoiding);
                }
                return ControlCommand::new(self.avoid_dir * a.hard_steer_deg, a.hard_speed);
            }
        }

        match self.state {
            ControlState::Avoiding => {
                // the sensor keeps reporting a distance past the detection
                // range, so the exit band is judged on the raw range
                let cleared = obstacle.range_cm().map_or(true, |d| d > a.exit_cm);
                if cleared {
                    self.transition(ControlState::Returning);
                    return self.return_command();
                }
                ControlCommand::new(self.avoid_dir * a.soft_steer_deg, a.soft_speed)
            }
            ControlState::Returning if lane.angle_deg.abs() >= a.return_exit_deg => {
                self.return_command()
            }
            ControlState::Returning | ControlState::Normal => {
                self.transition(ControlState::Normal);
                self.follow_lane(lane.angle_deg, now)
            }
        }
    }

    fn follow_lane(&mut self, angle_deg: f64, now: Instant) -> ControlCommand {
        // error is the negated lane angle: steer against the detected tilt
        let steer = self.pid.update(-angle_deg, now);
        let speed = speed_for_steer(&self.config.speed, steer);
        ControlCommand::new(steer, speed)
    }
}
