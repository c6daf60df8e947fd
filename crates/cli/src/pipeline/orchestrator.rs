//! Pipeline orchestrator - the real-time control loop.
//!
//! One loop owns frame hand-off, lane extraction and the control policy.
//! Sensor ingestion and the operator hub run as their own tasks and meet the
//! loop only through `SharedState`.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_channel::Receiver;
use camera::AcquisitionWorker;
use chrono::{SecondsFormat, Utc};
use contracts::{
    ControlCommand, Frame, LaneResult, ObstacleBelief, ObstacleTelemetry, OperatorMessage,
    RoverBlueprint, TelemetrySnapshot,
};
use control::{effective_speed, ControlPolicy, Odometer};
use dispatcher::{ActuatorLink, OperatorHub};
use fusion::SharedState;
use ingestion::{IngestionMetrics, SensorListener};
use observability::{record_tick_metrics, TickSample};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout};
use tracing::{debug, info, instrument, warn};
use vision::{LaneAnalysis, LaneExtractor};

use super::PipelineStats;
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The rover configuration
    pub blueprint: RoverBlueprint,

    /// Maximum number of ticks (None = unlimited)
    pub max_ticks: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Set the run flag at startup
    pub autostart: bool,
}

impl PipelineConfig {
    pub fn new(blueprint: RoverBlueprint) -> Self {
        Self {
            blueprint,
            max_ticks: None,
            timeout: None,
            autostart: false,
        }
    }
}

/// What the loop decided during one tick
#[derive(Debug, Clone, Copy)]
struct TickOutcome {
    lane: LaneResult,
    command: ControlCommand,
    obstacle: ObstacleBelief,
    speed_cm_s: f64,
    running: bool,
}

/// All components of a running rover, wired and started
pub struct Pipeline {
    config: PipelineConfig,
    state: Arc<SharedState>,
    extractor: LaneExtractor,
    policy: ControlPolicy,
    odometer: Odometer,
    worker: AcquisitionWorker,
    frames: Receiver<Frame>,
    actuator: ActuatorLink,
    hub: OperatorHub,
    sensor_addr: SocketAddr,
    sensor_metrics: Arc<IngestionMetrics>,
    sensor_task: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    seen_epoch: u64,
}

impl Pipeline {
    /// Open the camera, bind every socket and start the background tasks.
    /// Any failure here is fatal.
    #[instrument(name = "pipeline_start", skip(config))]
    pub async fn start(config: PipelineConfig) -> Result<Self> {
        let blueprint = &config.blueprint;
        let period = blueprint.schedule.period();

        let extractor = LaneExtractor::new(
            blueprint.vision.clone(),
            blueprint.camera.width,
            blueprint.camera.height,
        )
        .map_err(|e| CliError::startup("lane extractor", e))?;

        let (worker, frames) =
            camera::start(&blueprint.camera, period).map_err(|e| CliError::startup("camera", e))?;
        info!(source = worker.source_name(), "Camera acquisition started");

        let state = Arc::new(SharedState::from_config(&blueprint.sensor));
        if config.autostart {
            state.set_running(true);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener = SensorListener::bind(&blueprint.sensor.bind, Arc::clone(&state))
            .await
            .map_err(|e| CliError::startup("sensor listener", e))?;
        let sensor_addr = listener
            .local_addr()
            .map_err(|e| CliError::startup("sensor listener", e))?;
        let sensor_metrics = listener.metrics();
        let sensor_task = listener.spawn(shutdown_rx);

        let hub = OperatorHub::bind(&blueprint.operator, Arc::clone(&state))
            .await
            .map_err(|e| CliError::startup("operator hub", e))?;

        let actuator = ActuatorLink::connect(&blueprint.actuator.peer)
            .await
            .map_err(|e| CliError::startup("actuator link", e))?;

        info!(
            sensor = %sensor_addr,
            operator = %hub.local_addr(),
            actuator = %actuator.peer(),
            fps = blueprint.schedule.target_fps,
            "Pipeline wired"
        );

        let seen_epoch = state.start_epoch();
        Ok(Self {
            policy: ControlPolicy::new(blueprint.control.clone()),
            odometer: Odometer::new(),
            config,
            state,
            extractor,
            worker,
            frames,
            actuator,
            hub,
            sensor_addr,
            sensor_metrics,
            sensor_task,
            shutdown_tx,
            seen_epoch,
        })
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn sensor_addr(&self) -> SocketAddr {
        self.sensor_addr
    }

    pub fn operator_addr(&self) -> SocketAddr {
        self.hub.local_addr()
    }

    /// Run ticks until `shutdown` resolves, the tick limit or the timeout is
    /// hit, then send a final stop command and release everything.
    #[instrument(name = "pipeline_run", skip_all)]
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let mut shutdown = pin!(shutdown);
        let period = self.config.blueprint.schedule.period();
        let image_every = self.config.blueprint.schedule.image_every_ticks;
        let started = Instant::now();
        let run_deadline = self.config.timeout.map(|t| started + t);

        let mut stats = PipelineStats::default();
        let mut failure = None;
        let mut tick: u64 = 0;

        info!(period_ms = period.as_secs_f64() * 1000.0, max_ticks = ?self.config.max_ticks, "Control loop running");

        loop {
            if self.config.max_ticks.is_some_and(|max| tick >= max) {
                info!(ticks = tick, "Reached max ticks limit");
                break;
            }
            if run_deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(ticks = tick, "Run timed out");
                break;
            }

            let tick_start = Instant::now();
            let next_tick = tokio::time::Instant::from_std(tick_start + period);

            let received = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                received = timeout(period, self.frames.recv()) => received,
            };
            let frame = match received {
                Ok(Ok(frame)) => Some(frame),
                Ok(Err(_)) => {
                    failure = Some(CliError::pipeline_execution("camera worker stopped"));
                    break;
                }
                Err(_) => {
                    debug!(tick, "no frame within one period");
                    None
                }
            };

            let processing = Instant::now();
            let analysis = frame.as_ref().and_then(|f| self.analyze(f, tick));
            if analysis.is_none() {
                // nothing seen this tick, so no vision cue either
                self.state.apply_vision(None, Instant::now());
            }
            let outcome = self.decide(analysis.as_ref(), Instant::now());
            self.actuator.send(&outcome.command).await;
            self.publish(tick, &outcome);

            if image_every > 0 && tick % image_every == 0 {
                if let (Some(frame), Some(analysis)) = (&frame, &analysis) {
                    self.publish_images(tick, frame, analysis);
                }
            }

            let latency = processing.elapsed();
            let sample = TickSample {
                tick,
                latency_ms: latency.as_secs_f64() * 1000.0,
                overrun: tick_start.elapsed() > period,
                frame_missing: frame.is_none(),
                lane: outcome.lane.status,
                state: self.policy.state(),
                command: outcome.command,
                running: outcome.running,
                distance_m: self.odometer.distance_m(),
            };
            record_tick_metrics(&sample);
            stats.loop_stats.update(&sample);
            if sample.overrun {
                debug!(tick, latency_ms = sample.latency_ms, "tick overran its period");
            }

            tick += 1;
            stats.ticks = tick;

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = sleep_until(next_tick) => {}
            }
        }

        stats.duration = started.elapsed();
        self.shutdown(&mut stats).await;

        match failure {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// Lane extraction plus the vision-side obstacle cue
    fn analyze(&self, frame: &Frame, tick: u64) -> Option<LaneAnalysis> {
        match self.extractor.process(&frame.image) {
            Ok(analysis) => {
                let cue = self
                    .extractor
                    .detect_obstacle(&analysis.bev_mask)
                    .map(|o| o.side);
                self.state.apply_vision(cue, Instant::now());
                Some(analysis)
            }
            Err(e) => {
                warn!(tick, seq = frame.seq, error = %e, "lane extraction failed");
                None
            }
        }
    }

    fn decide(&mut self, analysis: Option<&LaneAnalysis>, now: Instant) -> TickOutcome {
        let lane = analysis.map_or_else(LaneResult::lost, |a| a.result);

        let epoch = self.state.start_epoch();
        if epoch != self.seen_epoch {
            self.seen_epoch = epoch;
            self.policy.reset();
            debug!(epoch, "run flag raised, control policy reset");
        }

        let running = self.state.is_running();
        let obstacle = self.state.obstacle(now);
        let command = if running {
            self.policy.decide(&lane, &obstacle, now)
        } else {
            ControlCommand::STOP
        };

        if self.state.take_distance_reset() {
            self.odometer.reset(now);
            info!("distance counter reset");
        }
        let speed_cm_s = effective_speed(
            self.state.reported_speed(now),
            command.speed_cmd,
            &self.config.blueprint.odometry,
        );
        self.odometer.advance(speed_cm_s, now);

        TickOutcome {
            lane,
            command,
            obstacle,
            speed_cm_s,
            running,
        }
    }

    fn publish(&self, tick: u64, outcome: &TickOutcome) {
        let data = TelemetrySnapshot {
            steering_angle: outcome.command.steer_deg,
            lane_status: outcome.lane.status,
            robot_position: outcome.lane.lateral_position,
            speed: outcome.speed_cm_s,
            distance_traveled: self.odometer.distance_m(),
            obstacle: ObstacleTelemetry {
                detected: outcome.obstacle.detected,
                distance: outcome.obstacle.distance_cm,
                position: outcome.obstacle.side,
            },
            running: outcome.running,
            control_state: self.policy.state(),
            speed_cmd: outcome.command.speed_cmd,
            tick,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        if let Err(e) = self.hub.broadcast(tick, &OperatorMessage::Telemetry { data }) {
            warn!(tick, error = %e, "telemetry not published");
        }
    }

    fn publish_images(&self, tick: u64, frame: &Frame, analysis: &LaneAnalysis) {
        let quality = self.config.blueprint.schedule.jpeg_quality;
        self.hub.publish_images(
            tick,
            frame.image.clone(),
            analysis.overlay.clone(),
            quality,
        );
    }

    /// Final stop command first, then tear down in reverse start order
    async fn shutdown(self, stats: &mut PipelineStats) {
        info!("Shutting down pipeline...");
        if let Err(e) = self.actuator.send_stop().await {
            warn!(error = %e, "final stop command failed");
        }
        stats.commands_sent = self.actuator.sent_count();
        stats.commands_dropped = self.actuator.dropped_count();

        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.sensor_task.await {
            warn!(error = ?e, "sensor listener task panicked");
        }
        stats.sensor = self.sensor_metrics.snapshot();

        stats.operator = self.hub.totals();
        self.hub.shutdown().await;

        drop(self.frames);
        let mut worker = self.worker;
        if tokio::task::spawn_blocking(move || worker.stop()).await.is_err() {
            warn!("camera worker join failed");
        }

        info!(
            ticks = stats.ticks,
            duration_secs = stats.duration.as_secs_f64(),
            "Pipeline shutdown complete"
        );
    }
}
