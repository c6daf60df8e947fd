//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置契约测试
//! - 合成相机 e2e 测试（回环 UDP/TCP，无需真实硬件）

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::RoverBlueprint;

    #[test]
    fn test_default_blueprint_survives_toml_round_trip() {
        let toml = ConfigLoader::to_toml(&RoverBlueprint::default()).unwrap();
        let back = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(back.schedule.target_fps, 30.0);
        assert_eq!(back.control.avoidance.enter_cm, 40.0);
    }

    #[test]
    fn test_command_datagram_matches_actuator_format() {
        let cmd = contracts::ControlCommand::new(-22.5, 150.0);
        assert_eq!(&cmd.encode()[..], b"-22.50,150.00\n");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::time::Duration;

    use contracts::{
        CameraSourceType, ControlState, LaneStatus, LateralPosition, OperatorMessage,
        RoverBlueprint, TelemetrySnapshot,
    };
    use image::{Rgb, RgbImage};
    use lane_rover::{Pipeline, PipelineConfig, PipelineStats};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::{TcpStream, UdpSocket};
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio::time::{timeout, Instant};

    // small frames at a slow tick keep debug builds well inside the period
    const W: u32 = 160;
    const H: u32 = 120;
    const FPS: f64 = 10.0;
    const WAIT: Duration = Duration::from_secs(10);

    /// A running pipeline plus the peers it talks to
    struct Harness {
        actuator: UdpSocket,
        sensor: UdpSocket,
        sensor_addr: std::net::SocketAddr,
        lines: Lines<BufReader<OwnedReadHalf>>,
        writer: OwnedWriteHalf,
        stop: oneshot::Sender<()>,
        task: JoinHandle<lane_rover::error::Result<PipelineStats>>,
    }

    async fn blueprint_with(actuator: &UdpSocket) -> RoverBlueprint {
        let mut bp = RoverBlueprint::default();
        bp.camera.width = W;
        bp.camera.height = H;
        bp.schedule.target_fps = FPS;
        bp.schedule.image_every_ticks = 5;
        bp.sensor.bind = "127.0.0.1:0".to_string();
        bp.operator.bind = "127.0.0.1:0".to_string();
        bp.operator.log_sink = false;
        bp.actuator.peer = actuator.local_addr().unwrap().to_string();
        bp
    }

    async fn start(
        customize: impl FnOnce(&mut RoverBlueprint),
        autostart: bool,
    ) -> Harness {
        let actuator = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut bp = blueprint_with(&actuator).await;
        customize(&mut bp);

        let mut config = PipelineConfig::new(bp);
        config.autostart = autostart;
        let pipeline = Pipeline::start(config).await.unwrap();
        let sensor_addr = pipeline.sensor_addr();

        let stream = TcpStream::connect(pipeline.operator_addr()).await.unwrap();
        let (read, writer) = stream.into_split();

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(pipeline.run(async move {
            let _ = stop_rx.await;
        }));

        Harness {
            actuator,
            sensor: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
            sensor_addr,
            lines: BufReader::new(read).lines(),
            writer,
            stop,
            task,
        }
    }

    impl Harness {
        /// Next telemetry snapshot, skipping image messages
        async fn telemetry(&mut self) -> TelemetrySnapshot {
            loop {
                let line = timeout(WAIT, self.lines.next_line())
                    .await
                    .expect("no operator message in time")
                    .unwrap()
                    .expect("operator stream closed");
                if let OperatorMessage::Telemetry { data } = serde_json::from_str(&line).unwrap() {
                    return data;
                }
            }
        }

        /// Read telemetry until `pred` holds
        async fn telemetry_until(
            &mut self,
            mut pred: impl FnMut(&TelemetrySnapshot) -> bool,
        ) -> TelemetrySnapshot {
            let deadline = Instant::now() + WAIT;
            loop {
                assert!(Instant::now() < deadline, "telemetry condition never held");
                let t = self.telemetry().await;
                if pred(&t) {
                    return t;
                }
            }
        }

        async fn command(&mut self, name: &str) {
            let line = format!("{{\"type\":\"control\",\"command\":\"{name}\"}}\n");
            self.writer.write_all(line.as_bytes()).await.unwrap();
        }

        async fn sensor_send(&self, payload: &str) {
            self.sensor
                .send_to(payload.as_bytes(), self.sensor_addr)
                .await
                .unwrap();
        }

        /// Next actuator datagram as (steer, speed)
        async fn actuator_recv(&self) -> (f64, f64) {
            let mut buf = [0u8; 64];
            let n = timeout(WAIT, self.actuator.recv(&mut buf))
                .await
                .expect("no actuator command in time")
                .unwrap();
            let text = std::str::from_utf8(&buf[..n]).unwrap().trim();
            let (steer, speed) = text.split_once(',').unwrap();
            (steer.parse().unwrap(), speed.parse().unwrap())
        }

        async fn finish(self) -> (PipelineStats, UdpSocket) {
            let _ = self.stop.send(());
            let stats = timeout(WAIT, self.task)
                .await
                .expect("pipeline did not shut down")
                .unwrap()
                .unwrap();
            (stats, self.actuator)
        }
    }

    fn blank_snapshot(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("blank.png");
        RgbImage::from_pixel(W, H, Rgb([30, 30, 30]))
            .save(&path)
            .unwrap();
        path
    }

    /// Without a start command the rover only ever sends stop
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_idle_rover_holds_stop() {
        let mut h = start(|_| {}, false).await;

        for _ in 0..5 {
            assert_eq!(h.actuator_recv().await, (0.0, 0.0));
        }
        let t = h.telemetry().await;
        assert!(!t.running);
        assert_eq!(t.control_state, ControlState::Normal);
        assert_eq!(t.speed_cmd, 0.0);

        let (stats, actuator) = h.finish().await;
        assert!(stats.ticks >= 5);
        assert!(stats.commands_sent >= 5);

        // the final stop datagram is the last thing on the wire
        let mut buf = [0u8; 64];
        let mut last = Vec::new();
        while let Ok(Ok(n)) = timeout(Duration::from_millis(200), actuator.recv(&mut buf)).await {
            last = buf[..n].to_vec();
        }
        assert_eq!(last, b"0.00,0.00\n");
    }

    /// Operator start drives along the synthetic lane; stop halts again
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_operator_start_follows_synthetic_lane() {
        let mut h = start(|_| {}, false).await;
        h.telemetry().await;

        h.command("start").await;
        let t = h
            .telemetry_until(|t| t.running && t.lane_status == LaneStatus::Detected)
            .await;
        assert!(t.speed_cmd > 0.0);
        assert!(t.steering_angle.abs() <= 45.0);

        let mut saw_motion = false;
        for _ in 0..20 {
            let (_, speed) = h.actuator_recv().await;
            if speed > 0.0 {
                saw_motion = true;
                break;
            }
        }
        assert!(saw_motion, "actuator never received a moving command");

        h.command("stop").await;
        let t = h.telemetry_until(|t| !t.running).await;
        assert_eq!(t.speed_cmd, 0.0);
        assert_eq!(t.steering_angle, 0.0);

        let (stats, _) = h.finish().await;
        assert!(stats.operator.write_count > 0);
    }

    /// Camera and overlay images reach the operator alongside telemetry
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_operator_receives_both_images() {
        let mut h = start(|bp| bp.schedule.image_every_ticks = 2, true).await;

        let mut raw = false;
        let mut processed = false;
        let deadline = Instant::now() + WAIT;
        while !(raw && processed) {
            assert!(Instant::now() < deadline, "images never arrived");
            let line = timeout(WAIT, h.lines.next_line())
                .await
                .expect("no operator message in time")
                .unwrap()
                .expect("operator stream closed");
            match serde_json::from_str(&line).unwrap() {
                OperatorMessage::ImageRaw { width, height, .. } => {
                    assert_eq!((width, height), (W, H));
                    raw = true;
                }
                OperatorMessage::ImageProcessed { width, height, .. } => {
                    assert_eq!((width, height), (W, H));
                    processed = true;
                }
                OperatorMessage::Telemetry { .. } => {}
            }
        }

        h.finish().await;
    }

    /// A range report inside the danger distance stops the rover
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_obstacle_forces_stop() {
        let mut h = start(|_| {}, true).await;

        let deadline = Instant::now() + WAIT;
        let t = loop {
            assert!(Instant::now() < deadline, "obstacle never reached telemetry");
            h.sensor_send("15:L").await;
            let t = h.telemetry().await;
            if t.obstacle.detected && t.obstacle.distance == Some(15.0) {
                break t;
            }
        };
        assert!(t.running);
        assert_eq!(t.speed_cmd, 0.0);
        assert_eq!(t.steering_angle, 0.0);
        assert_ne!(t.control_state, ControlState::Avoiding);

        let (stats, _) = h.finish().await;
        assert!(stats.sensor.datagrams_applied >= 1);
    }

    /// A frame without any marking reports Lost and stops
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blank_frame_is_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = blank_snapshot(dir.path());
        let mut h = start(
            |bp| {
                bp.camera.source = CameraSourceType::Snapshot;
                bp.camera.path = Some(path);
            },
            true,
        )
        .await;

        let t = h.telemetry().await;
        assert!(t.running);
        assert_eq!(t.lane_status, LaneStatus::Lost);
        assert_eq!(t.robot_position, LateralPosition::Unknown);
        assert_eq!(t.speed_cmd, 0.0);

        h.finish().await;
    }

    /// Reported wheel speed drives the odometer; reset_distance zeroes it
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reset_distance() {
        let dir = tempfile::tempdir().unwrap();
        let path = blank_snapshot(dir.path());
        let mut h = start(
            |bp| {
                bp.camera.source = CameraSourceType::Snapshot;
                bp.camera.path = Some(path);
            },
            false,
        )
        .await;

        let deadline = Instant::now() + WAIT;
        let before = loop {
            assert!(Instant::now() < deadline, "distance never advanced");
            h.sensor_send("S:100").await;
            let t = h.telemetry().await;
            if t.distance_traveled > 0.2 {
                break t.distance_traveled;
            }
        };

        h.command("reset_distance").await;
        let t = h.telemetry_until(|t| t.distance_traveled < before).await;
        assert!(t.distance_traveled < 0.2);

        h.finish().await;
    }
}
