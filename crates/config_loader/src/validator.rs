//! 配置校验模块
//!
//! 校验规则：
//! - 帧尺寸 > 0，录像/快照源必须提供路径
//! - target_fps > 0
//! - HLS 下限 <= 上限，Canny 低阈值 <= 高阈值
//! - 速度分档单调不增 (转角越大速度越低)
//! - 避障阈值 danger < enter < exit (滞回)
//! - 所有网络地址可解析
//! - 传感器检测范围 >= 避障进入距离

use std::net::SocketAddr;

use contracts::{
    AvoidanceConfig, CameraSourceType, ContractError, RoverBlueprint, SpeedTiers, MAX_SPEED_CMD,
    STEER_LIMIT_DEG,
};

/// 校验 RoverBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RoverBlueprint) -> Result<(), ContractError> {
    validate_camera(blueprint)?;
    validate_schedule(blueprint)?;
    validate_vision(blueprint)?;
    validate_speed_tiers(&blueprint.control.speed)?;
    validate_avoidance(&blueprint.control.avoidance)?;
    validate_pid(blueprint)?;
    validate_links(blueprint)?;
    validate_odometry(blueprint)?;
    Ok(())
}

/// 校验相机配置
fn validate_camera(blueprint: &RoverBlueprint) -> Result<(), ContractError> {
    let camera = &blueprint.camera;
    if camera.width == 0 || camera.height == 0 {
        return Err(ContractError::config_validation(
            "camera.width / camera.height",
            format!(
                "frame size must be > 0, got {}x{}",
                camera.width, camera.height
            ),
        ));
    }

    match camera.source {
        CameraSourceType::Recording | CameraSourceType::Snapshot if camera.path.is_none() => {
            Err(ContractError::config_validation(
                "camera.path",
                format!("camera.path is required for {:?} source", camera.source),
            ))
        }
        CameraSourceType::Synthetic if camera.synthetic.frame_count == 0 => {
            Err(ContractError::config_validation(
                "camera.synthetic.frame_count",
                "frame_count must be > 0",
            ))
        }
        _ => Ok(()),
    }
}

/// 校验控制周期
fn validate_schedule(blueprint: &RoverBlueprint) -> Result<(), ContractError> {
    let schedule = &blueprint.schedule;
    if !schedule.target_fps.is_finite() || schedule.target_fps <= 0.0 {
        return Err(ContractError::config_validation(
            "loop.target_fps",
            format!("target_fps must be > 0, got {}", schedule.target_fps),
        ));
    }
    if schedule.image_every_ticks == 0 {
        return Err(ContractError::config_validation(
            "loop.image_every_ticks",
            "image_every_ticks must be >= 1",
        ));
    }
    if !(1..=100).contains(&schedule.jpeg_quality) {
        return Err(ContractError::config_validation(
            "loop.jpeg_quality",
            format!("jpeg_quality must be in 1..=100, got {}", schedule.jpeg_quality),
        ));
    }
    Ok(())
}

/// 校验视觉参数
fn validate_vision(blueprint: &RoverBlueprint) -> Result<(), ContractError> {
    let vision = &blueprint.vision;

    for (idx, (lo, hi)) in vision
        .hls_lower
        .iter()
        .zip(vision.hls_upper.iter())
        .enumerate()
    {
        if lo > hi {
            return Err(ContractError::config_validation(
                format!("vision.hls_lower[{idx}]"),
                format!("lower bound ({lo}) must be <= upper bound ({hi})"),
            ));
        }
    }

    if vision.canny_low <= 0.0 || vision.canny_low > vision.canny_high {
        return Err(ContractError::config_validation(
            "vision.canny_low / vision.canny_high",
            format!(
                "require 0 < canny_low ({}) <= canny_high ({})",
                vision.canny_low, vision.canny_high
            ),
        ));
    }

    if vision.hough_threshold == 0 || vision.min_line_length == 0 {
        return Err(ContractError::config_validation(
            "vision.hough_threshold / vision.min_line_length",
            "hough_threshold and min_line_length must be > 0",
        ));
    }

    check_fraction("vision.position_band", vision.position_band)?;
    check_fraction("vision.obstacle_roi", vision.obstacle_roi)?;

    if !(0.0..0.5).contains(&vision.position_tolerance) {
        return Err(ContractError::config_validation(
            "vision.position_tolerance",
            format!(
                "position_tolerance must be in [0, 0.5), got {}",
                vision.position_tolerance
            ),
        ));
    }

    Ok(())
}

fn check_fraction(field: &str, value: f64) -> Result<(), ContractError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("must be in (0, 1], got {value}"),
        ))
    }
}

/// 校验速度分档 (单调不增)
fn validate_speed_tiers(tiers: &SpeedTiers) -> Result<(), ContractError> {
    if tiers.moderate_deg < 0.0 || tiers.sharp_deg < tiers.moderate_deg {
        return Err(ContractError::config_validation(
            "control.speed.sharp_deg / control.speed.moderate_deg",
            format!(
                "require 0 <= moderate_deg ({}) <= sharp_deg ({})",
                tiers.moderate_deg, tiers.sharp_deg
            ),
        ));
    }

    let speeds = [tiers.sharp_speed, tiers.moderate_speed, tiers.straight_speed];
    if speeds.iter().any(|s| !(0.0..=MAX_SPEED_CMD).contains(s)) {
        return Err(ContractError::config_validation(
            "control.speed",
            format!("speeds must be in [0, {MAX_SPEED_CMD}], got {speeds:?}"),
        ));
    }

    if tiers.sharp_speed > tiers.moderate_speed || tiers.moderate_speed > tiers.straight_speed {
        return Err(ContractError::config_validation(
            "control.speed",
            format!(
                "speed tiers must be monotonic: sharp ({}) <= moderate ({}) <= straight ({})",
                tiers.sharp_speed, tiers.moderate_speed, tiers.straight_speed
            ),
        ));
    }

    Ok(())
}

/// 校验避障阈值与指令
fn validate_avoidance(avoidance: &AvoidanceConfig) -> Result<(), ContractError> {
    if !(avoidance.danger_cm >= 0.0
        && avoidance.danger_cm <= avoidance.enter_cm
        && avoidance.enter_cm < avoidance.exit_cm)
    {
        return Err(ContractError::config_validation(
            "control.avoidance.exit_cm",
            format!(
                "require danger_cm ({}) <= enter_cm ({}) < exit_cm ({})",
                avoidance.danger_cm, avoidance.enter_cm, avoidance.exit_cm
            ),
        ));
    }

    let steers = [
        ("hard_steer_deg", avoidance.hard_steer_deg),
        ("soft_steer_deg", avoidance.soft_steer_deg),
        ("return_steer_deg", avoidance.return_steer_deg),
    ];
    for (name, value) in steers {
        if !(value > 0.0 && value <= STEER_LIMIT_DEG) {
            return Err(ContractError::config_validation(
                format!("control.avoidance.{name}"),
                format!("must be in (0, {STEER_LIMIT_DEG}], got {value}"),
            ));
        }
    }

    let speeds = [
        ("hard_speed", avoidance.hard_speed),
        ("soft_speed", avoidance.soft_speed),
        ("return_speed", avoidance.return_speed),
    ];
    for (name, value) in speeds {
        if !(0.0..=MAX_SPEED_CMD).contains(&value) {
            return Err(ContractError::config_validation(
                format!("control.avoidance.{name}"),
                format!("must be in [0, {MAX_SPEED_CMD}], got {value}"),
            ));
        }
    }

    if avoidance.return_exit_deg <= 0.0 {
        return Err(ContractError::config_validation(
            "control.avoidance.return_exit_deg",
            "return_exit_deg must be > 0",
        ));
    }

    Ok(())
}

/// 校验 PID 参数
fn validate_pid(blueprint: &RoverBlueprint) -> Result<(), ContractError> {
    let pid = &blueprint.control.pid;
    let all_finite = [pid.kp, pid.ki, pid.kd, pid.integral_limit]
        .iter()
        .all(|v| v.is_finite());
    if !all_finite || pid.integral_limit < 0.0 {
        return Err(ContractError::config_validation(
            "control.pid",
            "gains must be finite and integral_limit >= 0",
        ));
    }
    Ok(())
}

/// 校验网络地址
fn validate_links(blueprint: &RoverBlueprint) -> Result<(), ContractError> {
    parse_addr("sensor.bind", &blueprint.sensor.bind)?;
    parse_addr("actuator.peer", &blueprint.actuator.peer)?;
    parse_addr("operator.bind", &blueprint.operator.bind)?;

    if blueprint.sensor.detection_range_cm <= 0.0 {
        return Err(ContractError::config_validation(
            "sensor.detection_range_cm",
            "detection_range_cm must be > 0",
        ));
    }
    // 比进入距离短的检测范围会让避障永远不触发
    let enter_cm = blueprint.control.avoidance.enter_cm;
    if blueprint.sensor.detection_range_cm < enter_cm {
        return Err(ContractError::config_validation(
            "sensor.detection_range_cm",
            format!(
                "detection_range_cm ({}) must be >= control.avoidance.enter_cm ({enter_cm})",
                blueprint.sensor.detection_range_cm
            ),
        ));
    }
    if blueprint.operator.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "operator.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}

fn parse_addr(field: &str, value: &str) -> Result<SocketAddr, ContractError> {
    value.parse().map_err(|e| {
        ContractError::config_validation(field, format!("invalid socket address '{value}': {e}"))
    })
}

/// 校验里程计
fn validate_odometry(blueprint: &RoverBlueprint) -> Result<(), ContractError> {
    let odometry = &blueprint.odometry;
    if odometry.cm_s_per_speed_cmd < 0.0 || odometry.min_reported_speed < 0.0 {
        return Err(ContractError::config_validation(
            "odometry",
            "cm_s_per_speed_cmd and min_reported_speed must be >= 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn minimal_blueprint() -> RoverBlueprint {
        RoverBlueprint::default()
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_recording_requires_path() {
        let mut bp = minimal_blueprint();
        bp.camera.source = CameraSourceType::Recording;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("camera.path"), "got: {err}");

        bp.camera.path = Some(PathBuf::from("recordings/run1"));
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_invalid_fps() {
        let mut bp = minimal_blueprint();
        bp.schedule.target_fps = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("target_fps must be > 0"), "got: {err}");
    }

    #[test]
    fn test_inverted_hls_bounds() {
        let mut bp = minimal_blueprint();
        bp.vision.hls_lower = [0, 200, 0];
        bp.vision.hls_upper = [180, 100, 255];
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("hls_lower[1]"), "got: {err}");
    }

    #[test]
    fn test_inverted_canny_thresholds() {
        let mut bp = minimal_blueprint();
        bp.vision.canny_low = 200.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("canny_low"), "got: {err}");
    }

    #[test]
    fn test_speed_tiers_must_be_monotonic() {
        let mut bp = minimal_blueprint();
        bp.control.speed.sharp_speed = 255.0;
        bp.control.speed.moderate_speed = 200.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("monotonic"), "got: {err}");
    }

    #[test]
    fn test_detection_range_must_cover_enter_distance() {
        let mut bp = minimal_blueprint();
        bp.sensor.detection_range_cm = bp.control.avoidance.enter_cm - 1.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("sensor.detection_range_cm"), "got: {err}");

        bp.sensor.detection_range_cm = bp.control.avoidance.enter_cm;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_hysteresis_required() {
        let mut bp = minimal_blueprint();
        bp.control.avoidance.exit_cm = bp.control.avoidance.enter_cm;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("enter_cm"), "got: {err}");
    }

    #[test]
    fn test_avoid_steer_bounded() {
        let mut bp = minimal_blueprint();
        bp.control.avoidance.hard_steer_deg = 60.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("hard_steer_deg"), "got: {err}");
    }

    #[test]
    fn test_bad_socket_address() {
        let mut bp = minimal_blueprint();
        bp.actuator.peer = "robot.local".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("actuator.peer"), "got: {err}");
    }

    #[test]
    fn test_zero_queue_capacity() {
        let mut bp = minimal_blueprint();
        bp.operator.queue_capacity = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("queue_capacity"), "got: {err}");
    }
}
