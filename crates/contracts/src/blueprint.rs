//! RoverBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：相机、控制周期、视觉参数、控制策略、传感器/执行器/操作员链路、里程计。
//! 所有段落都有默认值，最小配置文件可以为空。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoverBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 相机 / 帧源
    #[serde(default)]
    pub camera: CameraConfig,

    /// 控制周期
    #[serde(default, rename = "loop")]
    pub schedule: LoopConfig,

    /// 车道视觉参数
    #[serde(default)]
    pub vision: VisionConfig,

    /// 控制策略参数
    #[serde(default)]
    pub control: ControlConfig,

    /// 距离传感器输入 (UDP)
    #[serde(default)]
    pub sensor: SensorLinkConfig,

    /// 执行器输出 (UDP)
    #[serde(default)]
    pub actuator: ActuatorConfig,

    /// 操作员链路 (TCP, JSON lines)
    #[serde(default)]
    pub operator: OperatorConfig,

    /// 里程计
    #[serde(default)]
    pub odometry: OdometryConfig,
}

// ===== Camera =====

/// 帧源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSourceType {
    /// 程序生成的车道画面 (无需硬件)
    #[default]
    Synthetic,
    /// 图片目录录像，读完后回到第一帧
    Recording,
    /// 由外部采集进程不断覆盖的单个图片文件
    Snapshot,
}

/// 相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 帧源类型
    #[serde(default)]
    pub source: CameraSourceType,

    /// 录像目录或快照文件路径
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// 处理分辨率 (像素)
    #[serde(default = "default_frame_width")]
    pub width: u32,

    #[serde(default = "default_frame_height")]
    pub height: u32,

    /// 实时源读取失败后的等待时间 (毫秒)
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// 合成帧源参数
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: CameraSourceType::default(),
            path: None,
            width: default_frame_width(),
            height: default_frame_height(),
            retry_interval_ms: default_retry_interval_ms(),
            synthetic: SyntheticConfig::default(),
        }
    }
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

fn default_retry_interval_ms() -> u64 {
    50
}

/// 合成车道参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// 俯视图中车道线角度 (度)，按图像坐标 atan(dy/dx) 计，90 为竖直
    #[serde(default = "default_synthetic_tilt")]
    pub tilt_deg: f64,

    /// 车道线横向偏移，占帧宽比例 (-0.5..0.5)
    #[serde(default)]
    pub lateral_offset: f64,

    /// 每圈帧数 (有限录像语义，读完后回绕)
    #[serde(default = "default_synthetic_frames")]
    pub frame_count: u32,

    /// 每帧倾角摆动幅度 (度)，0 表示静止画面
    #[serde(default)]
    pub sway_deg: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            tilt_deg: default_synthetic_tilt(),
            lateral_offset: 0.0,
            frame_count: default_synthetic_frames(),
            sway_deg: 0.0,
        }
    }
}

fn default_synthetic_tilt() -> f64 {
    90.0
}

fn default_synthetic_frames() -> u32 {
    120
}

// ===== Loop =====

/// 控制周期配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// 目标控制频率 (Hz)
    #[serde(default = "default_target_fps")]
    pub target_fps: f64,

    /// 每隔多少个周期推送一次图像
    #[serde(default = "default_image_every_ticks")]
    pub image_every_ticks: u64,

    /// JPEG 质量 (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            image_every_ticks: default_image_every_ticks(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl LoopConfig {
    /// 控制周期
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }
}

fn default_target_fps() -> f64 {
    30.0
}

fn default_image_every_ticks() -> u64 {
    2
}

fn default_jpeg_quality() -> u8 {
    80
}

// ===== Vision =====

/// 车道视觉配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// HLS 阈值下限 [H, L, S]，H 取值 0..180
    #[serde(default = "default_hls_lower")]
    pub hls_lower: [u8; 3],

    /// HLS 阈值上限
    #[serde(default = "default_hls_upper")]
    pub hls_upper: [u8; 3],

    /// Canny 低阈值
    #[serde(default = "default_canny_low")]
    pub canny_low: f32,

    /// Canny 高阈值
    #[serde(default = "default_canny_high")]
    pub canny_high: f32,

    /// Hough 累加器投票阈值
    #[serde(default = "default_hough_threshold")]
    pub hough_threshold: u32,

    /// 最短线段长度 (像素)
    #[serde(default = "default_min_line_length")]
    pub min_line_length: u32,

    /// 线段最大间隙 (像素)
    #[serde(default = "default_max_line_gap")]
    pub max_line_gap: u32,

    /// 横向位置估计使用的底部比例 (0.2-0.3)
    #[serde(default = "default_position_band")]
    pub position_band: f64,

    /// 居中容差，占帧宽比例 (0.05-0.2)
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: f64,

    /// 估计位置所需的最少标记像素
    #[serde(default = "default_min_position_pixels")]
    pub min_position_pixels: usize,

    /// 视觉障碍检测区域，底部比例
    #[serde(default = "default_obstacle_roi")]
    pub obstacle_roi: f64,

    /// 视觉障碍最小面积 (像素)
    #[serde(default = "default_obstacle_min_area")]
    pub obstacle_min_area: usize,

    /// 在叠加图左下角嵌入俯视图
    #[serde(default = "default_true")]
    pub bev_inset: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            hls_lower: default_hls_lower(),
            hls_upper: default_hls_upper(),
            canny_low: default_canny_low(),
            canny_high: default_canny_high(),
            hough_threshold: default_hough_threshold(),
            min_line_length: default_min_line_length(),
            max_line_gap: default_max_line_gap(),
            position_band: default_position_band(),
            position_tolerance: default_position_tolerance(),
            min_position_pixels: default_min_position_pixels(),
            obstacle_roi: default_obstacle_roi(),
            obstacle_min_area: default_obstacle_min_area(),
            bev_inset: true,
        }
    }
}

fn default_hls_lower() -> [u8; 3] {
    [0, 150, 0]
}

fn default_hls_upper() -> [u8; 3] {
    [255, 255, 255]
}

fn default_canny_low() -> f32 {
    40.0
}

fn default_canny_high() -> f32 {
    120.0
}

fn default_hough_threshold() -> u32 {
    25
}

fn default_min_line_length() -> u32 {
    25
}

fn default_max_line_gap() -> u32 {
    20
}

fn default_position_band() -> f64 {
    0.30
}

fn default_position_tolerance() -> f64 {
    0.20
}

fn default_min_position_pixels() -> usize {
    10
}

fn default_obstacle_roi() -> f64 {
    0.40
}

fn default_obstacle_min_area() -> usize {
    200
}

fn default_true() -> bool {
    true
}

// ===== Control =====

/// PID 增益
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidGains {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default = "default_kd")]
    pub kd: f64,
    /// 积分项绝对值上限 (deg·s)
    #[serde(default = "default_integral_limit")]
    pub integral_limit: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: 0.0,
            kd: default_kd(),
            integral_limit: default_integral_limit(),
        }
    }
}

fn default_kp() -> f64 {
    0.5
}

fn default_kd() -> f64 {
    0.25
}

fn default_integral_limit() -> f64 {
    100.0
}

/// 三档速度映射：|steer| > sharp_deg → sharp_speed，> moderate_deg → moderate_speed，否则 straight_speed
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeedTiers {
    #[serde(default = "default_sharp_deg")]
    pub sharp_deg: f64,
    #[serde(default = "default_sharp_speed")]
    pub sharp_speed: f64,
    #[serde(default = "default_moderate_deg")]
    pub moderate_deg: f64,
    #[serde(default = "default_moderate_speed")]
    pub moderate_speed: f64,
    #[serde(default = "default_straight_speed")]
    pub straight_speed: f64,
}

impl Default for SpeedTiers {
    fn default() -> Self {
        Self {
            sharp_deg: default_sharp_deg(),
            sharp_speed: default_sharp_speed(),
            moderate_deg: default_moderate_deg(),
            moderate_speed: default_moderate_speed(),
            straight_speed: default_straight_speed(),
        }
    }
}

fn default_sharp_deg() -> f64 {
    30.0
}

fn default_sharp_speed() -> f64 {
    150.0
}

fn default_moderate_deg() -> f64 {
    15.0
}

fn default_moderate_speed() -> f64 {
    250.0
}

fn default_straight_speed() -> f64 {
    255.0
}

/// 避障状态机参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AvoidanceConfig {
    /// 危险距离，低于此值立即停车 (厘米)
    #[serde(default = "default_danger_cm")]
    pub danger_cm: f64,

    /// 进入 AVOIDING 的距离阈值 (厘米)
    #[serde(default = "default_enter_cm")]
    pub enter_cm: f64,

    /// 离开 AVOIDING 的距离阈值 (厘米)，必须大于 enter_cm
    #[serde(default = "default_exit_cm")]
    pub exit_cm: f64,

    /// 进入避障时的转向 (度)
    #[serde(default = "default_hard_steer_deg")]
    pub hard_steer_deg: f64,

    #[serde(default = "default_hard_speed")]
    pub hard_speed: f64,

    /// 保持避障时的转向 (度)
    #[serde(default = "default_soft_steer_deg")]
    pub soft_steer_deg: f64,

    #[serde(default = "default_soft_speed")]
    pub soft_speed: f64,

    /// 回归车道时的反向转向 (度)
    #[serde(default = "default_return_steer_deg")]
    pub return_steer_deg: f64,

    #[serde(default = "default_return_speed")]
    pub return_speed: f64,

    /// |angle| 低于此值时 RETURNING → NORMAL (度)
    #[serde(default = "default_return_exit_deg")]
    pub return_exit_deg: f64,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            danger_cm: default_danger_cm(),
            enter_cm: default_enter_cm(),
            exit_cm: default_exit_cm(),
            hard_steer_deg: default_hard_steer_deg(),
            hard_speed: default_hard_speed(),
            soft_steer_deg: default_soft_steer_deg(),
            soft_speed: default_soft_speed(),
            return_steer_deg: default_return_steer_deg(),
            return_speed: default_return_speed(),
            return_exit_deg: default_return_exit_deg(),
        }
    }
}

fn default_danger_cm() -> f64 {
    20.0
}

fn default_enter_cm() -> f64 {
    40.0
}

fn default_exit_cm() -> f64 {
    60.0
}

fn default_hard_steer_deg() -> f64 {
    45.0
}

fn default_hard_speed() -> f64 {
    150.0
}

fn default_soft_steer_deg() -> f64 {
    30.0
}

fn default_soft_speed() -> f64 {
    120.0
}

fn default_return_steer_deg() -> f64 {
    20.0
}

fn default_return_speed() -> f64 {
    150.0
}

fn default_return_exit_deg() -> f64 {
    15.0
}

/// 控制策略配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default)]
    pub pid: PidGains,

    #[serde(default)]
    pub speed: SpeedTiers,

    #[serde(default)]
    pub avoidance: AvoidanceConfig,
}

// ===== Links =====

/// 距离传感器链路
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorLinkConfig {
    /// UDP 监听地址
    #[serde(default = "default_sensor_bind")]
    pub bind: String,

    /// 紧凑格式下判定"检测到"的距离上限 (厘米)
    #[serde(default = "default_detection_range_cm")]
    pub detection_range_cm: f64,

    /// 传感器读数过期时间 (毫秒)，0 表示永不过期
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

impl Default for SensorLinkConfig {
    fn default() -> Self {
        Self {
            bind: default_sensor_bind(),
            detection_range_cm: default_detection_range_cm(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

fn default_sensor_bind() -> String {
    "0.0.0.0:50002".to_string()
}

fn default_detection_range_cm() -> f64 {
    50.0
}

fn default_stale_after_ms() -> u64 {
    1000
}

/// 执行器链路
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// 执行器 UDP 地址
    #[serde(default = "default_actuator_peer")]
    pub peer: String,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            peer: default_actuator_peer(),
        }
    }
}

fn default_actuator_peer() -> String {
    "127.0.0.1:50001".to_string()
}

/// 操作员链路
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// TCP 监听地址
    #[serde(default = "default_operator_bind")]
    pub bind: String,

    /// 每个观察者的发送队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 额外挂载日志 sink
    #[serde(default)]
    pub log_sink: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            bind: default_operator_bind(),
            queue_capacity: default_queue_capacity(),
            log_sink: false,
        }
    }
}

fn default_operator_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_queue_capacity() -> usize {
    8
}

/// 里程计配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OdometryConfig {
    /// 无上报速度时，每单位速度指令对应的估计速度 (cm/s)
    #[serde(default = "default_cm_s_per_speed_cmd")]
    pub cm_s_per_speed_cmd: f64,

    /// 上报速度高于此值才视为有效 (cm/s)
    #[serde(default = "default_min_reported_speed")]
    pub min_reported_speed: f64,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            cm_s_per_speed_cmd: default_cm_s_per_speed_cmd(),
            min_reported_speed: default_min_reported_speed(),
        }
    }
}

fn default_cm_s_per_speed_cmd() -> f64 {
    0.2
}

fn default_min_reported_speed() -> f64 {
    0.01
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let bp = RoverBlueprint::default();
        assert_eq!(bp.camera.width, 640);
        assert_eq!(bp.camera.height, 480);
        assert_eq!(bp.schedule.target_fps, 30.0);
        assert_eq!(bp.vision.hls_lower, [0, 150, 0]);
        assert_eq!(bp.control.pid.kp, 0.5);
        assert_eq!(bp.control.avoidance.enter_cm, 40.0);
        assert_eq!(bp.sensor.detection_range_cm, 50.0);
    }

    #[test]
    fn test_period() {
        let config = LoopConfig {
            target_fps: 20.0,
            ..Default::default()
        };
        assert_eq!(config.period(), Duration::from_millis(50));
    }

    #[test]
    fn test_loop_section_name() {
        let json = serde_json::json!({ "loop": { "target_fps": 10.0 } });
        let bp: RoverBlueprint = serde_json::from_value(json).unwrap();
        assert_eq!(bp.schedule.target_fps, 10.0);
        assert_eq!(bp.schedule.jpeg_quality, 80);
    }
}
