//! # Lane Rover
//!
//! 控制循环库：把相机、视觉、融合、控制与输出网关组装成实时管道。
//! 二进制 `lane-rover` 与集成测试共用。

pub mod error;
pub mod pipeline;

pub use error::CliError;
pub use pipeline::{Pipeline, PipelineConfig, PipelineStats};
