//! # Dispatcher
//!
//! 输出网关模块。
//!
//! 负责：
//! - 每个周期向执行器发送 `steer,speed` UDP 指令 (发后即忘)
//! - 向所有操作员连接广播遥测与图像 (JSON lines)
//! - 接收操作员指令并写入 `SharedState`
//! - 隔离慢观察者，不阻塞控制循环

pub mod actuator;
pub mod error;
pub mod handle;
pub mod hub;
pub mod images;
pub mod metrics;
pub mod sinks;

pub use actuator::ActuatorLink;
pub use contracts::{DataSink, OperatorFrame, OperatorMessage};
pub use error::DispatcherError;
pub use handle::{SendOutcome, SinkHandle};
pub use hub::{apply_command, OperatorHub};
pub use images::{encode_jpeg_base64, processed_image_message, raw_image_message};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{LogSink, TcpObserverSink};
