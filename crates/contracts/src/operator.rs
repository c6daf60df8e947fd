//! Operator channel messages
//!
//! Outbound: telemetry snapshot every tick, raw/processed images every N ticks.
//! Inbound: `start` / `stop` / `reset_distance`.
//! Both directions are newline-delimited JSON.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ContractError, ControlState, LaneStatus, LateralPosition, ObstacleSide};

/// Obstacle section of the telemetry snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObstacleTelemetry {
    pub detected: bool,
    pub distance: Option<f64>,
    pub position: Option<ObstacleSide>,
}

/// Per-tick telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    #[serde(rename = "steering_angle")]
    pub steering_angle: f64,
    pub lane_status: LaneStatus,
    pub robot_position: LateralPosition,
    /// cm/s
    pub speed: f64,
    /// meters
    pub distance_traveled: f64,
    pub obstacle: ObstacleTelemetry,
    pub running: bool,
    pub control_state: ControlState,
    pub speed_cmd: f64,
    pub tick: u64,
    /// RFC 3339 wall-clock time
    pub timestamp: String,
}

/// Outbound operator message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorMessage {
    Telemetry {
        data: TelemetrySnapshot,
    },
    ImageRaw {
        /// Base64 JPEG
        data: String,
        width: u32,
        height: u32,
    },
    ImageProcessed {
        data: String,
        width: u32,
        height: u32,
    },
}

/// Message category, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Telemetry,
    ImageRaw,
    ImageProcessed,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::ImageRaw => "image_raw",
            Self::ImageProcessed => "image_processed",
        }
    }
}

impl OperatorMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Telemetry { .. } => MessageKind::Telemetry,
            Self::ImageRaw { .. } => MessageKind::ImageRaw,
            Self::ImageProcessed { .. } => MessageKind::ImageProcessed,
        }
    }
}

/// A message serialized once and shared by every observer
///
/// `payload` is a complete JSON line including the trailing newline, so
/// cloning a frame for fan-out is a reference-count bump.
#[derive(Debug, Clone)]
pub struct OperatorFrame {
    pub tick: u64,
    pub kind: MessageKind,
    pub payload: Bytes,
}

impl OperatorFrame {
    /// Serialize a message into a JSON line
    pub fn encode(tick: u64, message: &OperatorMessage) -> Result<Self, ContractError> {
        let mut payload = serde_json::to_vec(message)
            .map_err(|e| ContractError::payload(format!("json error: {e}")))?;
        payload.push(b'\n');
        Ok(Self {
            tick,
            kind: message.kind(),
            payload: Bytes::from(payload),
        })
    }
}

/// Inbound operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Start,
    Stop,
    ResetDistance,
}

#[derive(Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    cmd: Option<String>,
}

impl OperatorCommand {
    /// Decode one inbound line
    ///
    /// Accepts `{"type":"control","command":...}` and the older
    /// `{"type":"command","cmd":...}` form. Anything else yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let envelope: InboundEnvelope = serde_json::from_str(line.trim()).ok()?;
        if envelope.kind != "control" && envelope.kind != "command" {
            return None;
        }
        let name = envelope.command.or(envelope.cmd)?;
        match name.as_str() {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "reset_distance" => Some(Self::ResetDistance),
            _ => None,
        }
    }
}
