//! Frame and FrameSource - camera acquisition abstraction
//!
//! A `FrameSource` is driven from a dedicated OS thread by the acquisition
//! worker, so reads are allowed to block. Opening a source happens in its
//! constructor; a source that cannot be opened is a startup failure.

use std::time::Instant;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// One camera frame, owned by the control loop for a single tick
#[derive(Debug, Clone)]
pub struct Frame {
    /// Acquisition sequence number (monotonically increasing)
    pub seq: u64,

    /// Monotonic capture time
    pub captured_at: Instant,

    /// 8-bit RGB raster
    pub image: RgbImage,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// How a source reacts when a read fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSourceKind {
    /// Finite recording: rewind to the first frame and continue
    Recording,
    /// Live device: idle briefly and retry
    Live,
}

/// Camera frame source trait
///
/// Implemented by recordings, live snapshot devices and the synthetic renderer.
pub trait FrameSource: Send {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Recovery behaviour on failed reads
    fn kind(&self) -> FrameSourceKind;

    /// Read the next frame
    ///
    /// # Errors
    /// Returns `FrameRead` when no frame is available right now. For a
    /// recording this signals exhaustion.
    fn read_frame(&mut self) -> Result<RgbImage, ContractError>;

    /// Restart from the first frame (no-op for live sources)
    fn rewind(&mut self) -> Result<(), ContractError>;
}
