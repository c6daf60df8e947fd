//! # Camera
//!
//! Frame acquisition for the control loop.
//!
//! Responsibilities:
//! - Open the configured frame source (recording, live snapshot, synthetic)
//! - Run blocking reads on a dedicated thread
//! - Hand frames to the loop through a single-slot channel
//!
//! Does not: interpret frames (see `vision`)

mod error;
mod recording;
mod snapshot;
mod synthetic;
mod worker;

use std::time::Duration;

use contracts::{CameraConfig, CameraSourceType, FrameSource};
use tracing::info;

pub use error::{CameraError, Result};
pub use recording::RecordingSource;
pub use snapshot::SnapshotSource;
pub use synthetic::SyntheticSource;
pub use worker::{AcquisitionConfig, AcquisitionWorker};

/// Open the source named by the camera section.
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    let source: Box<dyn FrameSource> = match config.source {
        CameraSourceType::Synthetic => Box::new(SyntheticSource::new(
            config.synthetic.clone(),
            config.width,
            config.height,
        )?),
        CameraSourceType::Recording => {
            let path = config.path.as_deref().ok_or(CameraError::MissingPath {
                source_kind: "recording",
            })?;
            Box::new(RecordingSource::open(path)?)
        }
        CameraSourceType::Snapshot => {
            let path = config.path.as_deref().ok_or(CameraError::MissingPath {
                source_kind: "snapshot",
            })?;
            Box::new(SnapshotSource::open(path)?)
        }
    };
    info!(source = source.name(), kind = ?source.kind(), "frame source opened");
    Ok(source)
}

impl AcquisitionConfig {
    /// Worker settings for a camera section; live reads are paced to the
    /// control period.
    pub fn from_camera(config: &CameraConfig, period: Duration) -> Self {
        Self {
            width: config.width,
            height: config.height,
            retry_interval: Duration::from_millis(config.retry_interval_ms),
            live_pace: period,
        }
    }
}

/// Open the configured source and start acquiring from it.
pub fn start(
    config: &CameraConfig,
    period: Duration,
) -> Result<(AcquisitionWorker, async_channel::Receiver<contracts::Frame>)> {
    let source = open_source(config)?;
    AcquisitionWorker::spawn(source, AcquisitionConfig::from_camera(config, period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FrameSourceKind;

    #[test]
    fn test_default_is_synthetic() {
        let config = CameraConfig {
            width: 64,
            height: 48,
            ..Default::default()
        };
        let source = open_source(&config).unwrap();
        assert_eq!(source.kind(), FrameSourceKind::Recording);
        assert_eq!(source.name(), "synthetic");
    }

    #[test]
    fn test_path_required() {
        let config = CameraConfig {
            source: CameraSourceType::Recording,
            ..Default::default()
        };
        assert!(matches!(
            open_source(&config),
            Err(CameraError::MissingPath {
                source_kind: "recording"
            })
        ));
    }

    #[test]
    fn test_start_delivers_configured_size() {
        let config = CameraConfig {
            width: 64,
            height: 48,
            ..Default::default()
        };
        let (mut worker, rx) = start(&config, Duration::from_millis(10)).unwrap();
        let frame = rx.recv_blocking().unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
        drop(rx);
        worker.stop();
    }
}
