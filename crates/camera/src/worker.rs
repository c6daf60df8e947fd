//! Acquisition worker: drives a `FrameSource` on its own OS thread.
//!
//! Blocking reads never touch the async runtime. Frames are handed over
//! through a single-slot channel. A recording waits for the control loop to
//! take each frame so none are skipped; a live source replaces an untaken
//! frame with the newer one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{Frame, FrameSource, FrameSourceKind};
use image::{imageops, RgbImage};
use tracing::{debug, info, warn};

use crate::error::{CameraError, Result};

/// Worker settings
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionConfig {
    /// Output frame size; frames of another size are resized
    pub width: u32,
    pub height: u32,
    /// Idle time after a failed live read
    pub retry_interval: Duration,
    /// Minimum spacing between live reads
    pub live_pace: Duration,
}

pub struct AcquisitionWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    source_name: String,
}

impl AcquisitionWorker {
    /// Start the worker thread. The returned receiver yields frames in
    /// acquisition order.
    pub fn spawn(
        source: Box<dyn FrameSource>,
        config: AcquisitionConfig,
    ) -> Result<(Self, Receiver<Frame>)> {
        let (tx, rx) = async_channel::bounded(1);
        let running = Arc::new(AtomicBool::new(true));
        let source_name = source.name().to_string();

        let thread_running = Arc::clone(&running);
        // only live sources evict; a recording must see its consumer go away
        let drain = (source.kind() == FrameSourceKind::Live).then(|| rx.clone());
        let handle = thread::Builder::new()
            .name("camera-acquisition".into())
            .spawn(move || acquisition_loop(source, config, thread_running, tx, drain))
            .map_err(CameraError::Spawn)?;

        info!(source = %source_name, width = config.width, height = config.height, "acquisition worker started");
        Ok((
            Self {
                running,
                handle: Some(handle),
                source_name,
            },
            rx,
        ))
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signal the thread and wait for it. For a recording the frame
    /// receiver must be dropped first so a blocked hand-off wakes up.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(source = %self.source_name, "acquisition thread panicked");
            }
        }
    }
}

impl Drop for AcquisitionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn fit(image: RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        image
    } else {
        imageops::resize(&image, width, height, imageops::FilterType::Triangle)
    }
}

fn acquisition_loop(
    mut source: Box<dyn FrameSource>,
    config: AcquisitionConfig,
    running: Arc<AtomicBool>,
    tx: Sender<Frame>,
    drain: Option<Receiver<Frame>>,
) {
    let kind = source.kind();
    let mut seq = 0u64;
    let mut consecutive_failures = 0u32;

    while running.load(Ordering::Relaxed) {
        let started = Instant::now();
        let image = match source.read_frame() {
            Ok(image) => {
                consecutive_failures = 0;
                image
            }
            Err(e) => {
                consecutive_failures += 1;
                match kind {
                    FrameSourceKind::Recording => {
                        debug!(source = source.name(), reason = %e, "rewinding recording");
                        if let Err(e) = source.rewind() {
                            warn!(source = source.name(), error = %e, "rewind failed");
                            thread::sleep(config.retry_interval);
                        } else if consecutive_failures > 1 {
                            // rewound but still nothing readable
                            thread::sleep(config.retry_interval);
                        }
                    }
                    FrameSourceKind::Live => {
                        if consecutive_failures == 1 {
                            warn!(source = source.name(), error = %e, "frame read failed, retrying");
                        }
                        thread::sleep(config.retry_interval);
                    }
                }
                continue;
            }
        };

        let frame = Frame {
            seq,
            captured_at: Instant::now(),
            image: fit(image, config.width, config.height),
        };
        seq += 1;

        let delivered = match &drain {
            Some(drain) => replace_latest(&tx, drain, frame),
            None => tx.send_blocking(frame).is_ok(),
        };
        if !delivered {
            debug!(source = source.name(), "frame receiver closed");
            break;
        }

        if kind == FrameSourceKind::Live {
            let elapsed = started.elapsed();
            if elapsed < config.live_pace {
                thread::sleep(config.live_pace - elapsed);
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    info!(source = source.name(), frames = seq, "acquisition worker stopped");
}

/// Put `frame` in the slot, evicting an untaken older frame.
fn replace_latest(tx: &Sender<Frame>, drain: &Receiver<Frame>, mut frame: Frame) -> bool {
    loop {
        match tx.try_send(frame) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                let _ = drain.try_recv();
                frame = back;
            }
            Err(TrySendError::Closed(_)) => return false,
        }
    }
}
