//! OperatorHub - TCP gateway for operator stations
//!
//! Every accepted connection becomes one observer: its write half is a
//! `TcpObserverSink` behind its own `SinkHandle`, its read half is a task
//! that turns inbound JSON lines into `OperatorCommand`s on `SharedState`.
//! Broadcast serializes each message once and never waits on a slow peer.
//! Image pairs are JPEG-encoded on the blocking pool, at most one pair in
//! flight; a pair offered while the previous one is still encoding is
//! skipped.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{OperatorCommand, OperatorConfig, OperatorFrame, OperatorMessage};
use fusion::SharedState;
use image::RgbImage;
use slab::Slab;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::handle::{SendOutcome, SinkHandle};
use crate::images::{processed_image_message, raw_image_message};
use crate::metrics::MetricsSnapshot;
use crate::sinks::{LogSink, TcpObserverSink};

struct Observer {
    /// Connection id; slab keys are reused, ids are not
    id: u64,
    handle: SinkHandle,
}

struct HubInner {
    observers: Mutex<Slab<Observer>>,
    /// Counters of observers that already left
    retired: Mutex<MetricsSnapshot>,
    next_id: Mutex<u64>,
    state: Arc<SharedState>,
    queue_capacity: usize,
    /// An image pair is being encoded
    encoding: AtomicBool,
}

impl HubInner {
    fn observers(&self) -> MutexGuard<'_, Slab<Observer>> {
        self.observers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn retire(&self, observer: Observer) {
        let snap = observer.handle.metrics().snapshot();
        let mut retired = self.retired.lock().unwrap_or_else(|e| e.into_inner());
        *retired = retired.merge(MetricsSnapshot {
            queue_len: 0,
            ..snap
        });
        debug!(sink = observer.handle.name(), "observer removed");
        // dropping the handle closes its queue; the worker closes the socket
    }

    fn register(&self, handle: SinkHandle) -> (usize, u64) {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        let mut observers = self.observers();
        let key = observers.insert(Observer { id, handle });
        metrics::gauge!("lane_rover_operator_observers").set(observers.len() as f64);
        (key, id)
    }

    fn broadcast_frame(&self, frame: &OperatorFrame) -> usize {
        let mut queued = 0;
        let mut dead = Vec::new();
        {
            let mut observers = self.observers();
            for (key, observer) in observers.iter() {
                match observer.handle.try_send(frame.clone()) {
                    SendOutcome::Queued => queued += 1,
                    SendOutcome::Dropped => {}
                    SendOutcome::Closed => dead.push(key),
                }
            }
            for key in &dead {
                let observer = observers.remove(*key);
                self.retire(observer);
            }
            if !dead.is_empty() {
                metrics::gauge!("lane_rover_operator_observers").set(observers.len() as f64);
            }
        }
        queued
    }

    fn remove(&self, key: usize, id: u64) {
        let removed = {
            let mut observers = self.observers();
            let hit = observers.get(key).is_some_and(|o| o.id == id);
            let removed = hit.then(|| observers.remove(key));
            metrics::gauge!("lane_rover_operator_observers").set(observers.len() as f64);
            removed
        };
        if let Some(observer) = removed {
            self.retire(observer);
        }
    }
}

/// Apply one operator command to the shared state
pub fn apply_command(state: &SharedState, command: OperatorCommand) {
    match command {
        OperatorCommand::Start => {
            state.set_running(true);
        }
        OperatorCommand::Stop => {
            state.set_running(false);
        }
        OperatorCommand::ResetDistance => state.request_distance_reset(),
    }
    metrics::counter!("lane_rover_operator_commands_total", "command" => command_label(command))
        .increment(1);
}

fn command_label(command: OperatorCommand) -> &'static str {
    match command {
        OperatorCommand::Start => "start",
        OperatorCommand::Stop => "stop",
        OperatorCommand::ResetDistance => "reset_distance",
    }
}

pub struct OperatorHub {
    inner: Arc<HubInner>,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl OperatorHub {
    /// Bind the listener and start accepting operators
    #[instrument(name = "operator_hub_bind", skip(config, state), fields(addr = %config.bind))]
    pub async fn bind(
        config: &OperatorConfig,
        state: Arc<SharedState>,
    ) -> Result<Self, DispatcherError> {
        let listener = TcpListener::bind(&config.bind)
            .await
            .map_err(|e| DispatcherError::bind(&config.bind, e))?;
        let local_addr = listener.local_addr()?;

        let inner = Arc::new(HubInner {
            observers: Mutex::new(Slab::new()),
            retired: Mutex::new(MetricsSnapshot::default()),
            next_id: Mutex::new(0),
            state,
            queue_capacity: config.queue_capacity,
            encoding: AtomicBool::new(false),
        });

        if config.log_sink {
            inner.register(SinkHandle::spawn(LogSink::new("log"), config.queue_capacity));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(listener, Arc::clone(&inner), shutdown_rx));

        info!(%local_addr, "operator hub listening");
        Ok(Self {
            inner,
            local_addr,
            shutdown_tx,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers().len()
    }

    /// Queue a message for every observer. Returns how many accepted it.
    pub fn broadcast(&self, tick: u64, message: &OperatorMessage) -> Result<usize, DispatcherError> {
        let frame = OperatorFrame::encode(tick, message)?;
        Ok(self.broadcast_frame(&frame))
    }

    pub fn broadcast_frame(&self, frame: &OperatorFrame) -> usize {
        self.inner.broadcast_frame(frame)
    }

    /// Encode the camera frame and the overlay off the caller, then
    /// broadcast both. Returns whether an encode was started.
    pub fn publish_images(
        &self,
        tick: u64,
        raw: RgbImage,
        processed: RgbImage,
        quality: u8,
    ) -> bool {
        if self.observer_count() == 0 {
            return false;
        }
        if self.inner.encoding.swap(true, Ordering::AcqRel) {
            debug!(tick, "previous images still encoding, skipping");
            metrics::counter!("lane_rover_images_skipped_total").increment(1);
            return false;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let encoded = tokio::task::spawn_blocking(move || {
                [
                    raw_image_message(&raw, quality),
                    processed_image_message(&processed, quality),
                ]
                .map(|message| {
                    message.and_then(|m| {
                        OperatorFrame::encode(tick, &m).map_err(DispatcherError::from)
                    })
                })
            })
            .await;

            match encoded {
                Ok(frames) => {
                    for frame in frames {
                        match frame {
                            Ok(frame) => {
                                inner.broadcast_frame(&frame);
                            }
                            Err(e) => warn!(tick, error = %e, "image encode failed"),
                        }
                    }
                }
                Err(e) => warn!(tick, error = %e, "image encode task failed"),
            }
            inner.encoding.store(false, Ordering::Release);
        });
        true
    }

    /// Counters summed over current and past observers
    pub fn totals(&self) -> MetricsSnapshot {
        let retired = *self.inner.retired.lock().unwrap_or_else(|e| e.into_inner());
        self.inner
            .observers()
            .iter()
            .fold(retired, |acc, (_, o)| acc.merge(o.handle.metrics().snapshot()))
    }

    /// Stop accepting, drain every observer queue and close connections
    #[instrument(name = "operator_hub_shutdown", skip(self))]
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.accept_task.await {
            warn!(error = ?e, "accept task panicked");
        }

        let drained: Vec<Observer> = self.inner.observers().drain().collect();
        for observer in drained {
            observer.handle.shutdown().await;
        }
        metrics::gauge!("lane_rover_operator_observers").set(0.0);
        info!("operator hub stopped");
    }
}

#[instrument(name = "operator_accept_loop", skip_all)]
async fn accept_loop(
    listener: TcpListener,
    inner: Arc<HubInner>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut readers = JoinSet::new();
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let (read, key, id) = attach(&inner, stream, peer);
                    readers.spawn(read_commands(read, peer, key, id, Arc::clone(&inner)));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            Some(_) = readers.join_next(), if !readers.is_empty() => {}
        }
    }
    readers.abort_all();
}

fn attach(inner: &HubInner, stream: TcpStream, peer: SocketAddr) -> (OwnedReadHalf, usize, u64) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "set_nodelay failed");
    }
    let (read, write) = stream.into_split();
    let handle = SinkHandle::spawn(TcpObserverSink::new(peer, write), inner.queue_capacity);
    let (key, id) = inner.register(handle);
    info!(%peer, observers = inner.observers().len(), "operator connected");
    (read, key, id)
}

#[instrument(name = "operator_reader", skip(read, inner), fields(%peer))]
async fn read_commands(
    read: OwnedReadHalf,
    peer: SocketAddr,
    key: usize,
    id: u64,
    inner: Arc<HubInner>,
) {
    let mut lines = BufReader::new(read).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match OperatorCommand::parse(&line) {
                    Some(command) => {
                        info!(%peer, ?command, "operator command");
                        apply_command(&inner.state, command);
                    }
                    None => debug!(%peer, "ignoring operator message"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(%peer, error = %e, "operator read failed");
                break;
            }
        }
    }
    inner.remove(key, id);
    info!(%peer, "operator disconnected");
}
