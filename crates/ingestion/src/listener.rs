//! UDP sensor listener task

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use fusion::SharedState;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;
use crate::parser::parse_datagram;

/// Largest datagram accepted; longer payloads are truncated by the socket
const MAX_DATAGRAM: usize = 2048;

/// Receives sensor datagrams and writes them into the shared state.
///
/// Runs as its own task and never touches the control loop directly.
pub struct SensorListener {
    socket: UdpSocket,
    state: Arc<SharedState>,
    metrics: Arc<IngestionMetrics>,
}

impl SensorListener {
    pub async fn bind(addr: &str, state: Arc<SharedState>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| IngestionError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            socket,
            state,
            metrics: Arc::new(IngestionMetrics::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Decode and apply one datagram.
    pub fn handle(&self, payload: &[u8], peer: SocketAddr) -> Result<()> {
        self.metrics.record_received();
        match parse_datagram(payload) {
            Ok(report) => {
                trace!(%peer, ?report, "sensor datagram");
                self.state.apply_report(&report, Instant::now());
                self.metrics.record_applied();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_malformed();
                Err(e.with_peer(peer))
            }
        }
    }

    /// Receive until `shutdown` flips to true.
    #[instrument(name = "sensor_listener", skip_all, fields(addr = ?self.socket.local_addr().ok()))]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("sensor listener started");
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                recv = self.socket.recv_from(&mut buf) => match recv {
                    Ok((n, peer)) => {
                        if let Err(e) = self.handle(&buf[..n], peer) {
                            debug!(error = %e, "dropping sensor datagram");
                        }
                    }
                    Err(e) => {
                        // ICMP port-unreachable and friends surface here on some platforms
                        self.metrics.record_recv_error();
                        warn!(error = %e, "sensor socket receive failed");
                    }
                },
            }
        }
        let snap = self.metrics.snapshot();
        info!(
            received = snap.datagrams_received,
            applied = snap.datagrams_applied,
            malformed = snap.malformed,
            "sensor listener stopped"
        );
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn state() -> Arc<SharedState> {
        Arc::new(SharedState::new(50.0, None))
    }

    #[tokio::test]
    async fn test_handle_counts_malformed() {
        let listener = SensorListener::bind("127.0.0.1:0", state()).await.unwrap();
        let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();
        assert!(listener.handle(b"30:L", peer).is_ok());
        assert!(listener.handle(b"garbage", peer).is_err());
        let snap = listener.metrics().snapshot();
        assert_eq!(snap.datagrams_received, 2);
        assert_eq!(snap.datagrams_applied, 1);
        assert_eq!(snap.malformed, 1);
    }

    #[tokio::test]
    async fn test_datagrams_reach_shared_state() {
        let shared = state();
        let listener = SensorListener::bind("127.0.0.1:0", Arc::clone(&shared))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let handle = listener.spawn(rx);

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"not a reading", addr).await.unwrap();
        sender.send_to(b"S:14", addr).await.unwrap();
        sender.send_to(b"22:R", addr).await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while shared.obstacle(Instant::now()).ranged().is_none() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let belief = shared.obstacle(Instant::now());
        assert_eq!(belief.ranged(), Some(22.0));
        assert_eq!(shared.reported_speed(Instant::now()), Some(14.0));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
