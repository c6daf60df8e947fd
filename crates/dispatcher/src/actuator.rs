//! ActuatorLink - UDP fire-and-forget command channel

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::ControlCommand;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;

/// Sends one ASCII `steer,speed` datagram per tick to a fixed peer
pub struct ActuatorLink {
    socket: UdpSocket,
    peer: SocketAddr,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl ActuatorLink {
    /// Bind an ephemeral port and connect it to `peer`
    #[instrument(name = "actuator_connect")]
    pub async fn connect(peer: &str) -> Result<Self, DispatcherError> {
        let bind_addr = if peer.starts_with('[') {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DispatcherError::connect(peer, e))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| DispatcherError::connect(peer, e))?;
        let peer = socket
            .peer_addr()
            .map_err(|e| DispatcherError::connect(peer, e))?;
        socket
            .writable()
            .await
            .map_err(|e| DispatcherError::connect(peer.to_string(), e))?;

        info!(%peer, "actuator link ready");
        Ok(Self {
            socket,
            peer,
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send without waiting. A full socket buffer or a send error drops the
    /// command; the next tick sends a fresh one.
    ///
    /// The send is polled exactly once, which keeps the socket registered
    /// for writability after a full buffer, unlike a bare `try_send`.
    pub async fn send(&self, command: &ControlCommand) -> bool {
        let sent = match timeout(Duration::ZERO, self.socket.send(&command.encode())).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(io::ErrorKind::WouldBlock.into()),
        };
        match sent {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("lane_rover_commands_sent_total").increment(1);
                true
            }
            Err(e) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::counter!("lane_rover_commands_dropped_total").increment(1);
                if dropped == 1 || dropped % 100 == 0 {
                    warn!(peer = %self.peer, error = %e, dropped, "actuator command dropped");
                }
                false
            }
        }
    }

    /// Awaited all-stop, used on shutdown
    #[instrument(name = "actuator_send_stop", skip(self), fields(peer = %self.peer))]
    pub async fn send_stop(&self) -> Result<(), DispatcherError> {
        self.socket.send(&ControlCommand::STOP.encode()).await?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        debug!("stop command sent");
        Ok(())
    }

    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
