//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Listener could not be bound
    #[error("failed to bind operator listener on '{addr}': {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Actuator peer could not be resolved or connected
    #[error("failed to reach actuator '{peer}': {source}")]
    Connect {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// Image could not be encoded for the operator stream
    #[error("image encode error: {0}")]
    Encode(String),

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    pub fn connect(peer: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connect {
            peer: peer.into(),
            source,
        }
    }
}
