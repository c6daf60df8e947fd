//! # Ingestion
//!
//! Sensor link ingestion.
//!
//! Responsibilities:
//! - Bind the inbound UDP sensor socket
//! - Decode compact, tagged and JSON sensor datagrams into `SensorReport`
//! - Apply reports to the shared obstacle belief and speed
//! - Drop and count malformed payloads
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::SensorListener;
//!
//! let listener = SensorListener::bind("0.0.0.0:50002", state.clone()).await?;
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let handle = listener.spawn(shutdown_rx);
//! // ...
//! shutdown_tx.send(true)?;
//! handle.await?;
//! ```

mod error;
mod listener;
mod metrics;
mod parser;

pub use error::{IngestionError, Result};
pub use listener::SensorListener;
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use parser::parse_datagram;
