//! DataSink trait - operator gateway output interface
//!
//! Defines the abstract interface for observers of the operator stream.

use crate::{ContractError, OperatorFrame};

/// Data output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one serialized operator message
    ///
    /// # Errors
    /// Returns write error (should include context). The gateway removes an
    /// observer whose write fails.
    async fn write(&mut self, frame: &OperatorFrame) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
