//! Observer sink implementations
//!
//! Contains LogSink and TcpObserverSink.

mod log;
mod tcp;

pub use self::log::LogSink;
pub use self::tcp::TcpObserverSink;
