//! TcpObserverSink - write half of one operator connection

use std::net::SocketAddr;

use contracts::{ContractError, DataSink, OperatorFrame};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{debug, instrument};

/// Streams newline-delimited JSON to one connected operator
pub struct TcpObserverSink {
    name: String,
    writer: Option<OwnedWriteHalf>,
}

impl TcpObserverSink {
    pub fn new(peer: SocketAddr, writer: OwnedWriteHalf) -> Self {
        Self {
            name: format!("operator:{peer}"),
            writer: Some(writer),
        }
    }

    fn writer(&mut self) -> Result<&mut OwnedWriteHalf, ContractError> {
        let name = &self.name;
        self.writer.as_mut().ok_or_else(|| ContractError::SinkConnection {
            sink_name: name.clone(),
            message: "connection closed".into(),
        })
    }
}

impl DataSink for TcpObserverSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "tcp_observer_write",
        skip(self, frame),
        fields(sink = %self.name, tick = frame.tick, kind = frame.kind.as_str())
    )]
    async fn write(&mut self, frame: &OperatorFrame) -> Result<(), ContractError> {
        let name = self.name.clone();
        self.writer()?
            .write_all(&frame.payload)
            .await
            .map_err(|e| ContractError::sink_write(name, e.to_string()))
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        let name = self.name.clone();
        self.writer()?
            .flush()
            .await
            .map_err(|e| ContractError::sink_write(name, e.to_string()))
    }

    #[instrument(name = "tcp_observer_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        debug!(sink = %self.name, "observer closed");
        Ok(())
    }
}
