//! LogSink - logs operator message summaries via tracing

use contracts::{ContractError, DataSink, MessageKind, OperatorFrame};
use tracing::{debug, info, instrument};

/// Sink that logs message summaries for debugging
pub struct LogSink {
    name: String,
    written: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: 0,
        }
    }

    fn log_summary(&self, frame: &OperatorFrame) {
        // images are large and frequent; keep them at debug
        if frame.kind == MessageKind::Telemetry {
            info!(
                sink = %self.name,
                tick = frame.tick,
                bytes = frame.payload.len(),
                payload = %String::from_utf8_lossy(frame.payload.trim_ascii_end()),
                "telemetry"
            );
        } else {
            debug!(
                sink = %self.name,
                tick = frame.tick,
                kind = frame.kind.as_str(),
                bytes = frame.payload.len(),
                "image"
            );
        }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, tick = frame.tick)
    )]
    async fn write(&mut self, frame: &OperatorFrame) -> Result<(), ContractError> {
        self.log_summary(frame);
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, messages = self.written, "LogSink closed");
        Ok(())
    }
}
