//! Ingestion 错误类型

use std::net::SocketAddr;

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 监听地址无法绑定
    #[error("failed to bind sensor listener on {addr}: {source}")]
    Bind {
        /// 监听地址
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// 报文解析失败
    #[error("malformed sensor datagram from {peer:?}: {message}")]
    Malformed {
        /// 来源地址
        peer: Option<SocketAddr>,
        /// 错误消息
        message: String,
    },

    /// 报文没有可识别的字段
    #[error("sensor datagram carries no known fields")]
    Empty,

    /// socket 接收失败
    #[error("sensor socket receive failed: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestionError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            peer: None,
            message: message.into(),
        }
    }

    /// 附加来源地址
    pub fn with_peer(self, addr: SocketAddr) -> Self {
        match self {
            Self::Malformed { message, .. } => Self::Malformed {
                peer: Some(addr),
                message,
            },
            other => other,
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
