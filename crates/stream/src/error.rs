//! Error types for the stream connection manager.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while establishing or driving a feed connection.
#[derive(Debug, Error)]
pub enum StreamError {
    /// No usable token, or the server rejected the one supplied.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// Failed to establish the connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection attempt did not complete in time.
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// WebSocket protocol error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Malformed Engine.IO / Socket.IO frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON parsing error.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Maximum reconnection attempts exceeded.
    #[error("max reconnection attempts exceeded after {0} retries")]
    MaxReconnectsExceeded(u32),

    /// The connection task is gone.
    #[error("stream channel closed")]
    ChannelClosed,
}

impl StreamError {
    /// Creates an authentication error for a missing or blank token.
    #[must_use]
    pub fn missing_token() -> Self {
        Self::AuthenticationRequired("no auth token supplied".to_string())
    }

    /// Returns true if the connection manager should try again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::Timeout(_)
                | Self::WebSocket(_)
                | Self::Protocol(_)
                | Self::Parse(_)
        )
    }

    /// Returns true for network-level failures that usually heal on their own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout(_) | Self::WebSocket(_)
        )
    }
}
