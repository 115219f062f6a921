//! Error types for the transport session.

use thiserror::Error;

/// Errors produced by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
	/// `send` was called while the channel was not open.
	#[error("not connected to the fact-check service")]
	NotConnected,

	/// The session was torn down with `close()`.
	#[error("transport session closed")]
	Closed,

	#[error("invalid endpoint: {0}")]
	InvalidEndpoint(String),

	#[error("invalid reconnect policy: {0}")]
	InvalidPolicy(String),

	#[error("websocket error: {0}")]
	WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

	#[error("serialization error: {0}")]
	Serialize(#[from] serde_json::Error),

	/// The peer went away or the socket failed mid-stream.
	#[error("connection lost: {0}")]
	ConnectionLost(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		TransportError::WebSocket(Box::new(err))
	}
}

impl TransportError {
	/// Whether this error means the caller may retry once the channel reopens.
	pub fn is_not_connected(&self) -> bool {
		matches!(self, TransportError::NotConnected)
	}
}

pub type Result<T> = std::result::Result<T, TransportError>;
