//! Error types for the fact-check client.

use facto_runtime::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The client was shut down, or its session task stopped.
	#[error("fact-check client has been shut down")]
	ShutDown,
}

pub type Result<T> = std::result::Result<T, ClientError>;
