//! Error types for the command-line client.

use std::path::PathBuf;

use facto::{ClientError, TransportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("failed to read config file {path}: {source}")]
	ReadConfig {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config file {path}: {source}")]
	ParseConfig {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("invalid endpoint `{value}`: {source}")]
	InvalidEndpoint {
		value: String,
		#[source]
		source: url::ParseError,
	},

	#[error("nothing to check: pass a statement or an http(s) URL")]
	EmptyInput,

	#[error("no result within {secs}s")]
	Timeout { secs: u64 },

	#[error(transparent)]
	Transport(#[from] TransportError),

	#[error(transparent)]
	Client(#[from] ClientError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
