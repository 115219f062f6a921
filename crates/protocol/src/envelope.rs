//! Envelopes exchanged over the fact-check channel.
//!
//! The client sends a single request shape:
//! ```json
//! { "data": "The sky is blue." }
//! ```
//!
//! The server answers with envelopes discriminated by `type`:
//! ```json
//! { "type": "connection", "client_id": "6f1c..." }
//! { "type": "progress", "stage": "verification", "statementIndex": 0, "totalStatements": 2 }
//! { "type": "complete", "results": [ ... ] }
//! { "type": "error", "message": "Unsupported URL" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::progress::Progress;
use crate::verdict::FactCheckResult;

/// Envelope `type` tags understood by this client.
pub const ENVELOPE_TYPES: [&str; 4] = ["connection", "progress", "complete", "error"];

/// Client → server request submitting a statement or URL for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
	pub data: String,
}

impl ClientRequest {
	pub fn new(data: impl Into<String>) -> Self {
		Self { data: data.into() }
	}

	/// Serializes the request into a single text frame.
	pub fn to_frame(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}

/// Server → client envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEnvelope {
	/// Assigns or reconfirms the session identity.
	Connection {
		client_id: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		message: Option<String>,
	},
	Progress(Progress),
	Complete { results: Vec<FactCheckResult> },
	Error { message: String },
}

impl ServerEnvelope {
	/// Returns the `type` tag of this envelope.
	pub fn kind(&self) -> &'static str {
		match self {
			ServerEnvelope::Connection { .. } => "connection",
			ServerEnvelope::Progress(_) => "progress",
			ServerEnvelope::Complete { .. } => "complete",
			ServerEnvelope::Error { .. } => "error",
		}
	}

	/// Whether this envelope ends a submission cycle.
	pub fn is_terminal(&self) -> bool {
		matches!(self, ServerEnvelope::Complete { .. } | ServerEnvelope::Error { .. })
	}
}

/// Why an inbound frame could not be decoded into a [`ServerEnvelope`].
#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("frame is not valid JSON: {0}")]
	Malformed(#[source] serde_json::Error),

	#[error("frame is not a JSON object")]
	NotAnObject,

	#[error("frame has no string `type` field")]
	MissingType,

	#[error("unknown envelope type `{0}`")]
	UnknownType(String),

	#[error("invalid `{kind}` envelope: {source}")]
	InvalidPayload {
		kind: String,
		#[source]
		source: serde_json::Error,
	},
}

/// Decodes one text frame into a typed envelope.
///
/// Unknown extra fields are ignored; an unknown or missing `type` and a
/// payload that does not match its `type` are distinct errors.
pub fn decode_envelope(frame: &str) -> Result<ServerEnvelope, DecodeError> {
	let value: Value = serde_json::from_str(frame).map_err(DecodeError::Malformed)?;
	let Some(object) = value.as_object() else {
		return Err(DecodeError::NotAnObject);
	};

	let kind = match object.get("type").and_then(Value::as_str) {
		Some(kind) => kind.to_string(),
		None => return Err(DecodeError::MissingType),
	};

	if !ENVELOPE_TYPES.contains(&kind.as_str()) {
		return Err(DecodeError::UnknownType(kind));
	}

	serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload { kind, source })
}
