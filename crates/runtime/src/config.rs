//! Transport session configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::address::channel_url;
use crate::backoff::ReconnectPolicy;
use crate::error::Result;

/// Default backend endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Configuration for one transport session.
///
/// All fields are optional in serialized form so partial JSON config files
/// layer cleanly over the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportConfig {
	/// Base HTTP(S) or WS(S) endpoint of the fact-check service.
	pub endpoint: Url,
	/// Client-proposed session id; the server may replace it.
	pub session_id: Option<String>,
	pub reconnect: ReconnectPolicy,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			endpoint: default_endpoint(),
			session_id: None,
			reconnect: ReconnectPolicy::default(),
		}
	}
}

fn default_endpoint() -> Url {
	Url::parse(DEFAULT_ENDPOINT).expect("DEFAULT_ENDPOINT should parse")
}

impl TransportConfig {
	pub fn new(endpoint: Url) -> Self {
		Self {
			endpoint,
			..Self::default()
		}
	}

	/// Sets the client-proposed session id.
	pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
		self.session_id = session_id.filter(|id| !id.trim().is_empty());
		self
	}

	/// Sets the reconnect policy.
	pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
		self.reconnect = reconnect;
		self
	}

	/// Validates the endpoint and reconnect policy.
	pub fn validate(&self) -> Result<()> {
		channel_url(&self.endpoint, self.session_id.as_deref())?;
		self.reconnect.validate()
	}
}
