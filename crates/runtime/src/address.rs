//! Connection address derivation.

use url::Url;

use crate::error::{Result, TransportError};

/// Fixed path under which the service exposes the fact-check channel.
pub const CHANNEL_PATH: &str = "ws/fact-check";

/// Session id sent when none is known yet; the server assigns a fresh one.
pub const PLACEHOLDER_SESSION_ID: &str = "undefined";

/// Builds the channel URL for `session_id` from the configured base endpoint.
///
/// `http` maps to `ws` and `https` to `wss`; `ws`/`wss` pass through. Any path
/// already on the endpoint is kept as a prefix.
pub fn channel_url(endpoint: &Url, session_id: Option<&str>) -> Result<Url> {
	let scheme = match endpoint.scheme() {
		"http" | "ws" => "ws",
		"https" | "wss" => "wss",
		other => return Err(TransportError::InvalidEndpoint(format!("unsupported scheme `{other}` in {endpoint}"))),
	};

	if endpoint.host_str().is_none() {
		return Err(TransportError::InvalidEndpoint(format!("missing host in {endpoint}")));
	}

	let session_id = session_id.filter(|id| !id.is_empty()).unwrap_or(PLACEHOLDER_SESSION_ID);

	let mut url = endpoint.clone();
	url.set_query(None);
	url.set_fragment(None);
	{
		let mut segments = url
			.path_segments_mut()
			.map_err(|_| TransportError::InvalidEndpoint(format!("endpoint cannot carry a path: {endpoint}")))?;
		segments.pop_if_empty();
		for segment in CHANNEL_PATH.split('/') {
			segments.push(segment);
		}
		segments.push(session_id);
	}

	// http→ws and https→wss are both special-scheme swaps, which `Url` allows.
	url.set_scheme(scheme)
		.map_err(|_| TransportError::InvalidEndpoint(format!("cannot derive websocket scheme for {endpoint}")))?;
	Ok(url)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn url(s: &str) -> Url {
		Url::parse(s).unwrap()
	}

	#[test]
	fn http_becomes_ws_with_placeholder() {
		let derived = channel_url(&url("http://localhost:8000"), None).unwrap();
		assert_eq!(derived.as_str(), "ws://localhost:8000/ws/fact-check/undefined");
	}

	#[test]
	fn https_becomes_wss_with_session_id() {
		let derived = channel_url(&url("https://api.facto.app"), Some("abc-123")).unwrap();
		assert_eq!(derived.as_str(), "wss://api.facto.app/ws/fact-check/abc-123");
	}

	#[test]
	fn empty_session_id_uses_placeholder() {
		let derived = channel_url(&url("http://127.0.0.1:9000/"), Some("")).unwrap();
		assert_eq!(derived.as_str(), "ws://127.0.0.1:9000/ws/fact-check/undefined");
	}

	#[test]
	fn existing_path_is_kept_as_prefix() {
		let derived = channel_url(&url("https://example.com/api/?x=1"), Some("s")).unwrap();
		assert_eq!(derived.as_str(), "wss://example.com/api/ws/fact-check/s");
	}

	#[test]
	fn session_id_is_percent_encoded() {
		let derived = channel_url(&url("ws://localhost:8000"), Some("a b/c")).unwrap();
		assert_eq!(derived.as_str(), "ws://localhost:8000/ws/fact-check/a%20b%2Fc");
	}

	#[test]
	fn unsupported_scheme_is_rejected() {
		let err = channel_url(&url("ftp://example.com"), None).unwrap_err();
		assert!(matches!(err, TransportError::InvalidEndpoint(_)));
	}
}
