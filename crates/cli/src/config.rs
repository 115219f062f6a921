//! Resolution of the transport configuration.
//!
//! Later layers win: built-in defaults, then the JSON config file, then the
//! environment and command-line flags (clap merges those two, flags first).

use std::path::Path;

use facto::TransportConfig;
use tracing::debug;
use url::Url;

use crate::error::{CliError, Result};

/// Values taken from the environment or the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub endpoint: Option<String>,
	pub session_id: Option<String>,
}

pub fn resolve(config_file: Option<&Path>, overrides: Overrides) -> Result<TransportConfig> {
	let mut config = match config_file {
		Some(path) => load(path)?,
		None => TransportConfig::default(),
	};

	if let Some(value) = overrides.endpoint {
		config.endpoint = Url::parse(value.trim()).map_err(|source| CliError::InvalidEndpoint { value, source })?;
	}
	if overrides.session_id.is_some() {
		config = config.with_session_id(overrides.session_id);
	}

	config.validate()?;
	debug!(target = "facto.cli", endpoint = %config.endpoint, session_id = ?config.session_id, "resolved configuration");
	Ok(config)
}

fn load(path: &Path) -> Result<TransportConfig> {
	let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
		path: path.to_path_buf(),
		source,
	})?;
	serde_json::from_str(&raw).map_err(|source| CliError::ParseConfig {
		path: path.to_path_buf(),
		source,
	})
}
