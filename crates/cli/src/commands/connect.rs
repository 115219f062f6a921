//! Open a session and report the id the server assigns.

use std::process::ExitCode;
use std::time::Duration;

use facto::{FactCheckClient, TransportConfig};
use tracing::info;

use crate::error::{CliError, Result};

pub async fn execute(config: TransportConfig, timeout_secs: u64) -> Result<ExitCode> {
	info!(target = "facto.cli", endpoint = %config.endpoint, "connect");
	let client = FactCheckClient::connect(config)?;

	let waited = tokio::time::timeout(Duration::from_secs(timeout_secs), client.wait_for_session_id()).await;
	client.shutdown().await;

	let session_id = waited.map_err(|_| CliError::Timeout { secs: timeout_secs })??;
	println!("{session_id}");
	Ok(ExitCode::SUCCESS)
}
