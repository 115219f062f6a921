//! Submit one statement or URL and render the outcome.

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use facto::{ClientError, FactCheckClient, Phase, SessionSnapshot, TransportConfig};
use tracing::info;

use crate::error::{CliError, Result};
use crate::output::{OutputFormat, ProgressPrinter, write_failure, write_json, write_results};
use crate::steps::InputMode;

pub async fn execute(config: TransportConfig, input: &str, format: OutputFormat, timeout_secs: Option<u64>) -> Result<ExitCode> {
	if input.trim().is_empty() {
		return Err(CliError::EmptyInput);
	}
	info!(target = "facto.cli", endpoint = %config.endpoint, mode = ?InputMode::detect(input), "check");

	let client = FactCheckClient::connect(config)?;
	let outcome = run(
		&client,
		input,
		format,
		timeout_secs.map(Duration::from_secs),
		&mut std::io::stdout(),
		&mut std::io::stderr(),
	)
	.await;
	client.shutdown().await;

	Ok(match outcome?.phase {
		Phase::Completed => ExitCode::SUCCESS,
		_ => ExitCode::FAILURE,
	})
}

/// Submits `input`, prints progress to `progress` until the cycle ends, then
/// renders the outcome. Results go to `out`; failures in text mode go to
/// `progress`.
pub async fn run(
	client: &FactCheckClient,
	input: &str,
	format: OutputFormat,
	timeout: Option<Duration>,
	out: &mut impl Write,
	progress: &mut impl Write,
) -> Result<SessionSnapshot> {
	let mut state = client.subscribe();
	client.submit(input).await?;

	let mut printer = ProgressPrinter::new(InputMode::detect(input));
	let wait = async {
		loop {
			let snapshot = state.borrow_and_update().clone();
			if format == OutputFormat::Text {
				printer.observe(&snapshot, progress)?;
			}
			if snapshot.phase.is_terminal() {
				return Ok::<_, CliError>(snapshot);
			}
			state.changed().await.map_err(|_| ClientError::ShutDown)?;
		}
	};

	let outcome = match timeout {
		Some(limit) => tokio::time::timeout(limit, wait)
			.await
			.map_err(|_| CliError::Timeout { secs: limit.as_secs() })??,
		None => wait.await?,
	};

	match format {
		OutputFormat::Json => write_json(&outcome, out)?,
		OutputFormat::Text => match (&outcome.results, &outcome.error) {
			(Some(results), _) => write_results(results, out)?,
			(None, Some(error)) => write_failure(error, progress)?,
			(None, None) => {}
		},
	}
	Ok(outcome)
}
