pub mod check;
mod connect;

use std::process::ExitCode;

use anyhow::Context;

use crate::cli::{Cli, Commands};
use crate::config;

pub async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
	let overrides = cli.overrides();
	let config = config::resolve(cli.config.as_deref(), overrides).context("invalid configuration")?;

	let code = match cli.command {
		Commands::Check { input, format, timeout } => check::execute(config, &input, format, timeout).await?,
		Commands::Connect { timeout } => connect::execute(config, timeout).await?,
	};
	Ok(code)
}
