use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use facto_cli::{cli::Cli, commands, logging};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	match commands::dispatch(cli).await {
		Ok(code) => code,
		Err(err) => {
			error!(target = "facto.cli", error = %err, "command failed");
			eprintln!("{} {err:#}", "error:".red().bold());
			ExitCode::FAILURE
		}
	}
}
