use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Overrides;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "facto")]
#[command(about = "Fact-check statements and videos from the command line")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON file with transport settings (endpoint, sessionId, reconnect)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Base URL of the fact-check service
	#[arg(long, global = true, env = "FACTO_BACKEND_HOST", value_name = "URL")]
	pub endpoint: Option<String>,

	/// Session id to propose to the server
	#[arg(long, global = true, env = "FACTO_SESSION_ID", value_name = "ID")]
	pub session_id: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

impl Cli {
	pub fn overrides(&self) -> Overrides {
		Overrides {
			endpoint: self.endpoint.clone(),
			session_id: self.session_id.clone(),
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Fact check a statement or a video URL
	Check {
		/// Statement text, or an http(s) link to a video
		input: String,

		/// Result format
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Give up after this many seconds
		#[arg(long, value_name = "SECS")]
		timeout: Option<u64>,
	},

	/// Open a session and print the id the server assigns
	Connect {
		/// Give up after this many seconds
		#[arg(long, value_name = "SECS", default_value = "10")]
		timeout: u64,
	},
}
