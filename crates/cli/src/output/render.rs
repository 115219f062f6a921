use std::io::Write;

use colored::{ColoredString, Colorize};
use facto::{ErrorKind, FactCheckResult, Probability, SessionError, SessionSnapshot};

use crate::error::Result;
use crate::steps::{InputMode, StepPlan};

pub const NO_STATEMENTS_MESSAGE: &str = "No statements determined, please try again.";

/// Prints a line whenever the current step changes.
#[derive(Debug)]
pub struct ProgressPrinter {
	mode: InputMode,
	statements: u32,
	last_step: Option<(usize, usize)>,
	last_error: Option<SessionError>,
}

impl ProgressPrinter {
	pub fn new(mode: InputMode) -> Self {
		Self {
			mode,
			statements: 0,
			last_step: None,
			last_error: None,
		}
	}

	pub fn observe(&mut self, snapshot: &SessionSnapshot, out: &mut impl Write) -> std::io::Result<()> {
		if snapshot.error != self.last_error {
			self.last_error = snapshot.error.clone();
			if let Some(error) = &snapshot.error {
				// usage errors clear themselves once the pending submission is replayed
				if matches!(error.kind, ErrorKind::Transport | ErrorKind::Protocol) {
					writeln!(out, "{} {}", "warning:".yellow().bold(), error.message)?;
				}
			}
		}

		let Some(progress) = &snapshot.progress else {
			return Ok(());
		};
		self.statements = self.statements.max(progress.statement_count().unwrap_or(0));

		let plan = StepPlan::derive(self.mode, Some(progress), self.statements);
		let step = (plan.current, plan.labels.len());
		if self.last_step == Some(step) {
			return Ok(());
		}
		self.last_step = Some(step);

		let position = format!("[{}/{}]", plan.current + 1, plan.labels.len());
		writeln!(out, "{} {}", position.dimmed(), plan.current_label().bold())?;
		if let Some(statement) = &progress.current_statement {
			writeln!(out, "      {}", statement.italic())?;
		}
		Ok(())
	}
}

fn badge(probability: Probability) -> ColoredString {
	match probability {
		Probability::High => "High probability of truth".green().bold(),
		Probability::Uncertain => "Uncertain".yellow().bold(),
		Probability::Low => "Low probability of truth".red().bold(),
	}
}

/// Writes one card per result, in server order.
pub fn write_results(results: &[FactCheckResult], out: &mut impl Write) -> std::io::Result<()> {
	if results.is_empty() {
		return writeln!(out, "{NO_STATEMENTS_MESSAGE}");
	}

	for (i, result) in results.iter().enumerate() {
		if i > 0 {
			writeln!(out)?;
		}
		writeln!(out, "{}  {}", badge(result.probability), format!("{}+ Sources", result.sources.len()).dimmed())?;
		writeln!(out, "  {}", result.statement.bold())?;
		writeln!(out, "  {}", result.reason)?;
		for source in &result.sources {
			writeln!(out, "    - {}", source.underline())?;
		}
	}
	Ok(())
}

pub fn write_failure(error: &SessionError, out: &mut impl Write) -> std::io::Result<()> {
	writeln!(out, "{} {}", "error:".red().bold(), error.message)
}

/// Writes the final snapshot as pretty JSON.
pub fn write_json(snapshot: &SessionSnapshot, out: &mut impl Write) -> Result<()> {
	serde_json::to_writer_pretty(&mut *out, snapshot)?;
	writeln!(out)?;
	Ok(())
}
