//! Step labels shown while a fact check is running.

use facto::{Progress, ProgressStage};
use url::Url;

/// What the user submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
	/// An http(s) link, typically a video.
	Url,
	/// Free text containing one or more statements.
	Text,
}

impl InputMode {
	pub fn detect(input: &str) -> Self {
		match Url::parse(input.trim()) {
			Ok(url) if matches!(url.scheme(), "http" | "https") => InputMode::Url,
			_ => InputMode::Text,
		}
	}
}

/// Most per-statement steps listed; the service checks far fewer per job.
pub const MAX_LISTED_STATEMENTS: u32 = 50;

/// Ordered step labels plus the index of the step in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
	pub labels: Vec<String>,
	pub current: usize,
}

impl StepPlan {
	/// Derives the plan for `mode` from the latest progress and the number of
	/// statements known so far.
	pub fn derive(mode: InputMode, progress: Option<&Progress>, statements: u32) -> Self {
		let mut labels: Vec<String> = match mode {
			InputMode::Url => vec!["Fetch video data".into(), "Extract all statements".into()],
			InputMode::Text => vec!["Extract your statement".into(), "AI fact check all statements".into()],
		};
		let fixed = labels.len();
		if mode == InputMode::Url || statements > 1 {
			let listed = statements.min(MAX_LISTED_STATEMENTS);
			labels.extend((1..=listed).map(|i| format!("Fact check statement {i} of {statements}")));
		}

		let last = labels.len() - 1;
		let current = match progress {
			None => 0,
			Some(progress) => match progress.stage {
				ProgressStage::Started | ProgressStage::VideoProcessing => 0,
				ProgressStage::Extraction => 1,
				ProgressStage::ExtractionComplete => fixed.min(last),
				ProgressStage::Verification => {
					let index = progress.statement_index.unwrap_or(0) as usize;
					(fixed + index).min(last)
				}
			},
		};

		Self { labels, current }
	}

	pub fn current_label(&self) -> &str {
		&self.labels[self.current]
	}
}
