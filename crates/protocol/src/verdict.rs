//! Terminal fact-check results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Likelihood that a statement is true, as judged by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Probability {
	High,
	Low,
	Uncertain,
}

impl Probability {
	pub fn as_str(self) -> &'static str {
		match self {
			Probability::High => "high",
			Probability::Low => "low",
			Probability::Uncertain => "uncertain",
		}
	}
}

impl fmt::Display for Probability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Verdict for one extracted statement.
///
/// `sources` is in display order and may be empty or contain duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactCheckResult {
	pub statement: String,
	pub probability: Probability,
	pub reason: String,
	#[serde(default)]
	pub sources: Vec<String>,
}
