//! Progress payloads streamed while a fact-check job runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage reported by a `progress` envelope.
///
/// The server emits these roughly in declaration order, but nothing on the
/// wire guarantees it; consumers must accept any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStage {
	#[serde(rename = "started")]
	Started,
	/// Only emitted for TikTok / Instagram URLs.
	#[serde(rename = "video-processing")]
	VideoProcessing,
	#[serde(rename = "extraction")]
	Extraction,
	#[serde(rename = "extraction_complete")]
	ExtractionComplete,
	#[serde(rename = "verification")]
	Verification,
}

impl ProgressStage {
	/// Returns the wire spelling of this stage.
	pub fn as_str(self) -> &'static str {
		match self {
			ProgressStage::Started => "started",
			ProgressStage::VideoProcessing => "video-processing",
			ProgressStage::Extraction => "extraction",
			ProgressStage::ExtractionComplete => "extraction_complete",
			ProgressStage::Verification => "verification",
		}
	}
}

impl fmt::Display for ProgressStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Snapshot of job advancement carried by one `progress` envelope.
///
/// A new envelope replaces the previous snapshot wholesale; fields absent
/// from the envelope are absent from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
	pub stage: ProgressStage,
	/// Zero-based index of the statement under verification.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub statement_index: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub total_statements: Option<u32>,
	/// Extracted statements, sent with [`ProgressStage::ExtractionComplete`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub statements: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub current_statement: Option<String>,
}

impl Progress {
	/// Creates a snapshot carrying only a stage.
	pub fn new(stage: ProgressStage) -> Self {
		Self {
			stage,
			statement_index: None,
			total_statements: None,
			statements: None,
			current_statement: None,
		}
	}

	/// Sets the verification position (`index` of `total`).
	pub fn with_position(mut self, index: u32, total: u32) -> Self {
		self.statement_index = Some(index);
		self.total_statements = Some(total);
		self
	}

	/// Sets the extracted statement list.
	pub fn with_statements(mut self, statements: Vec<String>) -> Self {
		self.total_statements = Some(statements.len() as u32);
		self.statements = Some(statements);
		self
	}

	/// Best known statement count, from `totalStatements` or the statement list.
	pub fn statement_count(&self) -> Option<u32> {
		self.total_statements
			.or_else(|| self.statements.as_ref().map(|s| s.len() as u32))
	}
}
