//! Folds transport notices into the observable session state.
//!
//! [`SessionProjector`] is pure: it never touches the transport. [`submit`]
//! and [`apply`] return the payload that must be sent, if any, and the caller
//! performs the send and reports a failure back through [`send_failed`].
//!
//! [`submit`]: SessionProjector::submit
//! [`apply`]: SessionProjector::apply
//! [`send_failed`]: SessionProjector::send_failed

use std::fmt;

use facto_protocol::{FactCheckResult, Progress, ServerEnvelope};
use facto_runtime::TransportNotice;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const NOT_CONNECTED_MESSAGE: &str = "WebSocket is not connected. Please try again in a moment.";
pub const CONNECTION_LOST_MESSAGE: &str = "Connection to the fact-check service was lost. Reconnecting…";
pub const INVALID_MESSAGE: &str = "Invalid message from server";
pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a statement or URL to fact check.";

/// Where an error shown to the user came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
	/// The socket failed or closed; reconnection is under way.
	Transport,
	/// The server sent something this client cannot read.
	Protocol,
	/// The server reported a failure for the submitted job.
	Application,
	/// The client was used while it could not act, e.g. submitting offline.
	Usage,
}

/// An error as presented to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionError {
	pub kind: ErrorKind,
	pub message: String,
}

impl SessionError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}
}

impl fmt::Display for SessionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

/// Position of the current submission cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
	#[default]
	Idle,
	Submitted,
	Progressing,
	Completed,
	Failed,
}

impl Phase {
	/// Whether the cycle has ended with results or an application error.
	pub fn is_terminal(self) -> bool {
		matches!(self, Phase::Completed | Phase::Failed)
	}
}

/// Everything an observer of the session can see.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	pub connected: bool,
	pub session_id: Option<String>,
	/// The server announced `session_id` on the current channel.
	pub session_confirmed: bool,
	pub progress: Option<Progress>,
	pub results: Option<Vec<FactCheckResult>>,
	pub error: Option<SessionError>,
	pub phase: Phase,
}

/// State projection for one client session.
#[derive(Debug, Default)]
pub struct SessionProjector {
	snapshot: SessionSnapshot,
	/// Input held while the channel is down, replayed once on the next open.
	pending: Option<String>,
	/// A `complete` or `error` envelope already ended the current cycle.
	terminated: bool,
	/// A disconnect was already reported since the last open.
	loss_reported: bool,
}

impl SessionProjector {
	pub fn new(session_id: Option<String>) -> Self {
		Self {
			snapshot: SessionSnapshot {
				session_id,
				..SessionSnapshot::default()
			},
			..Self::default()
		}
	}

	pub fn snapshot(&self) -> &SessionSnapshot {
		&self.snapshot
	}

	pub fn pending(&self) -> Option<&str> {
		self.pending.as_deref()
	}

	/// Starts a new cycle for `input`.
	///
	/// Returns the payload to send now, or `None` when the input was rejected
	/// or parked until the channel opens.
	pub fn submit(&mut self, input: &str) -> Option<String> {
		self.snapshot.progress = None;
		self.snapshot.results = None;
		self.snapshot.error = None;
		self.terminated = false;

		if input.trim().is_empty() {
			self.snapshot.error = Some(SessionError::new(ErrorKind::Usage, EMPTY_INPUT_MESSAGE));
			self.snapshot.phase = Phase::Idle;
			return None;
		}
		self.snapshot.phase = Phase::Submitted;

		if !self.snapshot.connected {
			self.park(input.to_string());
			return None;
		}
		self.pending = None;
		Some(input.to_string())
	}

	/// Records that sending `payload` failed; it is replayed on the next open.
	pub fn send_failed(&mut self, payload: String) {
		self.park(payload);
	}

	fn park(&mut self, payload: String) {
		if let Some(previous) = self.pending.replace(payload) {
			debug!(target = "facto.session", %previous, "replacing pending submission");
		}
		self.snapshot.error = Some(SessionError::new(ErrorKind::Usage, NOT_CONNECTED_MESSAGE));
	}

	/// Folds one transport notice into the snapshot.
	///
	/// Returns a pending submission to replay now that the channel is open.
	pub fn apply(&mut self, notice: TransportNotice) -> Option<String> {
		match notice {
			TransportNotice::Opened { session_id } => return self.on_opened(session_id),
			TransportNotice::Disconnected { reason, attempt, .. } => {
				self.snapshot.connected = false;
				self.snapshot.session_confirmed = false;
				if !self.loss_reported && self.snapshot.error.is_none() && self.snapshot.results.is_none() {
					self.snapshot.error = Some(SessionError::new(ErrorKind::Transport, CONNECTION_LOST_MESSAGE));
				}
				self.loss_reported = true;
				debug!(target = "facto.session", %reason, attempt, "connection lost");
			}
			TransportNotice::Unreachable { reason } => {
				self.snapshot.connected = false;
				self.snapshot.session_confirmed = false;
				self.snapshot.error = Some(SessionError::new(
					ErrorKind::Transport,
					format!("Cannot reach the fact-check service: {reason}"),
				));
			}
			TransportNotice::ProtocolError { detail } => {
				warn!(target = "facto.session", %detail, "invalid message from server");
				if !self.shows(ErrorKind::Application) {
					self.snapshot.error = Some(SessionError::new(ErrorKind::Protocol, INVALID_MESSAGE));
				}
			}
			TransportNotice::Envelope(envelope) => self.on_envelope(envelope),
		}
		None
	}

	fn on_opened(&mut self, session_id: Option<String>) -> Option<String> {
		self.snapshot.connected = true;
		self.snapshot.session_confirmed = false;
		self.loss_reported = false;
		if session_id.is_some() {
			self.snapshot.session_id = session_id;
		}
		if self.shows(ErrorKind::Transport) || self.shows(ErrorKind::Usage) {
			self.snapshot.error = None;
		}

		let replay = self.pending.take();
		if let Some(input) = &replay {
			info!(target = "facto.session", %input, "replaying pending submission");
		}
		replay
	}

	fn on_envelope(&mut self, envelope: ServerEnvelope) {
		if envelope.is_terminal() && self.terminated {
			warn!(target = "facto.session", kind = envelope.kind(), "second terminal envelope in one cycle ignored");
			return;
		}
		match envelope {
			ServerEnvelope::Connection { client_id, .. } => {
				if self.snapshot.session_id.as_deref() != Some(client_id.as_str()) {
					info!(target = "facto.session", session_id = %client_id, "server assigned session id");
					self.snapshot.session_id = Some(client_id);
				}
				self.snapshot.session_confirmed = true;
			}
			ServerEnvelope::Progress(progress) => {
				debug!(target = "facto.session", stage = %progress.stage, "progress");
				self.snapshot.progress = Some(progress);
				if matches!(self.snapshot.phase, Phase::Submitted | Phase::Progressing) {
					self.snapshot.phase = Phase::Progressing;
				}
			}
			ServerEnvelope::Complete { results } => {
				info!(target = "facto.session", count = results.len(), "fact check complete");
				self.terminated = true;
				self.snapshot.results = Some(results);
				self.snapshot.progress = None;
				self.snapshot.error = None;
				self.snapshot.phase = Phase::Completed;
			}
			ServerEnvelope::Error { message } => {
				info!(target = "facto.session", %message, "fact check failed");
				self.terminated = true;
				self.snapshot.error = Some(SessionError::new(ErrorKind::Application, message));
				self.snapshot.progress = None;
				self.snapshot.phase = Phase::Failed;
			}
		}
	}

	fn shows(&self, kind: ErrorKind) -> bool {
		self.snapshot.error.as_ref().is_some_and(|error| error.kind == kind)
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use facto_protocol::{Probability, ProgressStage};

	fn opened(session_id: Option<&str>) -> TransportNotice {
		TransportNotice::Opened {
			session_id: session_id.map(str::to_string),
		}
	}

	fn disconnected() -> TransportNotice {
		TransportNotice::Disconnected {
			reason: "reset".into(),
			attempt: 1,
			retry_in: Duration::from_secs(1),
		}
	}

	fn progress(stage: ProgressStage) -> TransportNotice {
		TransportNotice::Envelope(ServerEnvelope::Progress(Progress::new(stage)))
	}

	fn result(statement: &str) -> FactCheckResult {
		FactCheckResult {
			statement: statement.into(),
			probability: Probability::High,
			reason: "Well documented.".into(),
			sources: vec!["https://example.org".into()],
		}
	}

	fn complete(results: Vec<FactCheckResult>) -> TransportNotice {
		TransportNotice::Envelope(ServerEnvelope::Complete { results })
	}

	fn app_error(message: &str) -> TransportNotice {
		TransportNotice::Envelope(ServerEnvelope::Error { message: message.into() })
	}

	fn connected() -> SessionProjector {
		let mut projector = SessionProjector::new(None);
		projector.apply(opened(None));
		projector
	}

	#[test]
	fn submit_while_open_sends_immediately() {
		let mut projector = connected();
		assert_eq!(projector.submit("The sky is blue."), Some("The sky is blue.".into()));
		assert_eq!(projector.snapshot().phase, Phase::Submitted);
		assert!(projector.pending().is_none());
	}

	#[test]
	fn submit_clears_previous_outcome() {
		let mut projector = connected();
		projector.submit("first");
		projector.apply(progress(ProgressStage::Extraction));
		projector.apply(complete(vec![result("first")]));
		assert!(projector.snapshot().results.is_some());

		projector.submit("second");
		let snapshot = projector.snapshot();
		assert!(snapshot.progress.is_none());
		assert!(snapshot.results.is_none());
		assert!(snapshot.error.is_none());
		assert_eq!(snapshot.phase, Phase::Submitted);
	}

	#[test]
	fn submit_after_failure_clears_application_error() {
		let mut projector = connected();
		projector.submit("first");
		projector.apply(app_error("Unsupported URL"));
		assert_eq!(projector.snapshot().phase, Phase::Failed);

		projector.submit("second");
		assert!(projector.snapshot().error.is_none());
	}

	#[test]
	fn empty_input_is_rejected() {
		let mut projector = connected();
		assert_eq!(projector.submit("   \n"), None);
		let error = projector.snapshot().error.clone().unwrap();
		assert_eq!(error.kind, ErrorKind::Usage);
		assert_eq!(projector.snapshot().phase, Phase::Idle);
		assert!(projector.pending().is_none());
	}

	#[test]
	fn empty_input_after_complete_clears_results() {
		let mut projector = connected();
		projector.submit("first");
		projector.apply(complete(vec![result("first")]));

		assert_eq!(projector.submit("   "), None);
		let snapshot = projector.snapshot();
		assert!(snapshot.results.is_none());
		assert!(snapshot.progress.is_none());
		assert_eq!(snapshot.phase, Phase::Idle);
		assert_eq!(snapshot.error, Some(SessionError::new(ErrorKind::Usage, EMPTY_INPUT_MESSAGE)));
	}

	#[test]
	fn submit_while_disconnected_parks_and_replays_once() {
		let mut projector = SessionProjector::new(None);
		assert_eq!(projector.submit("The sky is blue."), None);
		assert_eq!(
			projector.snapshot().error,
			Some(SessionError::new(ErrorKind::Usage, NOT_CONNECTED_MESSAGE))
		);

		assert_eq!(projector.apply(opened(None)), Some("The sky is blue.".into()));
		assert!(projector.snapshot().error.is_none());
		assert!(projector.snapshot().connected);

		projector.apply(disconnected());
		assert_eq!(projector.apply(opened(None)), None);
	}

	#[test]
	fn newer_pending_submission_replaces_older() {
		let mut projector = SessionProjector::new(None);
		projector.submit("old");
		projector.submit("new");
		assert_eq!(projector.apply(opened(None)), Some("new".into()));
	}

	#[test]
	fn failed_send_is_parked() {
		let mut projector = connected();
		let payload = projector.submit("The sky is blue.").unwrap();
		projector.send_failed(payload);
		assert_eq!(projector.pending(), Some("The sky is blue."));
		assert_eq!(projector.snapshot().error.as_ref().map(|e| e.kind), Some(ErrorKind::Usage));

		projector.apply(disconnected());
		assert_eq!(projector.apply(opened(None)), Some("The sky is blue.".into()));
	}

	#[test]
	fn full_cycle_ends_with_results_and_no_progress() {
		let mut projector = connected();
		projector.submit("The sky is blue. Water is dry.");
		projector.apply(progress(ProgressStage::Extraction));
		assert_eq!(projector.snapshot().phase, Phase::Progressing);

		let verification = Progress::new(ProgressStage::Verification).with_position(1, 2);
		projector.apply(TransportNotice::Envelope(ServerEnvelope::Progress(verification.clone())));
		assert_eq!(projector.snapshot().progress, Some(verification));

		let results = vec![result("The sky is blue."), result("Water is dry.")];
		projector.apply(complete(results.clone()));
		let snapshot = projector.snapshot();
		assert_eq!(snapshot.results, Some(results));
		assert!(snapshot.progress.is_none());
		assert_eq!(snapshot.phase, Phase::Completed);
	}

	#[test]
	fn empty_result_set_completes() {
		let mut projector = connected();
		projector.submit("hmm");
		projector.apply(complete(Vec::new()));
		assert_eq!(projector.snapshot().results, Some(Vec::new()));
		assert_eq!(projector.snapshot().phase, Phase::Completed);
	}

	#[test]
	fn application_error_ends_cycle() {
		let mut projector = connected();
		projector.submit("https://youtube.com/watch?v=x");
		projector.apply(progress(ProgressStage::VideoProcessing));
		projector.apply(app_error("Could not fetch the video"));

		let snapshot = projector.snapshot();
		assert!(snapshot.progress.is_none());
		assert_eq!(snapshot.phase, Phase::Failed);
		assert_eq!(
			snapshot.error,
			Some(SessionError::new(ErrorKind::Application, "Could not fetch the video"))
		);
	}

	#[test]
	fn second_terminal_envelope_is_ignored() {
		let mut projector = connected();
		projector.submit("x");
		projector.apply(complete(vec![result("x")]));
		projector.apply(app_error("late"));
		projector.apply(complete(Vec::new()));

		let snapshot = projector.snapshot();
		assert_eq!(snapshot.results, Some(vec![result("x")]));
		assert!(snapshot.error.is_none());
		assert_eq!(snapshot.phase, Phase::Completed);
	}

	#[test]
	fn progress_in_any_stage_order_is_recorded() {
		let mut projector = connected();
		projector.submit("x");
		for stage in [ProgressStage::Verification, ProgressStage::Started, ProgressStage::Extraction] {
			projector.apply(progress(stage));
			assert_eq!(projector.snapshot().progress.as_ref().map(|p| p.stage), Some(stage));
		}
	}

	#[test]
	fn progress_without_submission_keeps_phase() {
		let mut projector = connected();
		projector.apply(progress(ProgressStage::Extraction));
		assert_eq!(projector.snapshot().phase, Phase::Idle);
		assert!(projector.snapshot().progress.is_some());
	}

	#[test]
	fn protocol_error_keeps_connection_flag() {
		let mut projector = connected();
		projector.apply(TransportNotice::ProtocolError {
			detail: "frame is not valid JSON".into(),
		});
		let snapshot = projector.snapshot();
		assert!(snapshot.connected);
		assert_eq!(snapshot.error, Some(SessionError::new(ErrorKind::Protocol, INVALID_MESSAGE)));

		let mut offline = SessionProjector::new(None);
		offline.apply(TransportNotice::ProtocolError { detail: "x".into() });
		assert!(!offline.snapshot().connected);
		assert!(!offline.snapshot().error.as_ref().unwrap().message.is_empty());
	}

	#[test]
	fn protocol_error_does_not_mask_application_error() {
		let mut projector = connected();
		projector.submit("x");
		projector.apply(app_error("Unsupported URL"));
		projector.apply(TransportNotice::ProtocolError { detail: "x".into() });
		assert_eq!(projector.snapshot().error.as_ref().map(|e| e.kind), Some(ErrorKind::Application));
	}

	#[test]
	fn loss_is_reported_once_per_streak() {
		let mut projector = connected();
		projector.apply(disconnected());
		let snapshot = projector.snapshot();
		assert!(!snapshot.connected);
		assert_eq!(snapshot.error.as_ref().map(|e| e.kind), Some(ErrorKind::Transport));

		// cleared on reopen, reported again on the next streak
		projector.apply(opened(None));
		assert!(projector.snapshot().error.is_none());
		projector.apply(disconnected());
		assert_eq!(projector.snapshot().error.as_ref().map(|e| e.kind), Some(ErrorKind::Transport));
	}

	#[test]
	fn loss_does_not_hide_results_or_errors() {
		let mut projector = connected();
		projector.submit("x");
		projector.apply(complete(vec![result("x")]));
		projector.apply(disconnected());
		assert!(projector.snapshot().error.is_none());
		assert!(projector.snapshot().results.is_some());

		let mut failed = connected();
		failed.submit("x");
		failed.apply(app_error("boom"));
		failed.apply(disconnected());
		assert_eq!(failed.snapshot().error.as_ref().map(|e| e.kind), Some(ErrorKind::Application));
	}

	#[test]
	fn loss_keeps_progress() {
		let mut projector = connected();
		projector.submit("x");
		projector.apply(progress(ProgressStage::Extraction));
		projector.apply(disconnected());
		assert!(projector.snapshot().progress.is_some());
		assert_eq!(projector.snapshot().phase, Phase::Progressing);
	}

	#[test]
	fn open_keeps_application_and_protocol_errors() {
		let mut projector = connected();
		projector.submit("x");
		projector.apply(app_error("boom"));
		projector.apply(disconnected());
		projector.apply(opened(None));
		assert_eq!(projector.snapshot().error.as_ref().map(|e| e.kind), Some(ErrorKind::Application));
	}

	#[test]
	fn server_session_id_is_adopted() {
		let mut projector = SessionProjector::new(Some("client-guess".into()));
		projector.apply(opened(Some("client-guess")));
		projector.apply(TransportNotice::Envelope(ServerEnvelope::Connection {
			client_id: "srv-1".into(),
			message: None,
		}));
		assert_eq!(projector.snapshot().session_id.as_deref(), Some("srv-1"));
		assert_eq!(projector.snapshot().phase, Phase::Idle);
	}

	#[test]
	fn session_is_confirmed_per_channel() {
		let mut projector = SessionProjector::new(Some("client-guess".into()));
		projector.apply(opened(Some("client-guess")));
		assert!(!projector.snapshot().session_confirmed);

		projector.apply(TransportNotice::Envelope(ServerEnvelope::Connection {
			client_id: "client-guess".into(),
			message: None,
		}));
		assert!(projector.snapshot().session_confirmed);

		projector.apply(disconnected());
		assert!(!projector.snapshot().session_confirmed);
		projector.apply(opened(Some("client-guess")));
		assert!(!projector.snapshot().session_confirmed);
		assert_eq!(projector.snapshot().session_id.as_deref(), Some("client-guess"));
	}

	#[test]
	fn snapshot_serializes_for_observers() {
		let mut projector = connected();
		projector.submit("x");
		projector.apply(app_error("boom"));
		let value = serde_json::to_value(projector.snapshot()).unwrap();
		assert_eq!(value["phase"], "failed");
		assert_eq!(value["error"]["kind"], "application");
		assert_eq!(value["sessionId"], serde_json::Value::Null);
	}
}
