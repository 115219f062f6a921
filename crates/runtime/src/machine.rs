//! Pure connection state machine for the transport session.
//!
//! [`TransportMachine::handle_event`] is the single entry point: it consumes
//! one [`TransportEvent`] and returns the [`Effect`]s the driver must carry
//! out. The machine performs no I/O and owns no sockets or timers; it only
//! decides. Sockets are identified by a generation number and reconnect timers
//! by a timer id, so events from superseded sockets or timers are recognised
//! and dropped here rather than racing the current attempt.

use std::time::Duration;

use facto_protocol::{ServerEnvelope, decode_envelope};
use tracing::{debug, info, warn};
use url::Url;

use crate::address::channel_url;
use crate::config::TransportConfig;
use crate::error::Result;

/// Lifecycle of the underlying channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	/// No socket; a reconnect may be pending.
	Disconnected,
	Connecting,
	Open,
	/// Torn down with `close()`; terminal.
	Closed,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
	/// Caller requested a (re)connect.
	Connect,
	/// Socket `generation` completed its handshake.
	Opened { generation: u64 },
	/// Text frame received on socket `generation`.
	Frame { generation: u64, text: String },
	/// Non-text payload received on socket `generation`.
	UnreadableFrame { generation: u64, detail: String },
	/// Socket `generation` closed or failed to open without being asked to.
	Closed { generation: u64, reason: Option<String> },
	/// Reconnect timer `timer` fired.
	ReconnectDue { timer: u64 },
	/// Caller requested teardown.
	Shutdown,
}

/// Instructions for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
	OpenSocket { generation: u64, url: Url },
	CloseSocket { generation: u64 },
	ScheduleReconnect { timer: u64, delay: Duration },
	CancelReconnect { timer: u64 },
	Notify(TransportNotice),
	/// Stop processing events; nothing may run afterwards.
	Stop,
}

/// What the transport reports to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportNotice {
	/// The channel is open; `session_id` is the id used in the address.
	Opened { session_id: Option<String> },
	/// The channel dropped without a local `close()`; a reconnect is scheduled.
	Disconnected {
		reason: String,
		/// Consecutive unclean closures since the last open, including this one.
		attempt: u32,
		retry_in: Duration,
	},
	/// The endpoint could not be turned into a channel address.
	Unreachable { reason: String },
	Envelope(ServerEnvelope),
	/// An inbound frame could not be decoded; the channel stays open.
	ProtocolError { detail: String },
}

/// Connection state machine for a single logical channel.
#[derive(Debug)]
pub struct TransportMachine {
	config: TransportConfig,
	state: ConnectionState,
	session_id: Option<String>,
	attempt: u32,
	generation: u64,
	timer: Option<u64>,
	next_timer: u64,
	identity_seen: bool,
}

impl TransportMachine {
	/// Creates a machine after validating `config`.
	pub fn new(config: TransportConfig) -> Result<Self> {
		config.validate()?;
		let session_id = config.session_id.clone();
		Ok(Self {
			config,
			state: ConnectionState::Disconnected,
			session_id,
			attempt: 0,
			generation: 0,
			timer: None,
			next_timer: 0,
			identity_seen: false,
		})
	}

	pub fn state(&self) -> ConnectionState {
		self.state
	}

	pub fn is_open(&self) -> bool {
		self.state == ConnectionState::Open
	}

	pub fn session_id(&self) -> Option<&str> {
		self.session_id.as_deref()
	}

	/// Consecutive unclean closures since the last successful open.
	pub fn attempt(&self) -> u32 {
		self.attempt
	}

	/// Generation of the current (or most recent) socket attempt.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Id of the pending reconnect timer, if any.
	pub fn pending_timer(&self) -> Option<u64> {
		self.timer
	}

	/// Address the next attempt will use.
	pub fn channel_url(&self) -> Result<Url> {
		channel_url(&self.config.endpoint, self.session_id.as_deref())
	}

	/// Applies one event and returns the effects to execute, in order.
	pub fn handle_event(&mut self, event: TransportEvent) -> Vec<Effect> {
		if self.state == ConnectionState::Closed {
			debug!(target = "facto.transport", ?event, "event after close ignored");
			return Vec::new();
		}

		match event {
			TransportEvent::Connect => self.start_attempt(),
			TransportEvent::Opened { generation } => self.on_opened(generation),
			TransportEvent::Frame { generation, text } => self.on_frame(generation, &text),
			TransportEvent::UnreadableFrame { generation, detail } => {
				if !self.is_current(generation) || !self.is_open() {
					return Vec::new();
				}
				warn!(target = "facto.transport", %detail, "unreadable frame");
				vec![Effect::Notify(TransportNotice::ProtocolError { detail })]
			}
			TransportEvent::Closed { generation, reason } => self.on_unclean_close(generation, reason),
			TransportEvent::ReconnectDue { timer } => {
				if self.timer != Some(timer) {
					debug!(target = "facto.transport", timer, "stale reconnect timer ignored");
					return Vec::new();
				}
				self.timer = None;
				self.start_attempt()
			}
			TransportEvent::Shutdown => self.shutdown(),
		}
	}

	fn is_current(&self, generation: u64) -> bool {
		generation == self.generation
	}

	fn has_socket(&self) -> bool {
		matches!(self.state, ConnectionState::Connecting | ConnectionState::Open)
	}

	fn start_attempt(&mut self) -> Vec<Effect> {
		let mut effects = Vec::new();
		if let Some(timer) = self.timer.take() {
			effects.push(Effect::CancelReconnect { timer });
		}
		if self.has_socket() {
			effects.push(Effect::CloseSocket { generation: self.generation });
		}

		let url = match self.channel_url() {
			Ok(url) => url,
			Err(err) => {
				warn!(target = "facto.transport", error = %err, "cannot derive channel address");
				self.state = ConnectionState::Disconnected;
				effects.push(Effect::Notify(TransportNotice::Unreachable { reason: err.to_string() }));
				return effects;
			}
		};

		self.generation += 1;
		self.state = ConnectionState::Connecting;
		self.identity_seen = false;
		debug!(target = "facto.transport", generation = self.generation, %url, attempt = self.attempt, "connecting");
		effects.push(Effect::OpenSocket {
			generation: self.generation,
			url,
		});
		effects
	}

	fn on_opened(&mut self, generation: u64) -> Vec<Effect> {
		if !self.is_current(generation) || self.state != ConnectionState::Connecting {
			debug!(target = "facto.transport", generation, "superseded socket opened");
			return Vec::new();
		}

		self.state = ConnectionState::Open;
		self.attempt = 0;
		info!(target = "facto.transport", generation, session_id = ?self.session_id, "channel open");
		vec![Effect::Notify(TransportNotice::Opened {
			session_id: self.session_id.clone(),
		})]
	}

	fn on_frame(&mut self, generation: u64, text: &str) -> Vec<Effect> {
		if !self.is_current(generation) || !self.is_open() {
			debug!(target = "facto.transport", generation, "frame from superseded socket dropped");
			return Vec::new();
		}

		let envelope = match decode_envelope(text) {
			Ok(envelope) => envelope,
			Err(err) => {
				warn!(target = "facto.transport", error = %err, "undecodable frame");
				return vec![Effect::Notify(TransportNotice::ProtocolError { detail: err.to_string() })];
			}
		};

		if let ServerEnvelope::Connection { client_id, .. } = &envelope {
			if !self.adopt_session_id(client_id) {
				return Vec::new();
			}
		}

		vec![Effect::Notify(TransportNotice::Envelope(envelope))]
	}

	/// Returns `false` when the envelope must be dropped.
	fn adopt_session_id(&mut self, client_id: &str) -> bool {
		let differs = self.session_id.as_deref() != Some(client_id);
		if self.identity_seen && differs {
			warn!(
				target = "facto.transport",
				current = ?self.session_id,
				offered = %client_id,
				"server tried to reassign session id mid-connection; ignored"
			);
			return false;
		}

		self.identity_seen = true;
		if differs {
			info!(target = "facto.transport", previous = ?self.session_id, session_id = %client_id, "adopting server session id");
			self.session_id = Some(client_id.to_string());
		}
		true
	}

	fn on_unclean_close(&mut self, generation: u64, reason: Option<String>) -> Vec<Effect> {
		if !self.is_current(generation) || !self.has_socket() {
			debug!(target = "facto.transport", generation, "close of superseded socket ignored");
			return Vec::new();
		}

		let reason = reason.unwrap_or_else(|| "connection closed by server".to_string());
		let delay = self.config.reconnect.delay(self.attempt);
		self.attempt = self.attempt.saturating_add(1);
		self.state = ConnectionState::Disconnected;

		let mut effects = vec![Effect::CloseSocket { generation }];
		if let Some(timer) = self.timer.take() {
			effects.push(Effect::CancelReconnect { timer });
		}
		self.next_timer += 1;
		let timer = self.next_timer;
		self.timer = Some(timer);

		warn!(
			target = "facto.transport",
			generation,
			%reason,
			attempt = self.attempt,
			retry_in_ms = delay.as_millis() as u64,
			"channel lost; reconnect scheduled"
		);
		effects.push(Effect::ScheduleReconnect { timer, delay });
		effects.push(Effect::Notify(TransportNotice::Disconnected {
			reason,
			attempt: self.attempt,
			retry_in: delay,
		}));
		effects
	}

	fn shutdown(&mut self) -> Vec<Effect> {
		let mut effects = Vec::new();
		if let Some(timer) = self.timer.take() {
			effects.push(Effect::CancelReconnect { timer });
		}
		if self.has_socket() {
			effects.push(Effect::CloseSocket { generation: self.generation });
		}
		self.state = ConnectionState::Closed;
		debug!(target = "facto.transport", "transport closed");
		effects.push(Effect::Stop);
		effects
	}
}
