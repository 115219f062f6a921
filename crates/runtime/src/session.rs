//! Transport session actor and its handle.
//!
//! [`TransportSession`] runs as a single tokio task that owns the
//! [`TransportMachine`], the one live socket writer, the socket's reader task
//! and the one reconnect timer. Commands from [`TransportHandle`]s, socket
//! events and timer expiry are handled one at a time, so the machine is never
//! touched concurrently. Consumers observe the session through the
//! [`TransportNotice`] channel returned by [`TransportSession::spawn`].

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use facto_protocol::ClientRequest;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tracing::{debug, warn};
use url::Url;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::machine::{ConnectionState, Effect, TransportEvent, TransportMachine, TransportNotice};
use crate::transport::{Connector, InboundFrame, Transport, TransportParts};

/// Upper bound on waiting for a close handshake during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Point-in-time view of a transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportStatus {
	pub state: ConnectionState,
	pub session_id: Option<String>,
	pub reconnect_attempt: u32,
}

enum Command {
	Connect,
	Send { payload: String, reply: oneshot::Sender<Result<()>> },
	Status { reply: oneshot::Sender<TransportStatus> },
	Close { reply: oneshot::Sender<()> },
}

enum SocketEvent {
	Opened { generation: u64, writer: Box<dyn Transport> },
	Frame { generation: u64, frame: InboundFrame },
	Closed { generation: u64, reason: Option<String> },
}

/// Cloneable handle to a running [`TransportSession`].
#[derive(Clone)]
pub struct TransportHandle {
	tx: mpsc::UnboundedSender<Command>,
}

impl TransportHandle {
	/// Starts a new connection attempt, replacing any existing socket and
	/// cancelling any pending reconnect.
	pub fn connect(&self) -> Result<()> {
		self.tx.send(Command::Connect).map_err(|_| TransportError::Closed)
	}

	/// Sends `{ "data": payload }` if the channel is open.
	///
	/// Fails with [`TransportError::NotConnected`] otherwise; nothing is queued.
	pub async fn send(&self, payload: impl Into<String>) -> Result<()> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(Command::Send {
				payload: payload.into(),
				reply,
			})
			.map_err(|_| TransportError::Closed)?;
		rx.await.map_err(|_| TransportError::Closed)?
	}

	/// Current connection state and session id.
	pub async fn status(&self) -> Result<TransportStatus> {
		let (reply, rx) = oneshot::channel();
		self.tx.send(Command::Status { reply }).map_err(|_| TransportError::Closed)?;
		rx.await.map_err(|_| TransportError::Closed)
	}

	/// Tears the session down: closes the socket, cancels any reconnect and
	/// stops the actor. Closing an already closed session is a no-op.
	pub async fn close(&self) {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(Command::Close { reply }).is_ok() {
			let _ = rx.await;
		}
	}
}

/// Single-task owner of the connection lifecycle.
pub struct TransportSession {
	machine: TransportMachine,
	connector: Arc<dyn Connector>,
	writer: Option<(u64, Box<dyn Transport>)>,
	reader: Option<(u64, JoinHandle<()>)>,
	timer: Option<(u64, Pin<Box<Sleep>>)>,
	commands: mpsc::UnboundedReceiver<Command>,
	socket_tx: mpsc::UnboundedSender<SocketEvent>,
	socket_rx: mpsc::UnboundedReceiver<SocketEvent>,
	notices: mpsc::UnboundedSender<TransportNotice>,
	stopped: bool,
}

impl TransportSession {
	/// Validates `config`, spawns the actor and returns its handle plus the
	/// notice stream. The session stays idle until [`TransportHandle::connect`].
	pub fn spawn(
		config: TransportConfig,
		connector: Arc<dyn Connector>,
	) -> Result<(TransportHandle, mpsc::UnboundedReceiver<TransportNotice>)> {
		let machine = TransportMachine::new(config)?;
		let (tx, commands) = mpsc::unbounded_channel();
		let (socket_tx, socket_rx) = mpsc::unbounded_channel();
		let (notices, notice_rx) = mpsc::unbounded_channel();

		let session = Self {
			machine,
			connector,
			writer: None,
			reader: None,
			timer: None,
			commands,
			socket_tx,
			socket_rx,
			notices,
			stopped: false,
		};
		tokio::spawn(session.run());

		Ok((TransportHandle { tx }, notice_rx))
	}

	async fn run(mut self) {
		debug!(target = "facto.transport", "transport session started");

		while !self.stopped {
			tokio::select! {
				command = self.commands.recv() => match command {
					Some(command) => self.handle_command(command).await,
					None => {
						debug!(target = "facto.transport", "all handles dropped, shutting down");
						self.dispatch(TransportEvent::Shutdown).await;
					}
				},
				Some(event) = self.socket_rx.recv() => self.handle_socket_event(event).await,
				timer = fire(&mut self.timer) => {
					self.timer = None;
					self.dispatch(TransportEvent::ReconnectDue { timer }).await;
				}
			}
		}

		self.teardown();
		debug!(target = "facto.transport", "transport session stopped");
	}

	async fn handle_command(&mut self, command: Command) {
		match command {
			Command::Connect => self.dispatch(TransportEvent::Connect).await,
			Command::Send { payload, reply } => {
				let result = self.send(payload).await;
				let _ = reply.send(result);
			}
			Command::Status { reply } => {
				let _ = reply.send(TransportStatus {
					state: self.machine.state(),
					session_id: self.machine.session_id().map(str::to_string),
					reconnect_attempt: self.machine.attempt(),
				});
			}
			Command::Close { reply } => {
				self.dispatch(TransportEvent::Shutdown).await;
				let _ = reply.send(());
			}
		}
	}

	async fn send(&mut self, payload: String) -> Result<()> {
		if !self.machine.is_open() {
			return Err(TransportError::NotConnected);
		}
		let generation = self.machine.generation();
		let Some((_, writer)) = self.writer.as_mut().filter(|(g, _)| *g == generation) else {
			return Err(TransportError::NotConnected);
		};

		let frame = ClientRequest::new(payload).to_frame()?;
		writer.send(frame).await.inspect_err(|err| {
			// the reader observes the broken socket and drives the reconnect
			warn!(target = "facto.transport", error = %err, "send failed");
		})
	}

	async fn handle_socket_event(&mut self, event: SocketEvent) {
		match event {
			SocketEvent::Opened { generation, mut writer } => {
				if generation != self.machine.generation() || self.machine.state() != ConnectionState::Connecting {
					debug!(target = "facto.transport", generation, "closing superseded socket");
					let _ = tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await;
					return;
				}
				self.writer = Some((generation, writer));
				self.dispatch(TransportEvent::Opened { generation }).await;
			}
			SocketEvent::Frame { generation, frame } => {
				let event = match frame {
					InboundFrame::Text(text) => TransportEvent::Frame { generation, text },
					InboundFrame::Binary(len) => TransportEvent::UnreadableFrame {
						generation,
						detail: format!("unexpected binary frame ({len} bytes)"),
					},
				};
				self.dispatch(event).await;
			}
			SocketEvent::Closed { generation, reason } => {
				self.dispatch(TransportEvent::Closed { generation, reason }).await;
			}
		}
	}

	async fn dispatch(&mut self, event: TransportEvent) {
		for effect in self.machine.handle_event(event) {
			self.execute(effect).await;
		}
	}

	async fn execute(&mut self, effect: Effect) {
		match effect {
			Effect::OpenSocket { generation, url } => self.open_socket(generation, url),
			Effect::CloseSocket { generation } => self.close_socket(generation).await,
			Effect::ScheduleReconnect { timer, delay } => {
				self.timer = Some((timer, Box::pin(tokio::time::sleep(delay))));
			}
			Effect::CancelReconnect { timer } => {
				if self.timer.as_ref().is_some_and(|(id, _)| *id == timer) {
					self.timer = None;
				}
			}
			Effect::Notify(notice) => {
				// a dropped consumer does not stop the transport
				let _ = self.notices.send(notice);
			}
			Effect::Stop => self.stopped = true,
		}
	}

	fn open_socket(&mut self, generation: u64, url: Url) {
		let connector = Arc::clone(&self.connector);
		let events = self.socket_tx.clone();
		let reader = tokio::spawn(async move {
			let TransportParts { sender, mut receiver } = match connector.connect(url).await {
				Ok(parts) => parts,
				Err(err) => {
					let _ = events.send(SocketEvent::Closed {
						generation,
						reason: Some(err.to_string()),
					});
					return;
				}
			};

			if events.send(SocketEvent::Opened { generation, writer: sender }).is_err() {
				return;
			}

			let reason = loop {
				match receiver.recv().await {
					Some(Ok(frame)) => {
						if events.send(SocketEvent::Frame { generation, frame }).is_err() {
							return;
						}
					}
					Some(Err(err)) => break Some(err.to_string()),
					None => break None,
				}
			};
			let _ = events.send(SocketEvent::Closed { generation, reason });
		});

		if let Some((_, previous)) = self.reader.replace((generation, reader)) {
			previous.abort();
		}
	}

	async fn close_socket(&mut self, generation: u64) {
		if let Some((_, reader)) = self.reader.take_if(|(g, _)| *g == generation) {
			reader.abort();
		}
		if let Some((_, mut writer)) = self.writer.take_if(|(g, _)| *g == generation) {
			match tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await {
				Ok(Ok(())) => debug!(target = "facto.transport", generation, "socket closed"),
				Ok(Err(err)) => debug!(target = "facto.transport", generation, error = %err, "socket close failed"),
				Err(_) => debug!(target = "facto.transport", generation, "socket close timed out"),
			}
		}
	}

	fn teardown(&mut self) {
		self.timer = None;
		self.writer = None;
		if let Some((_, reader)) = self.reader.take() {
			reader.abort();
		}
	}
}

/// Resolves with the timer id once the pending reconnect timer elapses.
async fn fire(timer: &mut Option<(u64, Pin<Box<Sleep>>)>) -> u64 {
	match timer {
		Some((id, sleep)) => {
			sleep.as_mut().await;
			*id
		}
		None => std::future::pending().await,
	}
}
