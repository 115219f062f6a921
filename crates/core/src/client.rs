//! High-level client wiring a [`SessionProjector`] to a transport session.

use std::sync::Arc;

use facto_runtime::{Connector, TransportConfig, TransportHandle, TransportNotice, TransportSession, TransportStatus, WebSocketConnector};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::projector::{SessionProjector, SessionSnapshot};

enum ClientCommand {
	Submit { input: String, reply: oneshot::Sender<()> },
	Shutdown { reply: oneshot::Sender<()> },
}

/// Connected fact-check client.
///
/// Owns one transport session and one projector task. All state changes are
/// published as [`SessionSnapshot`]s through a watch channel.
///
/// # Example
///
/// ```ignore
/// let client = FactCheckClient::connect(TransportConfig::default())?;
/// client.submit("The sky is blue.").await?;
/// let outcome = client.wait_for_outcome().await?;
/// println!("{:?}", outcome.results);
/// client.shutdown().await;
/// ```
pub struct FactCheckClient {
	commands: mpsc::UnboundedSender<ClientCommand>,
	state: watch::Receiver<SessionSnapshot>,
	transport: TransportHandle,
	task: JoinHandle<()>,
}

impl FactCheckClient {
	/// Connects over WebSocket. Must be called within a tokio runtime.
	pub fn connect(config: TransportConfig) -> Result<Self> {
		Self::with_connector(config, Arc::new(WebSocketConnector))
	}

	/// Connects through `connector`; tests pass an in-memory one.
	pub fn with_connector(config: TransportConfig, connector: Arc<dyn Connector>) -> Result<Self> {
		let projector = SessionProjector::new(config.session_id.clone());
		let (transport, notices) = TransportSession::spawn(config, connector)?;
		let (state_tx, state) = watch::channel(projector.snapshot().clone());
		let (commands, command_rx) = mpsc::unbounded_channel();

		let task = tokio::spawn(
			ProjectorTask {
				projector,
				transport: transport.clone(),
				notices,
				commands: command_rx,
				state: state_tx,
			}
			.run(),
		);
		transport.connect()?;

		Ok(Self {
			commands,
			state,
			transport,
			task,
		})
	}

	/// Submits a statement or URL, starting a new cycle.
	///
	/// Resolves once the cleared state has been published. Failures to reach
	/// the service show up in the snapshot, not here.
	pub async fn submit(&self, input: impl Into<String>) -> Result<()> {
		let (reply, rx) = oneshot::channel();
		self.commands
			.send(ClientCommand::Submit {
				input: input.into(),
				reply,
			})
			.map_err(|_| ClientError::ShutDown)?;
		rx.await.map_err(|_| ClientError::ShutDown)
	}

	pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
		self.state.clone()
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		self.state.borrow().clone()
	}

	/// Waits until the current cycle completes or fails.
	pub async fn wait_for_outcome(&self) -> Result<SessionSnapshot> {
		let mut state = self.state.clone();
		let snapshot = state
			.wait_for(|snapshot| snapshot.phase.is_terminal())
			.await
			.map_err(|_| ClientError::ShutDown)?;
		Ok(snapshot.clone())
	}

	/// Waits for the session id the server announces on the open channel.
	pub async fn wait_for_session_id(&self) -> Result<String> {
		let mut state = self.state.clone();
		let snapshot = state
			.wait_for(|snapshot| snapshot.connected && snapshot.session_confirmed && snapshot.session_id.is_some())
			.await
			.map_err(|_| ClientError::ShutDown)?;
		snapshot.session_id.clone().ok_or(ClientError::ShutDown)
	}

	/// Connection state as seen by the transport.
	pub async fn transport_status(&self) -> Result<TransportStatus> {
		Ok(self.transport.status().await?)
	}

	/// Closes the transport and stops the projector task.
	pub async fn shutdown(self) {
		let (reply, rx) = oneshot::channel();
		if self.commands.send(ClientCommand::Shutdown { reply }).is_ok() {
			let _ = rx.await;
		}
		let _ = self.task.await;
	}
}

struct ProjectorTask {
	projector: SessionProjector,
	transport: TransportHandle,
	notices: mpsc::UnboundedReceiver<TransportNotice>,
	commands: mpsc::UnboundedReceiver<ClientCommand>,
	state: watch::Sender<SessionSnapshot>,
}

impl ProjectorTask {
	async fn run(mut self) {
		loop {
			tokio::select! {
				command = self.commands.recv() => match command {
					Some(ClientCommand::Submit { input, reply }) => {
						let payload = self.projector.submit(&input);
						self.publish();
						let _ = reply.send(());
						if let Some(payload) = payload {
							self.send(payload).await;
						}
					}
					Some(ClientCommand::Shutdown { reply }) => {
						self.transport.close().await;
						let _ = reply.send(());
						break;
					}
					None => {
						self.transport.close().await;
						break;
					}
				},
				notice = self.notices.recv() => match notice {
					Some(notice) => {
						let replay = self.projector.apply(notice);
						self.publish();
						if let Some(payload) = replay {
							self.send(payload).await;
						}
					}
					None => {
						warn!(target = "facto.session", "transport session stopped");
						break;
					}
				},
			}
		}
		debug!(target = "facto.session", "projector task stopped");
	}

	async fn send(&mut self, payload: String) {
		if let Err(err) = self.transport.send(payload.clone()).await {
			debug!(target = "facto.session", error = %err, "submission not sent");
			self.projector.send_failed(payload);
			self.publish();
		}
	}

	fn publish(&self) {
		self.state.send_replace(self.projector.snapshot().clone());
	}
}
