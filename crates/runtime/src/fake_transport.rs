//! In-memory transport for testing the session layers without a server.
//!
//! # Example
//!
//! ```ignore
//! let (connector, server) = FakeConnector::new();
//! let (handle, mut notices) = TransportSession::spawn(config, Arc::new(connector))?;
//! handle.connect()?;
//!
//! let peer = server.accept().await.unwrap();
//! peer.push(json!({"type": "connection", "client_id": "abc"}));
//! assert_eq!(peer.url().path(), "/ws/fact-check/undefined");
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use facto_protocol::ClientRequest;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Result, TransportError};
use crate::transport::{Connector, InboundFrame, Transport, TransportParts, TransportReceiver};

enum Inbound {
	Frame(InboundFrame),
	Fail(String),
}

struct Shared {
	accepted_tx: mpsc::UnboundedSender<FakePeer>,
	refusals: Mutex<VecDeque<String>>,
	attempts: Mutex<Vec<Url>>,
}

/// [`Connector`] whose sockets are in-memory channels driven by a [`FakeServer`].
#[derive(Clone)]
pub struct FakeConnector {
	shared: Arc<Shared>,
}

/// Test-side view of every connection attempt made through a [`FakeConnector`].
pub struct FakeServer {
	shared: Arc<Shared>,
	accepted_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<FakePeer>>,
}

impl FakeConnector {
	/// Creates a connector and the server controlling it.
	pub fn new() -> (FakeConnector, FakeServer) {
		let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
		let shared = Arc::new(Shared {
			accepted_tx,
			refusals: Mutex::new(VecDeque::new()),
			attempts: Mutex::new(Vec::new()),
		});
		let server = FakeServer {
			shared: Arc::clone(&shared),
			accepted_rx: tokio::sync::Mutex::new(accepted_rx),
		};
		(FakeConnector { shared }, server)
	}
}

impl Connector for FakeConnector {
	fn connect(&self, url: Url) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + '_>> {
		let shared = Arc::clone(&self.shared);
		Box::pin(async move {
			shared.attempts.lock().push(url.clone());
			if let Some(reason) = shared.refusals.lock().pop_front() {
				return Err(TransportError::ConnectionLost(reason));
			}

			let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
			let sent = Arc::new(Mutex::new(Vec::new()));
			let closed_by_client = Arc::new(AtomicBool::new(false));

			let peer = FakePeer {
				url,
				inbound_tx: Arc::new(Mutex::new(Some(inbound_tx))),
				sent: Arc::clone(&sent),
				closed_by_client: Arc::clone(&closed_by_client),
			};
			// the server half may already be gone at the end of a test
			let _ = shared.accepted_tx.send(peer);

			Ok(TransportParts {
				sender: Box::new(FakeSender { sent, closed_by_client }),
				receiver: Box::new(FakeReceiver { inbound_rx }),
			})
		})
	}
}

impl FakeServer {
	/// Waits for the next successful connection.
	pub async fn accept(&self) -> Option<FakePeer> {
		self.accepted_rx.lock().await.recv().await
	}

	/// Makes the next connection attempt fail with `reason`.
	pub fn refuse_next(&self, reason: impl Into<String>) {
		self.shared.refusals.lock().push_back(reason.into());
	}

	/// Addresses of every attempt so far, refused ones included.
	pub fn attempts(&self) -> Vec<Url> {
		self.shared.attempts.lock().clone()
	}
}

/// Server end of one fake socket.
#[derive(Clone)]
pub struct FakePeer {
	url: Url,
	inbound_tx: Arc<Mutex<Option<mpsc::UnboundedSender<Inbound>>>>,
	sent: Arc<Mutex<Vec<String>>>,
	closed_by_client: Arc<AtomicBool>,
}

impl FakePeer {
	/// Address the client connected to.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Delivers a JSON envelope to the client.
	pub fn push(&self, envelope: JsonValue) {
		self.push_raw(envelope.to_string());
	}

	/// Delivers a raw text frame to the client.
	pub fn push_raw(&self, frame: impl Into<String>) {
		self.deliver(Inbound::Frame(InboundFrame::Text(frame.into())));
	}

	/// Delivers a binary frame of `len` bytes.
	pub fn push_binary(&self, len: usize) {
		self.deliver(Inbound::Frame(InboundFrame::Binary(len)));
	}

	/// Closes the socket from the server side.
	pub fn disconnect(&self) {
		self.inbound_tx.lock().take();
	}

	/// Fails the socket with a transport error.
	pub fn fail(&self, reason: impl Into<String>) {
		self.deliver(Inbound::Fail(reason.into()));
		self.disconnect();
	}

	/// Raw frames the client sent on this socket.
	pub fn sent(&self) -> Vec<String> {
		self.sent.lock().clone()
	}

	/// Sent frames decoded as client requests.
	pub fn requests(&self) -> Vec<ClientRequest> {
		self.sent
			.lock()
			.iter()
			.filter_map(|frame| serde_json::from_str(frame).ok())
			.collect()
	}

	/// Whether the client closed this socket itself.
	pub fn closed_by_client(&self) -> bool {
		self.closed_by_client.load(Ordering::SeqCst)
	}

	fn deliver(&self, inbound: Inbound) {
		if let Some(tx) = self.inbound_tx.lock().as_ref() {
			let _ = tx.send(inbound);
		}
	}
}

struct FakeSender {
	sent: Arc<Mutex<Vec<String>>>,
	closed_by_client: Arc<AtomicBool>,
}

impl Transport for FakeSender {
	fn send(&mut self, frame: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			if self.closed_by_client.load(Ordering::SeqCst) {
				return Err(TransportError::ConnectionLost("socket already closed".into()));
			}
			self.sent.lock().push(frame);
			Ok(())
		})
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		self.closed_by_client.store(true, Ordering::SeqCst);
		Box::pin(async { Ok(()) })
	}
}

struct FakeReceiver {
	inbound_rx: mpsc::UnboundedReceiver<Inbound>,
}

impl TransportReceiver for FakeReceiver {
	fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<Result<InboundFrame>>> + Send + '_>> {
		Box::pin(async move {
			let inbound = self.inbound_rx.recv().await?;
			match inbound {
				Inbound::Frame(frame) => Some(Ok(frame)),
				Inbound::Fail(reason) => Some(Err(TransportError::ConnectionLost(reason))),
			}
		})
	}
}
