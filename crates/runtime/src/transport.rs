//! Socket abstraction and the WebSocket implementation.
//!
//! A [`Connector`] opens one socket and hands back [`TransportParts`]: a
//! [`Transport`] for outbound frames and a [`TransportReceiver`] for inbound
//! ones. The session actor owns both halves; nothing else touches a socket.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use url::Url;

use crate::error::{Result, TransportError};

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
	Text(String),
	/// Binary payloads are not part of the protocol; only the size is kept.
	Binary(usize),
}

/// Outbound half of a socket.
pub trait Transport: Send {
	/// Sends one text frame.
	fn send(&mut self, frame: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

	/// Starts a clean close of the socket.
	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Inbound half of a socket.
pub trait TransportReceiver: Send {
	/// Next frame; `None` once the peer has closed the socket.
	fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<Result<InboundFrame>>> + Send + '_>>;
}

/// Both halves of one opened socket.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
}

/// Opens sockets to channel addresses.
pub trait Connector: Send + Sync {
	fn connect(&self, url: Url) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + '_>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound half of a `tokio-tungstenite` WebSocket.
pub struct WebSocketSender {
	sink: SplitSink<WsStream, Message>,
}

impl Transport for WebSocketSender {
	fn send(&mut self, frame: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { self.sink.send(Message::Text(frame.into())).await.map_err(TransportError::from) })
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { self.sink.close().await.map_err(TransportError::from) })
	}
}

/// Inbound half of a `tokio-tungstenite` WebSocket.
pub struct WebSocketReceiver {
	stream: SplitStream<WsStream>,
}

impl TransportReceiver for WebSocketReceiver {
	fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<Result<InboundFrame>>> + Send + '_>> {
		Box::pin(async move {
			loop {
				let Some(message) = self.stream.next().await else {
					return None;
				};
				match message {
					Ok(Message::Text(text)) => return Some(Ok(InboundFrame::Text(text.to_string()))),
					Ok(Message::Binary(bytes)) => return Some(Ok(InboundFrame::Binary(bytes.len()))),
					Ok(Message::Close(frame)) => {
						debug!(target = "facto.transport", ?frame, "server sent close frame");
						return None;
					}
					// ping/pong replies are handled inside tungstenite
					Ok(_) => continue,
					Err(err) => return Some(Err(TransportError::from(err))),
				}
			}
		})
	}
}

/// Opens real WebSocket connections (`ws://` and `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
	fn connect(&self, url: Url) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + '_>> {
		Box::pin(open_websocket(url))
	}
}

async fn open_websocket(url: Url) -> Result<TransportParts> {
	let (stream, response) = connect_async(url.as_str()).await?;
	debug!(target = "facto.transport", %url, status = %response.status(), "websocket handshake complete");
	let (sink, stream) = stream.split();
	Ok(TransportParts {
		sender: Box::new(WebSocketSender { sink }),
		receiver: Box::new(WebSocketReceiver { stream }),
	})
}
