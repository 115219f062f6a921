//! Transport session for the facto fact-check channel.
//!
//! Owns the single WebSocket to the fact-check service for one logical
//! session: derives the channel address, opens and tears down sockets,
//! decodes inbound envelopes and reconnects with capped exponential backoff
//! after unclean closures.
//!
//! # Layers
//!
//! * [`machine`]: pure state machine, `event -> effects`, no I/O
//! * [`session`]: tokio actor executing those effects; [`TransportHandle`] talks to it
//! * [`transport`]: socket traits plus the `tokio-tungstenite` implementation
//! * [`fake_transport`]: in-memory sockets for tests

pub mod address;
pub mod backoff;
pub mod config;
pub mod error;
pub mod fake_transport;
pub mod machine;
pub mod session;
pub mod transport;

pub use address::channel_url;
pub use backoff::ReconnectPolicy;
pub use config::{DEFAULT_ENDPOINT, TransportConfig};
pub use error::{Result, TransportError};
pub use machine::{ConnectionState, TransportNotice};
pub use session::{TransportHandle, TransportSession, TransportStatus};
pub use transport::{Connector, WebSocketConnector};
