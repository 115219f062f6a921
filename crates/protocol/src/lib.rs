//! Wire types for the facto fact-check status protocol.
//!
//! This crate contains the serde-serializable types exchanged with the
//! fact-check service over its WebSocket channel. These types represent the
//! "protocol layer": the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and decoding
//! * 1:1 with the wire: field names match the server's JSON exactly
//! * Stable: Changes only when the wire protocol changes
//!
//! Connection handling lives in `facto-runtime`; state projection in `facto`.

pub mod envelope;
pub mod progress;
pub mod verdict;

pub use envelope::*;
pub use progress::*;
pub use verdict::*;
