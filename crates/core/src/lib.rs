//! Client for the facto fact-check status channel.
//!
//! Submits a statement or video URL to the fact-check service and tracks the
//! job as it advances, exposing the result through an observable
//! [`SessionSnapshot`]:
//!
//! * [`SessionProjector`]: pure fold of transport notices into the snapshot
//! * [`FactCheckClient`]: runs the projector against a live transport session
//!
//! Wire types are re-exported from `facto-protocol` and transport
//! configuration from `facto-runtime`.

pub mod client;
pub mod error;
pub mod projector;

pub use client::FactCheckClient;
pub use error::{ClientError, Result};
pub use facto_protocol::{FactCheckResult, Probability, Progress, ProgressStage};
pub use facto_runtime::{ReconnectPolicy, TransportConfig, TransportError};
pub use projector::{ErrorKind, Phase, SessionError, SessionProjector, SessionSnapshot};
