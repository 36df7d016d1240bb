//! Bridge connection stack.
//!
//! Layering, bottom up:
//! - [`transport`]: the capability seam over the persistent message channel,
//!   with a TCP implementation and a channel-backed mock
//! - [`client`]: one logical connection, epoch-tagged
//! - [`session`]: per-connection topic contracts (velocity out, telemetry
//!   and map in)
//! - [`manager`]: the connect/disconnect/error/timeout state machine

pub mod client;
pub mod manager;
pub mod session;
pub mod transport;

pub use client::{BridgeClient, BridgeEvent};
pub use manager::{ConnectionManager, ConnectionState};
pub use session::TopicSession;
pub use transport::{BridgeFrame, BridgeTransport, MockTransport, TcpTransport, TransportEvent};
