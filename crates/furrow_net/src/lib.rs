//! Furrow Network Layer
//!
//! Turn messages between clients and the authoritative node. Network tasks
//! never touch game state: inbound messages wait in a queue that the main
//! thread drains once per frame.

pub mod hub;
pub mod message;
pub mod session;
pub mod transport;

pub use hub::{ClientEndpoint, HubHandle, Inbound, ServerHub};
pub use message::{decode, encode, Envelope, Message};
pub use session::{NetMode, Session};

use thiserror::Error;

/// Network protocol version
pub const PROTOCOL_VERSION: u32 = 1;

/// Connection id assigned by the server hub.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum NetError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("protocol version {found}, expected {expected}")]
    Protocol { expected: u32, found: u32 },

    #[error("{0} is not connected")]
    UnknownClient(ClientId),

    #[error("connection closed")]
    Closed,
}
