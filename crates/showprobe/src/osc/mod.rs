//! Open Sound Control over UDP.
//!
//! Wire encoding and decoding is done by `rosc`; this module converts packets
//! into [`OscMessage`] values, routes them through a [`Dispatcher`] and runs
//! the receive loop in [`OscServer`].

mod dispatcher;
mod message;
mod pattern;
mod server;

use std::net::SocketAddr;

pub use dispatcher::Dispatcher;
pub use dispatcher::Handler;
pub use dispatcher::PrintHandler;
pub use message::OscArg;
pub use message::OscMessage;
pub use pattern::AddressPattern;
pub use server::send;
pub use server::OscServer;

pub type Result<T> = std::result::Result<T, OscError>;

#[derive(Debug, thiserror::Error)]
pub enum OscError {
    #[error("failed to bind OSC listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("OSC I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid OSC address '{0}': must start with '/'")]
    InvalidAddress(String),

    #[error("invalid OSC address pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("failed to encode OSC packet: {0}")]
    Encode(String),
}
