//! Error types for session routing

use std::net::SocketAddr;
use thiserror::Error;

use crate::wire::CodecError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed datagram")]
    Codec(#[from] CodecError),

    #[error("upload key does not resolve to an owner")]
    UnknownKey,

    #[error("no session for {addr}")]
    UnknownSession { addr: SocketAddr },

    #[error("session inbox for {addr} is full")]
    InboxFull { addr: SocketAddr },

    #[error("session for {addr} has stopped")]
    InboxClosed { addr: SocketAddr },

    #[error("failed to bind udp port {port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}
