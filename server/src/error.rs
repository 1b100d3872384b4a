//! Error types for the arena server.

use shared::ProtocolError;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

/// How a player-scoped request identified its player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKey {
    Endpoint(SocketAddr),
    Id(u64),
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerKey::Endpoint(addr) => write!(f, "endpoint {}", addr),
            PlayerKey::Id(id) => write!(f, "id {}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    /// Datagram could not be decoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No active record for the endpoint or id, either never registered
    /// or already released
    #[error("no active player with {0}")]
    UnknownPlayer(PlayerKey),

    /// Every slot is active and capacity is reached
    #[error("roster is full ({0} players)")]
    RosterFull(usize),

    #[error("failed to send to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("receiver task stopped")]
    ChannelClosed,
}
