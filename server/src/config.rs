//! Server configuration.

use shared::WorldBounds;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 54000;
pub const DEFAULT_MAX_PLAYERS: usize = 100;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the UDP socket to
    pub host: IpAddr,
    /// UDP port to listen on; 0 picks an ephemeral port
    pub port: u16,
    pub world: WorldBounds,
    /// Maximum number of simultaneously active players
    pub max_players: usize,
    /// Size of the datagram receive buffer; longer datagrams are truncated
    pub recv_buffer_size: usize,
    /// Depth of the channel between the receiver task and the dispatch loop
    pub channel_capacity: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            world: WorldBounds::default(),
            max_players: DEFAULT_MAX_PLAYERS,
            recv_buffer_size: 2048,
            channel_capacity: 1024,
        }
    }
}
