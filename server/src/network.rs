//! Server network layer: UDP receive task and the single dispatch loop

use crate::config::ServerConfig;
use crate::dispatcher::dispatch;
use crate::error::{Result, ServerError};
use crate::registry::Registry;
use crate::replication::DeliveryReport;
use bytes::Bytes;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Messages sent from the receive task to the dispatch loop
#[derive(Debug)]
pub enum ServerMessage {
    DatagramReceived { bytes: Bytes, addr: SocketAddr },
}

/// Authoritative arena server
///
/// Owns the socket and the registry. Datagrams are handled strictly one at
/// a time: a request's registry mutation and the delivery of every message
/// it produces finish before the next datagram is looked at.
pub struct Server {
    socket: Arc<UdpSocket>,
    registry: Registry,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let addr = config.bind_addr();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!("Server listening on {}", addr);

        Ok(Server {
            socket: Arc::new(socket),
            registry: Registry::new(config.max_players, config.world),
            config,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_network_receiver(&self, server_tx: mpsc::Sender<ServerMessage>) {
        let socket = Arc::clone(&self.socket);
        let buffer_size = self.config.recv_buffer_size;

        tokio::spawn(async move {
            let mut buffer = vec![0u8; buffer_size];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        debug!("Received {} bytes from {}", len, addr);
                        let bytes = Bytes::copy_from_slice(&buffer[..len]);
                        if let Err(e) = server_tx
                            .send(ServerMessage::DatagramReceived { bytes, addr })
                            .await
                        {
                            error!("Failed to send datagram to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Handles one datagram and delivers everything it produced
    pub async fn handle_datagram(
        &mut self,
        datagram: &[u8],
        addr: SocketAddr,
    ) -> Result<DeliveryReport> {
        let outbox = dispatch(&mut self.registry, datagram, addr)?;
        Ok(outbox.flush(self.socket.as_ref()).await)
    }

    /// Main server loop; returns only if the receive task stops
    pub async fn run(&mut self) -> Result<()> {
        let (server_tx, mut server_rx) = mpsc::channel(self.config.channel_capacity);
        self.spawn_network_receiver(server_tx);

        info!(
            "Server started successfully (world {}x{}, {} player slots)",
            self.config.world.width(),
            self.config.world.height(),
            self.config.max_players
        );

        while let Some(ServerMessage::DatagramReceived { bytes, addr }) = server_rx.recv().await {
            match self.handle_datagram(&bytes, addr).await {
                Ok(report) => {
                    if report.sent + report.failed > 0 {
                        debug!(
                            "Handled datagram from {}: {} sent, {} failed, {} players",
                            addr,
                            report.sent,
                            report.failed,
                            self.registry.len()
                        );
                    }
                }
                Err(e @ ServerError::Protocol(_)) | Err(e @ ServerError::RosterFull(_)) => {
                    warn!("Dropped datagram from {}: {}", addr, e);
                }
                Err(e) => {
                    debug!("Dropped datagram from {}: {}", addr, e);
                }
            }
        }

        Err(ServerError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::leave_request;
    use shared::{Direction, JoinRequest, MoveRequest, Position, ServerEvent};
    use std::net::Ipv4Addr;
    use tokio::time::timeout;

    fn local_config() -> ServerConfig {
        ServerConfig {
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    async fn recv_event(socket: &UdpSocket) -> ServerEvent {
        let mut buf = [0u8; 2048];
        let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for server")
            .unwrap();
        ServerEvent::decode(&buf[..len]).unwrap()
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = Server::bind(local_config()).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let result = Server::bind(ServerConfig {
            port,
            ..local_config()
        })
        .await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_handle_datagram_delivers_over_socket() {
        let mut server = Server::bind(local_config()).await.unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client_addr = client.local_addr().unwrap();

        let report = server
            .handle_datagram(&JoinRequest::new("Alice").encode(), client_addr)
            .await
            .unwrap();
        assert_eq!(report, DeliveryReport { sent: 1, failed: 0 });

        match recv_event(&client).await {
            ServerEvent::Roster(players) => assert_eq!(players.len(), 1),
            other => panic!("unexpected event {:?}", other),
        }

        server
            .handle_datagram(&MoveRequest::new(Direction::South).encode(), client_addr)
            .await
            .unwrap();
        assert_eq!(
            recv_event(&client).await,
            ServerEvent::Moved {
                id: 1,
                position: Position::new(0, 1)
            }
        );

        server
            .handle_datagram(&leave_request(), client_addr)
            .await
            .unwrap();
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn test_handle_datagram_propagates_drop_reason() {
        let mut server = Server::bind(local_config()).await.unwrap();
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();

        assert!(matches!(
            server.handle_datagram(&[200], addr).await,
            Err(ServerError::Protocol(_))
        ));
        assert!(matches!(
            server.handle_datagram(&leave_request(), addr).await,
            Err(ServerError::UnknownPlayer(_))
        ));
    }
}
