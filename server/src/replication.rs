//! Outbound fan-out of roster snapshots and player events
//!
//! Handlers never touch the socket directly. They queue addressed datagrams
//! into an [`Outbox`] while they still hold the registry, so the recipient
//! list always matches the state the event was produced from. The outbox is
//! then flushed through a [`Transport`]; a failed send to one peer is logged
//! and the remaining peers are still served.

use crate::error::ServerError;
use crate::registry::Registry;
use bytes::Bytes;
use log::{debug, warn};
use shared::protocol::{encode, roster_payload};
use shared::RequestKind;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Fire-and-forget datagram sink
pub trait Transport {
    fn send_to(
        &self,
        bytes: &[u8],
        addr: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send;
}

impl Transport for UdpSocket {
    async fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, bytes, addr).await
    }
}

/// A datagram addressed to one peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub addr: SocketAddr,
    pub bytes: Bytes,
}

/// Outcome of flushing an [`Outbox`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, addr: SocketAddr, bytes: Bytes) {
        self.messages.push(Outbound { addr, bytes });
    }

    /// Queues the full roster for one peer as a single message:
    /// `[PlayerCount][count:8][record]*count` in slot order.
    pub fn send_roster_to(&mut self, registry: &Registry, addr: SocketAddr) {
        let snapshot = registry.snapshot();
        let payload = roster_payload(snapshot.iter().map(|record| &record.player));
        self.push(addr, encode(RequestKind::PlayerCount, &payload));
    }

    /// Queues one envelope for every active player except `exclude`
    ///
    /// Returns how many peers the event was addressed to.
    pub fn broadcast_event(
        &mut self,
        registry: &Registry,
        kind: RequestKind,
        payload: &[u8],
        exclude: Option<u64>,
    ) -> usize {
        let bytes = encode(kind, payload);
        let before = self.messages.len();
        for record in registry.snapshot() {
            if Some(record.id()) == exclude {
                continue;
            }
            self.push(record.endpoint, bytes.clone());
        }
        self.messages.len() - before
    }

    pub fn messages(&self) -> &[Outbound] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Sends every queued datagram in order
    pub async fn flush<T: Transport>(self, transport: &T) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for message in self.messages {
            match transport.send_to(&message.bytes, message.addr).await {
                Ok(_) => report.sent += 1,
                Err(source) => {
                    let error = ServerError::Send {
                        addr: message.addr,
                        source,
                    };
                    warn!("{}", error);
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            debug!(
                "Delivered {} datagrams, {} failed",
                report.sent, report.failed
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Player, ServerEvent, WorldBounds};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every send and fails for one chosen address
    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
        unreachable: Option<SocketAddr>,
    }

    impl Transport for MockTransport {
        async fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize> {
            if Some(addr) == self.unreachable {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "unreachable"));
            }
            self.sent.lock().unwrap().push((addr, bytes.to_vec()));
            Ok(bytes.len())
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn registry_with(n: u16) -> Registry {
        let mut registry = Registry::new(16, WorldBounds::default());
        for i in 0..n {
            registry
                .allocate(&format!("p{}", i), addr(9000 + i))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_broadcast_excludes_one_player() {
        let registry = registry_with(4);
        let mut outbox = Outbox::new();

        let queued = outbox.broadcast_event(&registry, RequestKind::PlayerLeft, &[0; 8], Some(2));

        assert_eq!(queued, 3);
        let targets: Vec<SocketAddr> = outbox.messages().iter().map(|m| m.addr).collect();
        assert!(!targets.contains(&addr(9001)));
        let unique: HashSet<SocketAddr> = targets.iter().copied().collect();
        assert_eq!(unique.len(), targets.len());
        assert_eq!(targets, vec![addr(9000), addr(9002), addr(9003)]);
    }

    #[test]
    fn test_broadcast_without_exclusion_reaches_everyone() {
        let registry = registry_with(3);
        let mut outbox = Outbox::new();
        assert_eq!(
            outbox.broadcast_event(&registry, RequestKind::PlayerMove, &[], None),
            3
        );
    }

    #[test]
    fn test_broadcast_skips_released_players() {
        let mut registry = registry_with(3);
        registry.release(1);
        let mut outbox = Outbox::new();

        outbox.broadcast_event(&registry, RequestKind::PlayerMove, &[], None);

        let targets: Vec<SocketAddr> = outbox.messages().iter().map(|m| m.addr).collect();
        assert_eq!(targets, vec![addr(9001), addr(9002)]);
    }

    #[test]
    fn test_roster_is_one_message() {
        let registry = registry_with(2);
        let mut outbox = Outbox::new();

        outbox.send_roster_to(&registry, addr(9001));

        assert_eq!(outbox.len(), 1);
        let message = &outbox.messages()[0];
        assert_eq!(message.addr, addr(9001));
        match ServerEvent::decode(&message.bytes).unwrap() {
            ServerEvent::Roster(players) => {
                assert_eq!(players, vec![Player::new(1, "p0"), Player::new(2, "p1")]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_flush_continues_past_failed_peer() {
        let registry = registry_with(3);
        let mut outbox = Outbox::new();
        outbox.broadcast_event(&registry, RequestKind::PlayerMove, &[7], None);

        let transport = MockTransport {
            unreachable: Some(addr(9000)),
            ..MockTransport::default()
        };
        let report = tokio_test::block_on(outbox.flush(&transport));

        assert_eq!(report, DeliveryReport { sent: 2, failed: 1 });
        let sent = transport.sent.lock().unwrap();
        let targets: Vec<SocketAddr> = sent.iter().map(|(a, _)| *a).collect();
        assert_eq!(targets, vec![addr(9001), addr(9002)]);
        assert!(sent.iter().all(|(_, bytes)| bytes == &[RequestKind::PlayerMove as u8, 7]));
    }

    #[test]
    fn test_empty_outbox_flush() {
        let transport = MockTransport::default();
        let report = tokio_test::block_on(Outbox::new().flush(&transport));
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test]
    async fn test_flush_over_udp_socket() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let mut outbox = Outbox::new();
        outbox.push(peer.local_addr().unwrap(), Bytes::from_static(&[0]));
        let report = outbox.flush(&server).await;
        assert_eq!(report.sent, 1);

        let mut buf = [0u8; 16];
        let (len, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[0]);
        assert_eq!(from, server.local_addr().unwrap());
    }
}
