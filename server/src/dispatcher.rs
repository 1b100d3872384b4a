//! Per-datagram request handling
//!
//! [`dispatch`] decodes one inbound datagram, applies its effect to the
//! registry and returns the datagrams to send in response. It holds no state
//! of its own. An `Err` means the datagram was dropped: the registry is left
//! untouched and nothing is sent, since the protocol has no error reply.

use crate::error::{PlayerKey, Result, ServerError};
use crate::registry::Registry;
use crate::replication::Outbox;
use log::debug;
use shared::protocol::{leave_payload, move_payload, player_payload};
use shared::{decode_envelope, JoinRequest, MoveRequest, ProtocolError, RequestKind};
use std::net::SocketAddr;

pub fn dispatch(registry: &mut Registry, datagram: &[u8], sender: SocketAddr) -> Result<Outbox> {
    let (kind, payload) = decode_envelope(datagram)?;

    match kind {
        RequestKind::Connect => {
            debug!("Connect from {}", sender);
            Ok(Outbox::new())
        }
        RequestKind::PlayerJoin => handle_join(registry, payload, sender),
        RequestKind::PlayerLeft => handle_leave(registry, sender),
        RequestKind::PlayerMove => handle_move(registry, payload, sender),
        RequestKind::PlayerAttack => handle_attack(registry, sender),
        RequestKind::PlayerCount => Err(ProtocolError::MalformedPacket(
            "player count is a server-only message",
        )
        .into()),
    }
}

fn resolve_sender(registry: &Registry, sender: SocketAddr) -> Result<u64> {
    registry
        .find_by_endpoint(sender)
        .ok_or(ServerError::UnknownPlayer(PlayerKey::Endpoint(sender)))
}

/// Allocates a slot, sends the joiner the roster and announces them to
/// everyone else.
fn handle_join(registry: &mut Registry, payload: &[u8], sender: SocketAddr) -> Result<Outbox> {
    let request = JoinRequest::decode(payload)?;
    let allocation = registry.allocate(&request.name, sender)?;
    let mut outbox = Outbox::new();

    if let Some(previous) = allocation.replaced {
        outbox.broadcast_event(
            registry,
            RequestKind::PlayerLeft,
            &leave_payload(previous),
            Some(allocation.id),
        );
    }

    outbox.send_roster_to(registry, sender);

    if let Some(record) = registry.get(allocation.id) {
        outbox.broadcast_event(
            registry,
            RequestKind::PlayerJoin,
            &player_payload(&record.player),
            Some(allocation.id),
        );
    }

    Ok(outbox)
}

fn handle_leave(registry: &mut Registry, sender: SocketAddr) -> Result<Outbox> {
    let id = resolve_sender(registry, sender)?;
    registry.release(id);

    let mut outbox = Outbox::new();
    outbox.broadcast_event(registry, RequestKind::PlayerLeft, &leave_payload(id), None);
    Ok(outbox)
}

/// Moves the sender and echoes the new position to every active player,
/// the mover included.
fn handle_move(registry: &mut Registry, payload: &[u8], sender: SocketAddr) -> Result<Outbox> {
    let id = resolve_sender(registry, sender)?;
    let request = MoveRequest::decode(payload)?;
    let position = registry.apply_move(id, request.direction)?;

    let mut outbox = Outbox::new();
    outbox.broadcast_event(
        registry,
        RequestKind::PlayerMove,
        &move_payload(id, position),
        None,
    );
    Ok(outbox)
}

/// Attacks are accepted from known players but have no effect.
fn handle_attack(registry: &Registry, sender: SocketAddr) -> Result<Outbox> {
    let id = resolve_sender(registry, sender)?;
    debug!("Ignoring attack from player {}", id);
    Ok(Outbox::new())
}
