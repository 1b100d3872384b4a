//! Fixed-layout wire protocol between the arena server and its clients.
//!
//! Every datagram is an envelope: one request-kind byte followed by a
//! kind-specific payload. All multi-byte integers, and the bit patterns of
//! floats, are big-endian.
//!
//! ```text
//! C→S join        [1][nameLen:1][name]
//! C→S move        [3][direction:1]
//! C→S leave       [2]
//! S→C roster      [5][count:8][record]*count
//! S→C join        [1][record]
//! S→C leave       [2][id:8]
//! S→C move        [3][id:8][x:4][y:4]
//!
//! record          [id:8][nameLen:1][name][x:4][y:4][dir:1][scale:4][aim:4][score:8]
//! ```

use crate::movement::Position;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Longest name that fits behind a one-byte length prefix.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),
    #[error("truncated packet: {0}")]
    TruncatedPacket(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestKind {
    Connect = 0,
    PlayerJoin = 1,
    PlayerLeft = 2,
    PlayerMove = 3,
    PlayerAttack = 4,
    /// Server→client only: prefixes the roster snapshot sent to a joiner.
    PlayerCount = 5,
}

impl TryFrom<u8> for RequestKind {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(RequestKind::Connect),
            1 => Ok(RequestKind::PlayerJoin),
            2 => Ok(RequestKind::PlayerLeft),
            3 => Ok(RequestKind::PlayerMove),
            4 => Ok(RequestKind::PlayerAttack),
            5 => Ok(RequestKind::PlayerCount),
            _ => Err(ProtocolError::MalformedPacket("unknown request kind")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    #[default]
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub fn opposite(self) -> Direction {
        Direction::ALL[(self as usize + 4) % 8]
    }
}

impl TryFrom<u8> for Direction {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Direction::ALL
            .get(byte as usize)
            .copied()
            .ok_or(ProtocolError::MalformedPacket("unknown direction"))
    }
}

/// Replicated state of one player as it appears on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: u64,
    pub name: String,
    pub position: Position,
    pub facing: Direction,
    pub scale: f32,
    pub aim_angle: f32,
    pub score: i64,
}

impl Player {
    /// Encoded size of a record with an empty name.
    pub const MIN_ENCODED_LEN: usize = 8 + 1 + 4 + 4 + 1 + 4 + 4 + 8;

    /// Creates a player with default spawn state.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: Position::default(),
            facing: Direction::default(),
            scale: 1.0,
            aim_angle: 0.0,
            score: 0,
        }
    }

    pub fn encoded_len(&self) -> usize {
        Self::MIN_ENCODED_LEN + bounded_name(&self.name).len()
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.id);
        put_name(buf, &self.name);
        buf.put_i32(self.position.x);
        buf.put_i32(self.position.y);
        buf.put_u8(self.facing as u8);
        buf.put_f32(self.scale);
        buf.put_f32(self.aim_angle);
        buf.put_i64(self.score);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < Self::MIN_ENCODED_LEN {
            return Err(ProtocolError::TruncatedPacket("player record"));
        }
        let id = buf.get_u64();
        let name_len = buf.get_u8() as usize;
        if buf.remaining() < name_len + Self::MIN_ENCODED_LEN - 9 {
            return Err(ProtocolError::TruncatedPacket("player record"));
        }
        let name = take_name(buf, name_len)?;
        let x = buf.get_i32();
        let y = buf.get_i32();
        let facing = Direction::try_from(buf.get_u8())?;

        Ok(Self {
            id,
            name,
            position: Position { x, y },
            facing,
            scale: buf.get_f32(),
            aim_angle: buf.get_f32(),
            score: buf.get_i64(),
        })
    }
}

/// Longest prefix of `name` that fits in [`MAX_NAME_LEN`] bytes without
/// splitting a character.
pub fn bounded_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn put_name(buf: &mut impl BufMut, name: &str) {
    let name = bounded_name(name);
    buf.put_u8(name.len() as u8);
    buf.put_slice(name.as_bytes());
}

fn take_name(buf: &mut impl Buf, len: usize) -> Result<String, ProtocolError> {
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|_| ProtocolError::MalformedPacket("name is not UTF-8"))
}

/// Splits a datagram into its request kind and the remaining payload.
pub fn decode_envelope(bytes: &[u8]) -> Result<(RequestKind, &[u8]), ProtocolError> {
    let (&kind, payload) = bytes
        .split_first()
        .ok_or(ProtocolError::MalformedPacket("empty datagram"))?;
    Ok((RequestKind::try_from(kind)?, payload))
}

/// Frames `payload` behind a request-kind byte.
pub fn encode(kind: RequestKind, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + payload.len());
    buf.put_u8(kind as u8);
    buf.put_slice(payload);
    buf.freeze()
}

/// Client request to join the arena under a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub name: String,
}

impl JoinRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn encode(&self) -> Bytes {
        let mut payload = BytesMut::with_capacity(1 + self.name.len());
        put_name(&mut payload, &self.name);
        encode(RequestKind::PlayerJoin, &payload)
    }

    /// Decodes the payload that follows the `PlayerJoin` kind byte.
    pub fn decode(mut payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::TruncatedPacket("join request has no name"));
        }
        let name_len = payload.get_u8() as usize;
        if payload.remaining() < name_len {
            return Err(ProtocolError::TruncatedPacket("join request name"));
        }
        Ok(Self {
            name: take_name(&mut payload, name_len)?,
        })
    }
}

/// Client request to step one unit in a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub direction: Direction,
}

impl MoveRequest {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    pub fn encode(&self) -> Bytes {
        encode(RequestKind::PlayerMove, &[self.direction as u8])
    }

    /// Decodes the payload that follows the `PlayerMove` kind byte.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let &byte = payload
            .first()
            .ok_or(ProtocolError::TruncatedPacket("move request has no direction"))?;
        Ok(Self {
            direction: Direction::try_from(byte)?,
        })
    }
}

pub fn connect_request() -> Bytes {
    encode(RequestKind::Connect, &[])
}

pub fn leave_request() -> Bytes {
    encode(RequestKind::PlayerLeft, &[])
}

pub fn attack_request() -> Bytes {
    encode(RequestKind::PlayerAttack, &[])
}

/// Payload of the roster snapshot: a count followed by every record.
pub fn roster_payload<'a, I>(players: I) -> Bytes
where
    I: IntoIterator<Item = &'a Player>,
    I::IntoIter: ExactSizeIterator,
{
    let players = players.into_iter();
    let mut buf = BytesMut::with_capacity(8 + players.len() * Player::MIN_ENCODED_LEN);
    buf.put_u64(players.len() as u64);
    for player in players {
        player.encode(&mut buf);
    }
    buf.freeze()
}

pub fn player_payload(player: &Player) -> Bytes {
    let mut buf = BytesMut::with_capacity(player.encoded_len());
    player.encode(&mut buf);
    buf.freeze()
}

pub fn leave_payload(id: u64) -> Bytes {
    Bytes::copy_from_slice(&id.to_be_bytes())
}

pub fn move_payload(id: u64, position: Position) -> Bytes {
    let mut buf = BytesMut::with_capacity(16);
    buf.put_u64(id);
    buf.put_i32(position.x);
    buf.put_i32(position.y);
    buf.freeze()
}

/// A server→client message, decoded on the client side.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Roster(Vec<Player>),
    Joined(Player),
    Left(u64),
    Moved { id: u64, position: Position },
}

impl ServerEvent {
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (kind, mut payload) = decode_envelope(bytes)?;
        match kind {
            RequestKind::PlayerCount => {
                if payload.remaining() < 8 {
                    return Err(ProtocolError::TruncatedPacket("roster count"));
                }
                let count = payload.get_u64();
                if count > (payload.remaining() / Player::MIN_ENCODED_LEN) as u64 {
                    return Err(ProtocolError::TruncatedPacket("roster records"));
                }
                let players = (0..count)
                    .map(|_| Player::decode(&mut payload))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ServerEvent::Roster(players))
            }
            RequestKind::PlayerJoin => Ok(ServerEvent::Joined(Player::decode(&mut payload)?)),
            RequestKind::PlayerLeft => {
                if payload.remaining() < 8 {
                    return Err(ProtocolError::TruncatedPacket("leave event"));
                }
                Ok(ServerEvent::Left(payload.get_u64()))
            }
            RequestKind::PlayerMove => {
                if payload.remaining() < 16 {
                    return Err(ProtocolError::TruncatedPacket("move event"));
                }
                let id = payload.get_u64();
                let x = payload.get_i32();
                let y = payload.get_i32();
                Ok(ServerEvent::Moved {
                    id,
                    position: Position { x, y },
                })
            }
            RequestKind::Connect | RequestKind::PlayerAttack => {
                Err(ProtocolError::MalformedPacket("not a server message"))
            }
        }
    }
}
