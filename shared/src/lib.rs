//! Protocol types and movement rules shared between the arena server and
//! its clients.

pub mod movement;
pub mod protocol;

pub use movement::{step, Position, WorldBounds, WORLD_HEIGHT, WORLD_WIDTH};
pub use protocol::{
    decode_envelope, encode, Direction, JoinRequest, MoveRequest, Player, ProtocolError,
    RequestKind, ServerEvent, MAX_NAME_LEN,
};
