//! Player roster and slot allocation for the arena server
//!
//! The registry owns every player record the server has ever created. Records
//! live in a dense vector indexed by slot; ids are a separate logical key
//! resolved through an index map. Leaving marks a slot inactive and puts it
//! on a free list, and the next join reactivates the lowest free slot with
//! its original id, so ids only grow when every slot is in use.

use crate::error::{PlayerKey, Result, ServerError};
use log::info;
use shared::protocol::bounded_name;
use shared::{step, Direction, Player, Position, WorldBounds};
use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;

/// One roster slot: the replicated player state plus where to reach it
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub player: Player,
    /// Last known endpoint of the client owning this slot
    pub endpoint: SocketAddr,
    active: bool,
}

impl PlayerRecord {
    fn vacant(id: u64, endpoint: SocketAddr) -> Self {
        Self {
            player: Player::new(id, String::new()),
            endpoint,
            active: false,
        }
    }

    /// Resets the slot to spawn state for a new owner. The id is kept.
    fn activate(&mut self, name: &str, endpoint: SocketAddr) {
        self.player = Player::new(self.player.id, bounded_name(name));
        self.endpoint = endpoint;
        self.active = true;
    }

    pub fn id(&self) -> u64 {
        self.player.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Result of a successful [`Registry::allocate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub id: u64,
    /// Active player previously registered at the same endpoint, released
    /// to keep one active record per endpoint
    pub replaced: Option<u64>,
}

pub struct Registry {
    slots: Vec<PlayerRecord>,
    /// Inactive slot indices, lowest reused first
    free_slots: BTreeSet<usize>,
    by_id: HashMap<u64, usize>,
    /// Active records only
    by_endpoint: HashMap<SocketAddr, usize>,
    next_id: u64,
    max_players: usize,
    world: WorldBounds,
}

impl Registry {
    /// Creates an empty roster. Ids start from 1.
    pub fn new(max_players: usize, world: WorldBounds) -> Self {
        Self {
            slots: Vec::new(),
            free_slots: BTreeSet::new(),
            by_id: HashMap::new(),
            by_endpoint: HashMap::new(),
            next_id: 1,
            max_players,
            world,
        }
    }

    pub fn find_by_endpoint(&self, endpoint: SocketAddr) -> Option<u64> {
        self.by_endpoint
            .get(&endpoint)
            .map(|&slot| self.slots[slot].id())
    }

    /// Registers a player at `endpoint`, reusing a released slot if one exists
    ///
    /// A reused slot keeps its id; otherwise the next id from the counter is
    /// assigned and a new slot appended. Either way the record comes out with
    /// the same spawn state.
    pub fn allocate(&mut self, name: &str, endpoint: SocketAddr) -> Result<Allocation> {
        let replaced = match self.find_by_endpoint(endpoint) {
            Some(existing) => {
                self.release(existing);
                Some(existing)
            }
            None => None,
        };

        let slot = match self.free_slots.pop_first() {
            Some(slot) => slot,
            None => {
                if self.slots.len() >= self.max_players {
                    return Err(ServerError::RosterFull(self.max_players));
                }
                let id = self.next_id;
                self.next_id += 1;
                self.slots.push(PlayerRecord::vacant(id, endpoint));
                self.by_id.insert(id, self.slots.len() - 1);
                self.slots.len() - 1
            }
        };

        let record = &mut self.slots[slot];
        record.activate(name, endpoint);
        self.by_endpoint.insert(endpoint, slot);

        info!(
            "Player {} ({:?}) joined from {}",
            record.id(),
            record.player.name,
            endpoint
        );

        Ok(Allocation {
            id: record.id(),
            replaced,
        })
    }

    /// Marks a player inactive and frees its slot for reuse
    ///
    /// The record keeps its id and name for diagnostics but no longer shows
    /// up in lookups or snapshots. Returns `None` if the id is unknown or
    /// already released.
    pub fn release(&mut self, id: u64) -> Option<&PlayerRecord> {
        let slot = *self.by_id.get(&id)?;
        let record = &mut self.slots[slot];
        if !record.active {
            return None;
        }

        record.active = false;
        self.by_endpoint.remove(&record.endpoint);
        self.free_slots.insert(slot);

        info!("Player {} ({:?}) left", record.id(), record.player.name);
        Some(&self.slots[slot])
    }

    /// Steps an active player one unit and returns the clamped position
    pub fn apply_move(&mut self, id: u64, direction: Direction) -> Result<Position> {
        let world = self.world;
        let record = self
            .active_mut(id)
            .ok_or(ServerError::UnknownPlayer(PlayerKey::Id(id)))?;

        record.player.position = step(record.player.position, direction, &world);
        record.player.facing = direction;
        Ok(record.player.position)
    }

    /// Active records in slot order
    pub fn snapshot(&self) -> Vec<&PlayerRecord> {
        self.slots.iter().filter(|record| record.active).collect()
    }

    /// Looks up a record by id, including released ones
    pub fn get(&self, id: u64) -> Option<&PlayerRecord> {
        self.by_id.get(&id).map(|&slot| &self.slots[slot])
    }

    /// Number of active players
    pub fn len(&self) -> usize {
        self.by_endpoint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_endpoint.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_players
    }

    pub fn world(&self) -> &WorldBounds {
        &self.world
    }

    fn active_mut(&mut self, id: u64) -> Option<&mut PlayerRecord> {
        let slot = *self.by_id.get(&id)?;
        Some(&mut self.slots[slot]).filter(|record| record.active)
    }

    #[cfg(test)]
    pub(crate) fn place(&mut self, id: u64, position: Position) {
        let world = self.world;
        if let Some(record) = self.active_mut(id) {
            record.player.position = world.clamp(position);
        }
    }
}
