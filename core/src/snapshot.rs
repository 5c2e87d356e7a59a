//! Snapshots and the delta-parent ring
//!
//! A snapshot is one decoded server-time frame: the follower's player
//! state plus the full active entity set after applying that frame's
//! deltas. The ring keeps the last 32 snapshots as plain values indexed
//! by `message_sequence & 31`; parent lookup is an array probe against
//! the stored sequence number, never a pointer chase.

use crate::entity_state::EntityState;
use crate::player_state::PlayerState;
use crate::{MAX_AREAMASK_BYTES, MAX_ENTITIES, SNAPSHOT_BACKUP};

/// One decoded frame
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Cleared when delta reconstruction failed for this frame
    pub valid: bool,
    pub message_sequence: i32,
    pub server_time_ms: i32,
    pub snap_flags: u8,
    /// Execute reliable commands up to this sequence before this frame
    pub server_command_sequence: i32,
    pub areamask: [u8; MAX_AREAMASK_BYTES],
    pub player_state: PlayerState,
    entities: Box<[EntityState]>,
    active: Box<[bool]>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            valid: false,
            message_sequence: -1,
            server_time_ms: 0,
            snap_flags: 0,
            server_command_sequence: 0,
            areamask: [0; MAX_AREAMASK_BYTES],
            player_state: PlayerState::default(),
            entities: vec![EntityState::default(); MAX_ENTITIES].into_boxed_slice(),
            active: vec![false; MAX_ENTITIES].into_boxed_slice(),
        }
    }
}

impl Snapshot {
    /// The entity in `slot`, if the most recent delta chain set it.
    pub fn entity(&self, slot: usize) -> Option<&EntityState> {
        (slot < MAX_ENTITIES && self.active[slot]).then(|| &self.entities[slot])
    }

    /// Raw slot access for delta application; inactive slots hold the
    /// baseline-cleared state.
    pub fn entity_mut(&mut self, slot: usize) -> &mut EntityState {
        &mut self.entities[slot]
    }

    pub fn is_active(&self, slot: usize) -> bool {
        slot < MAX_ENTITIES && self.active[slot]
    }

    pub fn set_active(&mut self, slot: usize, active: bool) {
        self.active[slot] = active;
    }

    /// Iterate the active entity set in slot order.
    pub fn active_entities(&self) -> impl Iterator<Item = &EntityState> {
        self.entities
            .iter()
            .zip(self.active.iter())
            .filter_map(|(e, &a)| a.then_some(e))
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }
}

/// Fixed ring of the last [`SNAPSHOT_BACKUP`] snapshots.
#[derive(Debug, Default)]
pub struct SnapshotRing {
    slots: [Option<Snapshot>; SNAPSHOT_BACKUP],
}

impl SnapshotRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot`, evicting whatever shared its ring slot.
    pub fn insert(&mut self, snapshot: Snapshot) {
        let slot = (snapshot.message_sequence as usize) & (SNAPSHOT_BACKUP - 1);
        self.slots[slot] = Some(snapshot);
    }

    /// The valid snapshot with `sequence`, if it is still in the ring.
    pub fn get(&self, sequence: i32) -> Option<&Snapshot> {
        let slot = (sequence as usize) & (SNAPSHOT_BACKUP - 1);
        self.slots[slot]
            .as_ref()
            .filter(|s| s.message_sequence == sequence && s.valid)
    }

    /// Drop everything; called when a gamestate starts a new segment.
    pub fn invalidate(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}
