//! Player state and its wire field tables
//!
//! The follower's player state is delta-encoded the same way entity state
//! is, with its own per-family field layout. The `stats[]`,
//! `persistent[]` and `powerups[]` arrays live in dedicated wire index
//! ranges shared by both families; what a given *slot* means is still
//! version-dependent and resolved by the normalizer.

use crate::error::{Error, Result};
use crate::protocol::Protocol;
use crate::wire::MsgReader;

/// First wire field index of the `stats[]` array
pub const STATS_FIELD_BASE: u8 = 64;
/// First wire field index of the `persistent[]` array
pub const PERSISTENT_FIELD_BASE: u8 = 96;
/// First wire field index of the `powerups[]` array
pub const POWERUPS_FIELD_BASE: u8 = 128;
/// Entries in each player-state array
pub const PLAYER_ARRAY_LEN: usize = 16;

/// Canonical player state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub client_num: i32,
    pub pm_type: i32,
    pub origin: [f32; 3],
    pub velocity: [f32; 3],
    pub view_angles: [f32; 3],
    pub ground_entity_num: i32,
    pub weapon: i32,
    pub stats: [i32; PLAYER_ARRAY_LEN],
    pub persistent: [i32; PLAYER_ARRAY_LEN],
    /// Expiry server time per powerup slot; 0 = not held
    pub powerups: [i32; PLAYER_ARRAY_LEN],
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            client_num: -1,
            pm_type: 0,
            origin: [0.0; 3],
            velocity: [0.0; 3],
            view_angles: [0.0; 3],
            ground_entity_num: 0,
            weapon: 0,
            stats: [0; PLAYER_ARRAY_LEN],
            persistent: [0; PLAYER_ARRAY_LEN],
            powerups: [0; PLAYER_ARRAY_LEN],
        }
    }
}

impl PlayerState {
    /// Apply one wire field block on top of this state.
    pub fn apply_delta(&mut self, msg: &mut MsgReader<'_>, protocol: Protocol) -> Result<()> {
        let table = scalar_field_table(protocol);
        msg.read_field_block(|index, value| {
            if let Some(slot) = array_slot(index, STATS_FIELD_BASE) {
                self.stats[slot] = value;
                return Ok(());
            }
            if let Some(slot) = array_slot(index, PERSISTENT_FIELD_BASE) {
                self.persistent[slot] = value;
                return Ok(());
            }
            if let Some(slot) = array_slot(index, POWERUPS_FIELD_BASE) {
                self.powerups[slot] = value;
                return Ok(());
            }
            let field = table.get(index as usize).ok_or_else(|| {
                Error::InvalidDemoFile(format!("player field index {index} out of range"))
            })?;
            self.set(*field, value);
            Ok(())
        })
    }

    fn set(&mut self, field: Field, value: i32) {
        let f = f32::from_bits(value as u32);
        match field {
            Field::ClientNum => self.client_num = value,
            Field::PmType => self.pm_type = value,
            Field::OriginX => self.origin[0] = f,
            Field::OriginY => self.origin[1] = f,
            Field::OriginZ => self.origin[2] = f,
            Field::VelocityX => self.velocity[0] = f,
            Field::VelocityY => self.velocity[1] = f,
            Field::VelocityZ => self.velocity[2] = f,
            Field::ViewAnglesX => self.view_angles[0] = f,
            Field::ViewAnglesY => self.view_angles[1] = f,
            Field::ViewAnglesZ => self.view_angles[2] = f,
            Field::GroundEntityNum => self.ground_entity_num = value,
            Field::Weapon => self.weapon = value,
        }
    }
}

fn array_slot(index: u8, base: u8) -> Option<usize> {
    let offset = index.checked_sub(base)? as usize;
    (offset < PLAYER_ARRAY_LEN).then_some(offset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ClientNum,
    PmType,
    OriginX,
    OriginY,
    OriginZ,
    VelocityX,
    VelocityY,
    VelocityZ,
    ViewAnglesX,
    ViewAnglesY,
    ViewAnglesZ,
    GroundEntityNum,
    Weapon,
}

const FIELDS_Q3: [Field; 13] = [
    Field::ClientNum,
    Field::PmType,
    Field::OriginX,
    Field::OriginY,
    Field::OriginZ,
    Field::VelocityX,
    Field::VelocityY,
    Field::VelocityZ,
    Field::ViewAnglesX,
    Field::ViewAnglesY,
    Field::ViewAnglesZ,
    Field::GroundEntityNum,
    Field::Weapon,
];

const FIELDS_QL: [Field; 13] = [
    Field::ClientNum,
    Field::PmType,
    Field::GroundEntityNum,
    Field::Weapon,
    Field::OriginX,
    Field::OriginY,
    Field::OriginZ,
    Field::VelocityX,
    Field::VelocityY,
    Field::VelocityZ,
    Field::ViewAnglesX,
    Field::ViewAnglesY,
    Field::ViewAnglesZ,
];

fn scalar_field_table(protocol: Protocol) -> &'static [Field] {
    if protocol.is_quake_live() {
        &FIELDS_QL
    } else {
        &FIELDS_Q3
    }
}

/// Wire field index of a canonical scalar field for `protocol`.
pub fn wire_index_of(protocol: Protocol, name: &str) -> Option<u8> {
    let field = match name {
        "client_num" => Field::ClientNum,
        "pm_type" => Field::PmType,
        "origin_x" => Field::OriginX,
        "origin_y" => Field::OriginY,
        "origin_z" => Field::OriginZ,
        "velocity_x" => Field::VelocityX,
        "velocity_y" => Field::VelocityY,
        "velocity_z" => Field::VelocityZ,
        "view_angles_x" => Field::ViewAnglesX,
        "view_angles_y" => Field::ViewAnglesY,
        "view_angles_z" => Field::ViewAnglesZ,
        "ground_entity_num" => Field::GroundEntityNum,
        "weapon" => Field::Weapon,
        _ => return None,
    };
    scalar_field_table(protocol)
        .iter()
        .position(|f| *f == field)
        .map(|i| i as u8)
}
