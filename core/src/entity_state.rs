//! Entity state and its wire field tables
//!
//! Entity state is the per-entity slice of a snapshot. The wire carries
//! deltas as `(field index, value)` pairs; what a field index means is a
//! property of the protocol family. Both families write into the same
//! canonical struct, so analyzers never see the per-version layouts.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::protocol::Protocol;
use crate::wire::MsgReader;

/// Two bits atop the event field, bumped on each new event instance so
/// that the same event fired twice in a row is distinguishable.
pub const EVENT_INSTANCE_BITS: i32 = 0x300;

bitflags! {
    /// Canonical entity flag bits (`eFlags`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntityFlags: u32 {
        const DEAD              = 0x0000_0001;
        const TICKING           = 0x0000_0002;
        const TELEPORT_BIT      = 0x0000_0004;
        const AWARD_EXCELLENT   = 0x0000_0008;
        const PLAYER_EVENT      = 0x0000_0010;
        const BOUNCE_HALF       = 0x0000_0020;
        const AWARD_GAUNTLET    = 0x0000_0040;
        const NO_DRAW           = 0x0000_0080;
        const FIRING            = 0x0000_0100;
        const KAMIKAZE          = 0x0000_0200;
        const MOVER_STOP        = 0x0000_0400;
        const AWARD_CAP         = 0x0000_0800;
        const TALK              = 0x0000_1000;
        const CONNECTION        = 0x0000_2000;
        const VOTED             = 0x0000_4000;
        const AWARD_IMPRESSIVE  = 0x0000_8000;
        const AWARD_DEFEND      = 0x0001_0000;
        const AWARD_ASSIST      = 0x0002_0000;
        const AWARD_DENIED      = 0x0004_0000;
        const TEAM_VOTED        = 0x0008_0000;
    }
}

/// Canonical entity state
///
/// Raw protocol magic numbers (`entity_type`, `event`, `weapon`, …) are
/// stored as decoded; the normalizer translates them on demand.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntityState {
    pub number: u16,
    pub entity_type: i32,
    pub flags: i32,
    /// Raw event value, instance bits included
    pub event: i32,
    pub event_parm: i32,
    pub model_index: i32,
    pub other_entity_num: i32,
    pub other_entity_num2: i32,
    pub ground_entity_num: i32,
    pub client_num: i32,
    pub weapon: i32,
    pub powerups: i32,
    pub origin: [f32; 3],
    pub origin2: [f32; 3],
    pub angles: [f32; 3],
    /// Trajectory velocity
    pub pos_delta: [f32; 3],
    pub pos_time: i32,
    pub time: i32,
    pub time2: i32,
}

impl EntityState {
    /// The event value with the instance bits stripped.
    pub fn event_id(&self) -> i32 {
        self.event & !EVENT_INSTANCE_BITS
    }

    /// Apply one wire field block on top of this state.
    pub fn apply_delta(&mut self, msg: &mut MsgReader<'_>, protocol: Protocol) -> Result<()> {
        let table = field_table(protocol);
        msg.read_field_block(|index, value| {
            let field = table.get(index as usize).ok_or_else(|| {
                Error::InvalidDemoFile(format!("entity field index {index} out of range"))
            })?;
            self.set(*field, value);
            Ok(())
        })
    }

    fn set(&mut self, field: Field, value: i32) {
        let f = f32::from_bits(value as u32);
        match field {
            Field::EntityType => self.entity_type = value,
            Field::Flags => self.flags = value,
            Field::Event => self.event = value,
            Field::EventParm => self.event_parm = value,
            Field::ModelIndex => self.model_index = value,
            Field::OtherEntityNum => self.other_entity_num = value,
            Field::OtherEntityNum2 => self.other_entity_num2 = value,
            Field::GroundEntityNum => self.ground_entity_num = value,
            Field::ClientNum => self.client_num = value,
            Field::Weapon => self.weapon = value,
            Field::Powerups => self.powerups = value,
            Field::OriginX => self.origin[0] = f,
            Field::OriginY => self.origin[1] = f,
            Field::OriginZ => self.origin[2] = f,
            Field::Origin2X => self.origin2[0] = f,
            Field::Origin2Y => self.origin2[1] = f,
            Field::Origin2Z => self.origin2[2] = f,
            Field::AnglesX => self.angles[0] = f,
            Field::AnglesY => self.angles[1] = f,
            Field::AnglesZ => self.angles[2] = f,
            Field::PosDeltaX => self.pos_delta[0] = f,
            Field::PosDeltaY => self.pos_delta[1] = f,
            Field::PosDeltaZ => self.pos_delta[2] = f,
            Field::PosTime => self.pos_time = value,
            Field::Time => self.time = value,
            Field::Time2 => self.time2 = value,
        }
    }
}

/// Canonical entity field identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    EntityType,
    Flags,
    Event,
    EventParm,
    ModelIndex,
    OtherEntityNum,
    OtherEntityNum2,
    GroundEntityNum,
    ClientNum,
    Weapon,
    Powerups,
    OriginX,
    OriginY,
    OriginZ,
    Origin2X,
    Origin2Y,
    Origin2Z,
    AnglesX,
    AnglesY,
    AnglesZ,
    PosDeltaX,
    PosDeltaY,
    PosDeltaZ,
    PosTime,
    Time,
    Time2,
}

/// Quake 3 family layout (dm3 through dm68)
const FIELDS_Q3: [Field; 26] = [
    Field::EntityType,
    Field::Flags,
    Field::Event,
    Field::EventParm,
    Field::ModelIndex,
    Field::OtherEntityNum,
    Field::OtherEntityNum2,
    Field::GroundEntityNum,
    Field::ClientNum,
    Field::Weapon,
    Field::Powerups,
    Field::OriginX,
    Field::OriginY,
    Field::OriginZ,
    Field::Origin2X,
    Field::Origin2Y,
    Field::Origin2Z,
    Field::AnglesX,
    Field::AnglesY,
    Field::AnglesZ,
    Field::PosDeltaX,
    Field::PosDeltaY,
    Field::PosDeltaZ,
    Field::PosTime,
    Field::Time,
    Field::Time2,
];

/// Quake Live family layout (dm73 and later); movement fields moved to
/// the front when the trajectory block was reworked.
const FIELDS_QL: [Field; 26] = [
    Field::EntityType,
    Field::Flags,
    Field::OriginX,
    Field::OriginY,
    Field::OriginZ,
    Field::PosDeltaX,
    Field::PosDeltaY,
    Field::PosDeltaZ,
    Field::PosTime,
    Field::Event,
    Field::EventParm,
    Field::OtherEntityNum,
    Field::OtherEntityNum2,
    Field::GroundEntityNum,
    Field::ClientNum,
    Field::Weapon,
    Field::Powerups,
    Field::ModelIndex,
    Field::Origin2X,
    Field::Origin2Y,
    Field::Origin2Z,
    Field::AnglesX,
    Field::AnglesY,
    Field::AnglesZ,
    Field::Time,
    Field::Time2,
];

fn field_table(protocol: Protocol) -> &'static [Field] {
    if protocol.is_quake_live() {
        &FIELDS_QL
    } else {
        &FIELDS_Q3
    }
}

/// Wire field index of a canonical field for `protocol`. Exists so tests
/// and the wire writer can build field blocks without duplicating the
/// tables.
pub fn wire_index_of(protocol: Protocol, name: &str) -> Option<u8> {
    let field = match name {
        "entity_type" => Field::EntityType,
        "flags" => Field::Flags,
        "event" => Field::Event,
        "event_parm" => Field::EventParm,
        "model_index" => Field::ModelIndex,
        "other_entity_num" => Field::OtherEntityNum,
        "other_entity_num2" => Field::OtherEntityNum2,
        "ground_entity_num" => Field::GroundEntityNum,
        "client_num" => Field::ClientNum,
        "weapon" => Field::Weapon,
        "powerups" => Field::Powerups,
        "origin_x" => Field::OriginX,
        "origin_y" => Field::OriginY,
        "origin_z" => Field::OriginZ,
        "origin2_x" => Field::Origin2X,
        "origin2_y" => Field::Origin2Y,
        "origin2_z" => Field::Origin2Z,
        "angles_x" => Field::AnglesX,
        "angles_y" => Field::AnglesY,
        "angles_z" => Field::AnglesZ,
        "pos_delta_x" => Field::PosDeltaX,
        "pos_delta_y" => Field::PosDeltaY,
        "pos_delta_z" => Field::PosDeltaZ,
        "pos_time" => Field::PosTime,
        "time" => Field::Time,
        "time2" => Field::Time2,
        _ => return None,
    };
    field_table(protocol)
        .iter()
        .position(|f| *f == field)
        .map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(pairs: &[(u8, i32)]) -> Vec<u8> {
        let mut out = vec![pairs.len() as u8];
        for (idx, val) in pairs {
            out.push(*idx);
            out.extend_from_slice(&val.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_apply_delta_q3() {
        let mut es = EntityState::default();
        let event_idx = wire_index_of(Protocol::Dm68, "event").unwrap();
        let origin_z_idx = wire_index_of(Protocol::Dm68, "origin_z").unwrap();
        let data = block(&[
            (event_idx, 60 | 0x100),
            (origin_z_idx, 128.5f32.to_bits() as i32),
        ]);
        es.apply_delta(&mut MsgReader::new(&data), Protocol::Dm68)
            .unwrap();
        assert_eq!(es.event, 60 | 0x100);
        assert_eq!(es.event_id(), 60);
        assert_eq!(es.origin[2], 128.5);
    }

    #[test]
    fn test_families_disagree_on_layout() {
        let q3 = wire_index_of(Protocol::Dm68, "origin_x").unwrap();
        let ql = wire_index_of(Protocol::Dm90, "origin_x").unwrap();
        assert_ne!(q3, ql);
        // Same canonical outcome through either table.
        let mut a = EntityState::default();
        let mut b = EntityState::default();
        let bits = 10.0f32.to_bits() as i32;
        a.apply_delta(&mut MsgReader::new(&block(&[(q3, bits)])), Protocol::Dm68)
            .unwrap();
        b.apply_delta(&mut MsgReader::new(&block(&[(ql, bits)])), Protocol::Dm90)
            .unwrap();
        assert_eq!(a.origin[0], b.origin[0]);
    }

    #[test]
    fn test_out_of_range_field_index() {
        let mut es = EntityState::default();
        let data = block(&[(200, 1)]);
        assert!(es
            .apply_delta(&mut MsgReader::new(&data), Protocol::Dm68)
            .is_err());
    }
}
