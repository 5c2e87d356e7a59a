//! Mid-air kill pattern analyzer
//!
//! Cuts kills where the victim was airborne: rockets, grenades and BFG
//! shots that connect before the target touches ground again. Victim
//! flight is reconstructed from player entity states.

use crate::cut_section::CutSection;
use crate::decoder::{GamestateEvent, ParserState, SnapshotEvent};
use crate::entity_state::EntityState;
use crate::normalizer::{EntityType, Weapon, WeaponMask};
use crate::plugins::cut::CutBuffer;
use crate::plugins::cut_pattern::AnalyzerContext;
use crate::{ENTITY_NONE, MAX_CLIENTS};

/// Mid-air analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CutByMidAirArg {
    /// Launcher weapons that qualify (rocket, grenade, BFG)
    pub allowed_weapons: WeaponMask,
    /// Victim must have been airborne at least this long
    pub min_air_time_ms: u32,
    /// Victim must have traveled at least this far while airborne
    pub min_distance: f32,
}

/// Per-client flight tracking
#[derive(Debug, Clone, Copy)]
struct AirTrack {
    /// Ground height where the victim last stood
    ground_z: f32,
    airborne_since_ms: Option<i32>,
    takeoff_position: [f32; 3],
    last_position: [f32; 3],
}

impl Default for AirTrack {
    fn default() -> Self {
        Self {
            ground_z: f32::MIN,
            airborne_since_ms: None,
            takeoff_position: [0.0; 3],
            last_position: [0.0; 3],
        }
    }
}

pub struct MidAirAnalyzer {
    arg: CutByMidAirArg,
    tracks: [AirTrack; MAX_CLIENTS],
    cuts: CutBuffer,
}

impl MidAirAnalyzer {
    pub fn new(arg: CutByMidAirArg) -> Self {
        Self {
            arg,
            tracks: [AirTrack::default(); MAX_CLIENTS],
            cuts: CutBuffer::default(),
        }
    }

    pub fn reset(&mut self) {
        self.tracks = [AirTrack::default(); MAX_CLIENTS];
        self.cuts.clear();
    }

    pub fn on_gamestate(
        &mut self,
        _ctx: &AnalyzerContext,
        _state: &ParserState,
        _event: &GamestateEvent,
    ) {
        self.tracks = [AirTrack::default(); MAX_CLIENTS];
    }

    pub fn on_snapshot(
        &mut self,
        ctx: &AnalyzerContext,
        state: &ParserState,
        event: &SnapshotEvent<'_>,
    ) {
        // Update flight tracking before looking at this frame's kills;
        // the victim's final position arrives in the same snapshot.
        for changed in event.changed_entities {
            self.track_player_entity(state, &changed.state, event.server_time_ms);
        }

        let Some(tracked) = ctx.tracked_player else {
            return;
        };
        for changed in event.changed_entities {
            if !changed.is_new_event {
                continue;
            }
            let Some(obituary) = state.normalizer.obituary_from_entity(&changed.state) else {
                continue;
            };
            if obituary.attacker != Some(tracked) || obituary.attacker == Some(obituary.target) {
                continue;
            }
            let Some(weapon) = obituary.mean_of_death.weapon() else {
                continue;
            };
            let is_launcher = matches!(
                weapon,
                Weapon::RocketLauncher | Weapon::GrenadeLauncher | Weapon::Bfg
            );
            if !is_launcher || !self.arg.allowed_weapons.allows(weapon) {
                continue;
            }
            if self.victim_qualifies(obituary.target as usize, event.server_time_ms) {
                self.cuts.push(CutSection {
                    game_state_index: state.game_state_index.max(0) as u32,
                    start_time_ms: event.server_time_ms - ctx.start_offset_ms,
                    end_time_ms: event.server_time_ms + ctx.end_offset_ms,
                    very_short_desc: "midair",
                });
            }
        }
    }

    fn track_player_entity(&mut self, state: &ParserState, entity: &EntityState, time_ms: i32) {
        if !matches!(
            state.normalizer.entity_type(entity.entity_type),
            Some(EntityType::Player)
        ) {
            return;
        }
        let client = entity.client_num;
        if !(0..MAX_CLIENTS as i32).contains(&client) {
            return;
        }
        let track = &mut self.tracks[client as usize];
        let position = entity.origin;
        let grounded = entity.ground_entity_num != ENTITY_NONE as i32;

        if grounded {
            track.ground_z = position[2];
            track.airborne_since_ms = None;
        } else if track.airborne_since_ms.is_none() {
            track.airborne_since_ms = Some(time_ms);
            track.takeoff_position = position;
        }
        track.last_position = position;
    }

    fn victim_qualifies(&self, victim: usize, time_ms: i32) -> bool {
        let track = &self.tracks[victim];
        let Some(since) = track.airborne_since_ms else {
            return false;
        };
        if (time_ms - since) < self.arg.min_air_time_ms as i32 {
            return false;
        }
        if distance(track.takeoff_position, track.last_position) < self.arg.min_distance {
            return false;
        }
        // Above the ground the victim took off from.
        track.last_position[2] > track.ground_z
    }

    pub fn finish(&mut self) {
        self.cuts.finish();
    }

    pub fn cut_sections(&self) -> &[CutSection] {
        self.cuts.sections()
    }
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
