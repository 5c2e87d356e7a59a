//! Flag-capture pattern analyzer
//!
//! Follows the tracked player's flag carry: pickup, carry time, capture.
//! The pickup origin (flag in base or missing) is read from the
//! flag-status config string as it stood before the pickup.

use crate::cut_section::CutSection;
use crate::decoder::{GamestateEvent, ParserState, SnapshotEvent};
use crate::entity_state::EntityFlags;
use crate::normalizer::{
    ConfigStringId, EntityType, FlagStatus, PersistentId, Powerup,
};
use crate::plugins::cut::CutBuffer;
use crate::plugins::cut_pattern::AnalyzerContext;

/// Flag-capture analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CutByFlagCaptureArg {
    pub min_carry_time_ms: i32,
    pub max_carry_time_ms: i32,
    /// Accept captures of a flag picked up in its base
    pub allow_base_to_base: bool,
    /// Accept captures of a flag picked up while listed missing
    pub allow_missing_to_base: bool,
}

#[derive(Debug, Clone, Copy)]
struct Carry {
    flag: Powerup,
    pickup_time_ms: i32,
    /// Where the flag was right before the pickup
    pickup_origin: FlagStatus,
}

pub struct FlagCaptureAnalyzer {
    arg: CutByFlagCaptureArg,
    carry: Option<Carry>,
    /// Red and blue flag status as of the previous snapshot
    previous_status: [FlagStatus; 2],
    /// Capture counter as of the previous snapshot, when followed
    previous_captures: Option<i32>,
    last_tracked: Option<i32>,
    cuts: CutBuffer,
}

impl FlagCaptureAnalyzer {
    pub fn new(arg: CutByFlagCaptureArg) -> Self {
        Self {
            arg,
            carry: None,
            previous_status: [FlagStatus::InBase; 2],
            previous_captures: None,
            last_tracked: None,
            cuts: CutBuffer::default(),
        }
    }

    pub fn reset(&mut self) {
        self.carry = None;
        self.previous_status = [FlagStatus::InBase; 2];
        self.previous_captures = None;
        self.last_tracked = None;
        self.cuts.clear();
    }

    pub fn on_gamestate(
        &mut self,
        _ctx: &AnalyzerContext,
        _state: &ParserState,
        _event: &GamestateEvent,
    ) {
        self.carry = None;
        self.previous_status = [FlagStatus::InBase; 2];
        self.previous_captures = None;
    }

    pub fn on_snapshot(
        &mut self,
        ctx: &AnalyzerContext,
        state: &ParserState,
        event: &SnapshotEvent<'_>,
    ) {
        if ctx.tracked_player != self.last_tracked {
            self.carry = None;
            self.previous_captures = None;
            self.last_tracked = ctx.tracked_player;
        }
        let Some(tracked) = ctx.tracked_player else {
            return;
        };

        let held = self.held_flag(state, event, tracked);
        let captures = self.captures_counter(state, event, tracked);
        let award_cap = self.award_cap_set(state, event, tracked);

        match (self.carry, held) {
            (None, Some(flag)) => {
                self.carry = Some(Carry {
                    flag,
                    pickup_time_ms: event.server_time_ms,
                    pickup_origin: self.origin_of(flag),
                });
            }
            (Some(carry), None) => {
                let captured = match (captures, self.previous_captures) {
                    (Some(now), Some(before)) => now > before,
                    _ => award_cap,
                };
                if captured {
                    self.emit_if_allowed(ctx, state, &carry, event.server_time_ms);
                }
                self.carry = None;
            }
            (Some(previous), Some(flag)) if previous.flag != flag => {
                // Swapped flags without an observed drop; restart the carry.
                self.carry = Some(Carry {
                    flag,
                    pickup_time_ms: event.server_time_ms,
                    pickup_origin: self.origin_of(flag),
                });
            }
            _ => {}
        }

        self.previous_captures = captures.or(self.previous_captures);
        self.sample_flag_status(state);
    }

    /// The flag powerup the tracked player holds in this snapshot.
    fn held_flag(
        &self,
        state: &ParserState,
        event: &SnapshotEvent<'_>,
        tracked: i32,
    ) -> Option<Powerup> {
        const FLAGS: [Powerup; 3] = [Powerup::RedFlag, Powerup::BlueFlag, Powerup::NeutralFlag];

        if event.player_state.client_num == tracked {
            return FLAGS.into_iter().find(|&flag| {
                state
                    .normalizer
                    .powerup_slot(flag)
                    .is_some_and(|slot| event.player_state.powerups[slot] != 0)
            });
        }

        let entity = self.tracked_entity(state, event, tracked)?;
        FLAGS.into_iter().find(|&flag| {
            state
                .normalizer
                .powerup_slot(flag)
                .is_some_and(|slot| entity & (1 << slot) != 0)
        })
    }

    /// Powerup bits of the tracked player's entity, from the full frame.
    fn tracked_entity(
        &self,
        state: &ParserState,
        event: &SnapshotEvent<'_>,
        tracked: i32,
    ) -> Option<i32> {
        event.snapshot.active_entities().find_map(|entity| {
            let is_player = matches!(
                state.normalizer.entity_type(entity.entity_type),
                Some(EntityType::Player)
            );
            (is_player && entity.client_num == tracked).then_some(entity.powerups)
        })
    }

    fn captures_counter(
        &self,
        state: &ParserState,
        event: &SnapshotEvent<'_>,
        tracked: i32,
    ) -> Option<i32> {
        if event.player_state.client_num != tracked {
            return None;
        }
        let slot = state.normalizer.persistent_slot(PersistentId::Captures)?;
        Some(event.player_state.persistent[slot])
    }

    /// Whether the tracked player's entity newly shows the capture award.
    fn award_cap_set(&self, state: &ParserState, event: &SnapshotEvent<'_>, tracked: i32) -> bool {
        event.changed_entities.iter().any(|changed| {
            let entity = &changed.state;
            let is_player = matches!(
                state.normalizer.entity_type(entity.entity_type),
                Some(EntityType::Player)
            );
            is_player
                && entity.client_num == tracked
                && state
                    .normalizer
                    .entity_flags(entity.flags)
                    .contains(EntityFlags::AWARD_CAP)
        })
    }

    /// Pickup origin: the carried flag's status before this snapshot.
    fn origin_of(&self, flag: Powerup) -> FlagStatus {
        match flag {
            Powerup::RedFlag => self.previous_status[0],
            Powerup::BlueFlag => self.previous_status[1],
            _ => FlagStatus::InBase,
        }
    }

    /// Refresh the red/blue status pair from the config string.
    fn sample_flag_status(&mut self, state: &ParserState) {
        let Some(index) = state
            .normalizer
            .config_string_index(ConfigStringId::FlagStatus)
        else {
            return;
        };
        let Some(text) = state.config_strings.get(index) else {
            return;
        };
        let mut chars = text.chars();
        if let Some(status) = chars.next().and_then(FlagStatus::from_digit) {
            self.previous_status[0] = status;
        }
        if let Some(status) = chars.next().and_then(FlagStatus::from_digit) {
            self.previous_status[1] = status;
        }
    }

    fn emit_if_allowed(
        &mut self,
        ctx: &AnalyzerContext,
        state: &ParserState,
        carry: &Carry,
        capture_time_ms: i32,
    ) {
        let carry_time = capture_time_ms - carry.pickup_time_ms;
        if carry_time < self.arg.min_carry_time_ms || carry_time > self.arg.max_carry_time_ms {
            return;
        }
        let allowed = match carry.pickup_origin {
            FlagStatus::InBase => self.arg.allow_base_to_base,
            FlagStatus::Missing => self.arg.allow_missing_to_base,
            FlagStatus::Captured => false,
        };
        if !allowed {
            return;
        }
        self.cuts.push(CutSection {
            game_state_index: state.game_state_index.max(0) as u32,
            start_time_ms: capture_time_ms - ctx.start_offset_ms,
            end_time_ms: capture_time_ms + ctx.end_offset_ms,
            very_short_desc: "capture",
        });
    }

    pub fn finish(&mut self) {
        self.cuts.finish();
    }

    pub fn cut_sections(&self) -> &[CutSection] {
        self.cuts.sections()
    }
}
