//! Frag-run pattern analyzer
//!
//! Chains kills whose inter-kill gap stays under a limit and cuts the
//! whole chain once it is long enough. Chains never span a gamestate
//! change or a change of tracked player.

use crate::cut_section::CutSection;
use crate::decoder::{GamestateEvent, ParserState, SnapshotEvent};
use crate::normalizer::MeanOfDeathMask;
use crate::plugins::cut::CutBuffer;
use crate::plugins::cut_pattern::AnalyzerContext;
use crate::MAX_CLIENTS;

/// Frag analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CutByFragArg {
    /// A chain shorter than this is discarded
    pub min_frag_count: u32,
    /// Largest allowed gap between consecutive kills
    pub time_between_frags_sec: u32,
    /// Kills whose mean of death is outside the mask do not count
    pub allowed_means_of_deaths: MeanOfDeathMask,
    /// Chain kills of any single player instead of the tracked one
    pub allow_any_player: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Chain {
    count: u32,
    first_time_ms: i32,
    last_time_ms: i32,
    game_state_index: u32,
}

pub struct FragAnalyzer {
    arg: CutByFragArg,
    chains: [Option<Chain>; MAX_CLIENTS],
    last_tracked: Option<i32>,
    /// Start/end context copied from the plug-in configuration
    offsets: (i32, i32),
    cuts: CutBuffer,
}

impl FragAnalyzer {
    pub fn new(arg: CutByFragArg) -> Self {
        Self {
            arg,
            chains: [None; MAX_CLIENTS],
            last_tracked: None,
            offsets: (0, 0),
            cuts: CutBuffer::default(),
        }
    }

    pub fn reset(&mut self) {
        self.chains = [None; MAX_CLIENTS];
        self.last_tracked = None;
        self.cuts.clear();
    }

    pub fn on_gamestate(
        &mut self,
        ctx: &AnalyzerContext,
        _state: &ParserState,
        _event: &GamestateEvent,
    ) {
        self.offsets = (ctx.start_offset_ms, ctx.end_offset_ms);
        self.close_all();
    }

    pub fn on_snapshot(
        &mut self,
        ctx: &AnalyzerContext,
        state: &ParserState,
        event: &SnapshotEvent<'_>,
    ) {
        self.offsets = (ctx.start_offset_ms, ctx.end_offset_ms);
        if !self.arg.allow_any_player && ctx.tracked_player != self.last_tracked {
            self.close_all();
            self.last_tracked = ctx.tracked_player;
        }

        for changed in event.changed_entities {
            if !changed.is_new_event {
                continue;
            }
            let Some(obituary) = state.normalizer.obituary_from_entity(&changed.state) else {
                continue;
            };
            let Some(attacker) = obituary.attacker else {
                continue;
            };
            if attacker == obituary.target {
                continue;
            }
            if !self.arg.allow_any_player && Some(attacker) != ctx.tracked_player {
                continue;
            }
            if !self
                .arg
                .allowed_means_of_deaths
                .allows(obituary.mean_of_death)
            {
                continue;
            }
            self.record_kill(ctx, state, attacker as usize, event.server_time_ms);
        }
    }

    fn record_kill(
        &mut self,
        _ctx: &AnalyzerContext,
        state: &ParserState,
        attacker: usize,
        time_ms: i32,
    ) {
        let gap_ms = self.arg.time_between_frags_sec as i32 * 1000;
        let game_state_index = state.game_state_index.max(0) as u32;

        if let Some(chain) = &mut self.chains[attacker] {
            let within_gap = time_ms - chain.last_time_ms <= gap_ms;
            if within_gap && chain.game_state_index == game_state_index {
                chain.count += 1;
                chain.last_time_ms = time_ms;
                return;
            }
            let finished = *chain;
            self.emit_if_long_enough(&finished);
        }
        self.chains[attacker] = Some(Chain {
            count: 1,
            first_time_ms: time_ms,
            last_time_ms: time_ms,
            game_state_index,
        });
    }

    fn close_all(&mut self) {
        for slot in 0..MAX_CLIENTS {
            if let Some(chain) = self.chains[slot].take() {
                self.emit_if_long_enough(&chain);
            }
        }
    }

    fn emit_if_long_enough(&mut self, chain: &Chain) {
        if chain.count < self.arg.min_frag_count {
            return;
        }
        self.cuts.push(CutSection {
            game_state_index: chain.game_state_index,
            start_time_ms: chain.first_time_ms - self.offsets.0,
            end_time_ms: chain.last_time_ms + self.offsets.1,
            very_short_desc: "frag",
        });
    }

    pub fn finish(&mut self) {
        self.close_all();
        self.cuts.finish();
    }

    pub fn cut_sections(&self) -> &[CutSection] {
        self.cuts.sections()
    }
}
