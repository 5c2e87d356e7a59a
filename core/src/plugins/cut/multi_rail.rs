//! Multi-rail pattern analyzer
//!
//! Cuts bursts of railgun kills by the tracked player that land inside a
//! sliding time window.

use crate::cut_section::CutSection;
use crate::decoder::{GamestateEvent, ParserState, SnapshotEvent};
use crate::normalizer::MeanOfDeath;
use crate::plugins::cut::CutBuffer;
use crate::plugins::cut_pattern::AnalyzerContext;

/// Multi-rail analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CutByMultiRailArg {
    /// Rail kills needed inside the window
    pub min_kill_count: u32,
    /// Window width
    pub time_between_kills_ms: u32,
}

pub struct MultiRailAnalyzer {
    arg: CutByMultiRailArg,
    /// Rail-kill times inside the current window, oldest first
    window: Vec<i32>,
    last_tracked: Option<i32>,
    cuts: CutBuffer,
}

impl MultiRailAnalyzer {
    pub fn new(arg: CutByMultiRailArg) -> Self {
        Self {
            arg,
            window: Vec::new(),
            last_tracked: None,
            cuts: CutBuffer::default(),
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.last_tracked = None;
        self.cuts.clear();
    }

    pub fn on_gamestate(
        &mut self,
        _ctx: &AnalyzerContext,
        _state: &ParserState,
        _event: &GamestateEvent,
    ) {
        self.window.clear();
    }

    pub fn on_snapshot(
        &mut self,
        ctx: &AnalyzerContext,
        state: &ParserState,
        event: &SnapshotEvent<'_>,
    ) {
        if ctx.tracked_player != self.last_tracked {
            self.window.clear();
            self.last_tracked = ctx.tracked_player;
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
            if obituary.attacker != Some(tracked)
                || obituary.attacker == Some(obituary.target)
                || obituary.mean_of_death != MeanOfDeath::Railgun
            {
                continue;
            }

            let now = event.server_time_ms;
            self.window.push(now);
            let width = self.arg.time_between_kills_ms as i32;
            self.window.retain(|&t| now - t <= width);

            if self.window.len() >= self.arg.min_kill_count as usize {
                // Overlapping bursts collapse in the merge pass.
                self.cuts.push(CutSection {
                    game_state_index: state.game_state_index.max(0) as u32,
                    start_time_ms: self.window[0] - ctx.start_offset_ms,
                    end_time_ms: now + ctx.end_offset_ms,
                    very_short_desc: "rail",
                });
            }
        }
    }

    pub fn finish(&mut self) {
        self.cuts.finish();
    }

    pub fn cut_sections(&self) -> &[CutSection] {
        self.cuts.sections()
    }
}
