//! The pattern analyzers
//!
//! Each analyzer consumes the callback stream through the cut-by-pattern
//! plug-in and accumulates candidate [`CutSection`](crate::cut_section::CutSection)s
//! in a private buffer, folded into disjoint ranges at finish.

pub mod chat;
pub mod flag_capture;
pub mod flick_rail;
pub mod frag;
pub mod mid_air;
pub mod multi_rail;

use crate::cut_section::{merge_ordered, CutSection};

/// Shared candidate buffer: collects raw ranges during the parse, folds
/// them into disjoint ordered ranges on `finish`.
#[derive(Debug, Default)]
pub(crate) struct CutBuffer {
    pending: Vec<CutSection>,
    merged: Vec<CutSection>,
}

impl CutBuffer {
    pub fn clear(&mut self) {
        self.pending.clear();
        self.merged.clear();
    }

    pub fn push(&mut self, cut: CutSection) {
        self.pending.push(cut);
    }

    pub fn finish(&mut self) {
        self.pending
            .sort_by_key(|c| (c.game_state_index, c.start_time_ms));
        self.merged.clear();
        merge_ordered(&mut self.merged, &self.pending);
    }

    pub fn sections(&self) -> &[CutSection] {
        &self.merged
    }
}
