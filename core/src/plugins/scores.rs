//! Score history plug-in
//!
//! Emits one record every time the score pair changes. In team modes the
//! pair is red/blue; in duel it is first/second place, with the client
//! numbers filled in when the protocol carries them.

use crate::decoder::{CommandEvent, GamestateEvent, ParserState, SnapshotEvent};
use crate::normalizer::ConfigStringId;
use crate::plugin::ParserPlugin;

/// One score change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRecord {
    pub game_state_index: i32,
    pub server_time_ms: i32,
    /// Red team score, or first place score in duel
    pub score1: i32,
    /// Blue team score, or second place score in duel
    pub score2: i32,
    /// First place client number, -1 when unknown
    pub client1: i32,
    /// Second place client number, -1 when unknown
    pub client2: i32,
}

pub struct ScoresPlugin {
    records: Vec<ScoreRecord>,
    current: Option<ScoreRecord>,
    pending_initial: bool,
}

impl ScoresPlugin {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            current: None,
            pending_initial: false,
        }
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    /// Assemble the score pair as the config strings stand now.
    fn read_scores(&self, state: &ParserState) -> ScoreRecord {
        let read_int = |id: ConfigStringId| {
            state
                .normalizer
                .config_string_index(id)
                .and_then(|i| state.config_strings.get(i))
                .and_then(|t| t.trim().parse::<i32>().ok())
        };
        ScoreRecord {
            game_state_index: state.game_state_index,
            server_time_ms: state.server_time_ms,
            score1: read_int(ConfigStringId::Scores1).unwrap_or(0),
            score2: read_int(ConfigStringId::Scores2).unwrap_or(0),
            client1: read_int(ConfigStringId::FirstPlaceClientNum).unwrap_or(-1),
            client2: read_int(ConfigStringId::SecondPlaceClientNum).unwrap_or(-1),
        }
    }

    fn push_if_changed(&mut self, state: &ParserState) {
        let next = self.read_scores(state);
        let changed = match &self.current {
            Some(current) => {
                (current.score1, current.score2, current.client1, current.client2)
                    != (next.score1, next.score2, next.client1, next.client2)
            }
            None => true,
        };
        if changed {
            self.records.push(next);
            self.current = Some(next);
        }
    }
}

impl Default for ScoresPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserPlugin for ScoresPlugin {
    fn reset(&mut self) {
        self.records.clear();
        self.current = None;
        self.pending_initial = false;
    }

    fn on_gamestate(&mut self, _state: &ParserState, _event: &GamestateEvent) {
        self.current = None;
        // Emit the segment's opening scores once snapshot time is known.
        self.pending_initial = true;
    }

    fn on_command(&mut self, state: &ParserState, _event: &CommandEvent<'_>) {
        let tokenizer = &state.tokenizer;
        if tokenizer.arg(0) != "cs" {
            return;
        }
        let Ok(cs_index) = tokenizer.arg(1).parse::<usize>() else {
            return;
        };
        let interesting = [
            ConfigStringId::Scores1,
            ConfigStringId::Scores2,
            ConfigStringId::FirstPlaceClientNum,
            ConfigStringId::SecondPlaceClientNum,
        ]
        .into_iter()
        .any(|id| state.normalizer.config_string_index(id) == Some(cs_index));
        if interesting {
            self.push_if_changed(state);
        }
    }

    fn on_snapshot(&mut self, state: &ParserState, _event: &SnapshotEvent<'_>) {
        if self.pending_initial {
            self.pending_initial = false;
            self.push_if_changed(state);
        }
    }
}
