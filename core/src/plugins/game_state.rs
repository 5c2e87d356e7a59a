//! Game-state extraction plug-in
//!
//! One record per gamestate segment: where it starts in the file, the
//! snapshot time span, the demo taker, and the matches played inside it.
//! Match boundaries come from the warmup and level-start-time config
//! strings, refined by CPMA's game-info string (`tw`/`ts`) and Quake
//! Live's `g_gameState` server-info value.

use crate::decoder::{CommandEvent, GamestateEvent, ParserState, SnapshotEvent};
use crate::normalizer::ConfigStringId;
use crate::plugin::ParserPlugin;
use crate::protocol::GameMod;

/// One match inside a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchInfo {
    /// Server time the warmup ended; equals `start_time_ms` when there
    /// was no observed warmup
    pub warmup_end_time_ms: i32,
    pub start_time_ms: i32,
    pub end_time_ms: i32,
}

/// One gamestate segment
#[derive(Debug, Clone)]
pub struct GameStateRecord {
    pub game_state_index: i32,
    /// File offset of the gamestate message opening this segment
    pub file_offset: u64,
    pub first_snapshot_time_ms: i32,
    pub last_snapshot_time_ms: i32,
    pub demo_taker_client_num: i32,
    pub matches: Vec<MatchInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QlGameState {
    Unknown,
    PreGame,
    CountDown,
    InProgress,
}

impl QlGameState {
    fn parse(value: &str) -> QlGameState {
        match value {
            "PRE_GAME" => QlGameState::PreGame,
            "COUNT_DOWN" => QlGameState::CountDown,
            "IN_PROGRESS" => QlGameState::InProgress,
            _ => QlGameState::Unknown,
        }
    }
}

pub struct GameStatePlugin {
    records: Vec<GameStateRecord>,
    current: Option<GameStateRecord>,
    /// Start of the open match, with its warmup-end time
    open_match: Option<(i32, i32)>,
    ql_game_state: QlGameState,
    has_snapshot: bool,
}

impl GameStatePlugin {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            current: None,
            open_match: None,
            ql_game_state: QlGameState::Unknown,
            has_snapshot: false,
        }
    }

    pub fn records(&self) -> &[GameStateRecord] {
        &self.records
    }

    fn close_match(&mut self, end_time_ms: i32) {
        if let (Some((warmup_end, start)), Some(current)) = (self.open_match.take(), &mut self.current)
        {
            current.matches.push(MatchInfo {
                warmup_end_time_ms: warmup_end,
                start_time_ms: start,
                end_time_ms,
            });
        }
    }

    fn close_record(&mut self) {
        let last_time = self.current.as_ref().map_or(0, |c| c.last_snapshot_time_ms);
        self.close_match(last_time);
        if let Some(record) = self.current.take() {
            self.records.push(record);
        }
    }

    /// Re-read the match state from the config strings after a gamestate
    /// or an updating `cs` command.
    fn evaluate(&mut self, state: &ParserState) {
        let level_start = state
            .normalizer
            .config_string_index(ConfigStringId::LevelStartTime)
            .and_then(|i| state.config_strings.get(i))
            .and_then(|t| t.trim().parse::<i32>().ok());

        let (in_progress, start_time, warmup_end) = match state.game_mod {
            GameMod::Cpma => {
                // tw = warmup end time, ts = match start time. tw == 0
                // with a positive ts means the match is running.
                let info = state
                    .normalizer
                    .config_string_index(ConfigStringId::CpmaGameInfo)
                    .and_then(|i| state.config_strings.get(i));
                let tw = info
                    .and_then(|t| crate::info_string::parse_info_value_as_int(t, "tw"))
                    .unwrap_or(-1);
                let ts = info
                    .and_then(|t| crate::info_string::parse_info_value_as_int(t, "ts"))
                    .unwrap_or(0);
                (tw == 0 && ts > 0, ts, ts)
            }
            GameMod::Quakelive => {
                let value = state
                    .config_strings
                    .parse_info_value(0, "g_gameState")
                    .unwrap_or("");
                self.ql_game_state = QlGameState::parse(value);
                let start = level_start.unwrap_or(state.server_time_ms);
                (self.ql_game_state == QlGameState::InProgress, start, start)
            }
            _ => {
                // Baseline: a populated warmup string means warmup is
                // still running; level start time opens the match.
                let warmup_active = state
                    .normalizer
                    .config_string_index(ConfigStringId::Warmup)
                    .and_then(|i| state.config_strings.get(i))
                    .is_some();
                let start = level_start.unwrap_or(state.server_time_ms);
                (!warmup_active && level_start.is_some(), start, start)
            }
        };

        match (self.open_match.is_some(), in_progress) {
            (false, true) => self.open_match = Some((warmup_end, start_time)),
            (true, false) => self.close_match(state.server_time_ms),
            _ => {}
        }
    }
}

impl Default for GameStatePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserPlugin for GameStatePlugin {
    fn reset(&mut self) {
        self.records.clear();
        self.current = None;
        self.open_match = None;
        self.ql_game_state = QlGameState::Unknown;
        self.has_snapshot = false;
    }

    fn on_gamestate(&mut self, state: &ParserState, event: &GamestateEvent) {
        self.close_record();
        self.current = Some(GameStateRecord {
            game_state_index: event.game_state_index,
            file_offset: event.file_offset,
            first_snapshot_time_ms: 0,
            last_snapshot_time_ms: 0,
            demo_taker_client_num: event.client_num,
            matches: Vec::new(),
        });
        self.has_snapshot = false;
        self.evaluate(state);
    }

    fn on_command(&mut self, state: &ParserState, _event: &CommandEvent<'_>) {
        let tokenizer = &state.tokenizer;
        if tokenizer.arg(0) != "cs" {
            return;
        }
        // The table was already updated; only re-evaluate when a string
        // we derive match state from changed.
        let Ok(cs_index) = tokenizer.arg(1).parse::<usize>() else {
            return;
        };
        let interesting = [
            ConfigStringId::ServerInfo,
            ConfigStringId::Warmup,
            ConfigStringId::LevelStartTime,
            ConfigStringId::CpmaGameInfo,
        ]
        .into_iter()
        .any(|id| state.normalizer.config_string_index(id) == Some(cs_index));
        if interesting {
            self.evaluate(state);
        }
    }

    fn on_snapshot(&mut self, _state: &ParserState, event: &SnapshotEvent<'_>) {
        if let Some(current) = &mut self.current {
            if !self.has_snapshot {
                current.first_snapshot_time_ms = event.server_time_ms;
                self.has_snapshot = true;
            }
            current.last_snapshot_time_ms = event.server_time_ms;
        }
    }

    fn on_finish(&mut self, _state: &ParserState) {
        self.close_record();
    }
}
