//! Frag statistics plug-in
//!
//! Per-client kill/death tallies per gamestate segment, built from the
//! obituary stream. Deliberately small; a surface for richer accuracy
//! and award stats to grow into.

use crate::decoder::{GamestateEvent, ParserState, SnapshotEvent};
use crate::plugin::ParserPlugin;
use crate::MAX_CLIENTS;

/// One client's tallies in one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsRecord {
    pub game_state_index: i32,
    pub client_index: i32,
    /// -1 when the team is unknown
    pub team: i32,
    pub kills: u32,
    pub deaths: u32,
    pub suicides: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    kills: u32,
    deaths: u32,
    suicides: u32,
    touched: bool,
}

pub struct StatsPlugin {
    records: Vec<StatsRecord>,
    tallies: [Tally; MAX_CLIENTS],
    game_state_index: i32,
}

impl StatsPlugin {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            tallies: [Tally::default(); MAX_CLIENTS],
            game_state_index: -1,
        }
    }

    pub fn records(&self) -> &[StatsRecord] {
        &self.records
    }

    fn flush_segment(&mut self, state: &ParserState) {
        if self.game_state_index < 0 {
            return;
        }
        for client in 0..MAX_CLIENTS {
            let tally = self.tallies[client];
            if !tally.touched {
                continue;
            }
            let team = state
                .normalizer
                .player_config_string_index(client)
                .and_then(|cs| state.config_strings.parse_info_value_as_int(cs, "t"))
                .unwrap_or(-1);
            self.records.push(StatsRecord {
                game_state_index: self.game_state_index,
                client_index: client as i32,
                team,
                kills: tally.kills,
                deaths: tally.deaths,
                suicides: tally.suicides,
            });
        }
        self.tallies = [Tally::default(); MAX_CLIENTS];
    }
}

impl Default for StatsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserPlugin for StatsPlugin {
    fn reset(&mut self) {
        self.records.clear();
        self.tallies = [Tally::default(); MAX_CLIENTS];
        self.game_state_index = -1;
    }

    fn on_gamestate(&mut self, state: &ParserState, event: &GamestateEvent) {
        self.flush_segment(state);
        self.game_state_index = event.game_state_index;
    }

    fn on_snapshot(&mut self, state: &ParserState, event: &SnapshotEvent<'_>) {
        for changed in event.changed_entities {
            if !changed.is_new_event {
                continue;
            }
            let Some(obituary) = state.normalizer.obituary_from_entity(&changed.state) else {
                continue;
            };
            let target = obituary.target as usize;
            self.tallies[target].deaths += 1;
            self.tallies[target].touched = true;
            match obituary.attacker {
                Some(attacker) if attacker != obituary.target => {
                    let attacker = attacker as usize;
                    self.tallies[attacker].kills += 1;
                    self.tallies[attacker].touched = true;
                }
                Some(_) => self.tallies[target].suicides += 1,
                None => {}
            }
        }
    }

    fn on_finish(&mut self, state: &ParserState) {
        self.flush_segment(state);
    }
}
