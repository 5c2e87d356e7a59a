//! Obituary extraction plug-in
//!
//! Emits one record per obituary event with attacker/target identity,
//! team affiliation and the mean of death. Player names are optional and
//! interned in the plug-in's own pool; records hold handles into it.

use crate::arena::{PooledString, StringPool};
use crate::decoder::{CommandEvent, GamestateEvent, ParserState, SnapshotEvent};
use crate::info_string::strip_color_codes;
use crate::normalizer::MeanOfDeath;
use crate::plugin::ParserPlugin;
use crate::MAX_CLIENTS;

/// One decoded obituary
#[derive(Debug, Clone, Copy)]
pub struct ObituaryRecord {
    pub game_state_index: i32,
    pub server_time_ms: i32,
    /// -1 for world kills
    pub attacker_index: i32,
    pub target_index: i32,
    /// -1 when the team is unknown
    pub attacker_team: i32,
    pub target_team: i32,
    pub mean_of_death: MeanOfDeath,
    pub mean_of_death_name: &'static str,
    pub attacker_name: Option<PooledString>,
    pub target_name: Option<PooledString>,
}

/// Name-pool reservation per recording; grown on demand past this.
const NAME_POOL_RESERVE: usize = 64 * 1024;

pub struct ObituariesPlugin {
    collect_names: bool,
    player_teams: [i32; MAX_CLIENTS],
    records: Vec<ObituaryRecord>,
    names: StringPool,
}

impl ObituariesPlugin {
    pub fn new(collect_names: bool) -> Self {
        let mut names = StringPool::new();
        if collect_names {
            names.reserve(NAME_POOL_RESERVE);
        }
        Self {
            collect_names,
            player_teams: [-1; MAX_CLIENTS],
            records: Vec::new(),
            names,
        }
    }

    pub fn records(&self) -> &[ObituaryRecord] {
        &self.records
    }

    /// Resolve a name handle from one of this plug-in's records.
    pub fn name(&self, handle: PooledString) -> &str {
        self.names.get(handle)
    }

    /// Color-stripped name of a client, interned; `None` when names are
    /// disabled or the slot is empty. World kills intern `"world"`.
    fn intern_player_name(
        &mut self,
        state: &ParserState,
        client: Option<i32>,
    ) -> Option<PooledString> {
        if !self.collect_names {
            return None;
        }
        let Some(client) = client else {
            return Some(self.names.intern("world"));
        };
        let cs_index = state
            .normalizer
            .player_config_string_index(client as usize)?;
        let raw = state.config_strings.parse_info_value(cs_index, "n")?;
        if raw.is_empty() {
            return None;
        }
        Some(self.names.intern(&strip_color_codes(raw)))
    }

    fn refresh_team(&mut self, state: &ParserState, client: usize) {
        let Some(cs_index) = state.normalizer.player_config_string_index(client) else {
            return;
        };
        if let Some(team) = state.config_strings.parse_info_value_as_int(cs_index, "t") {
            self.player_teams[client] = team;
        }
    }
}

impl ParserPlugin for ObituariesPlugin {
    fn reset(&mut self) {
        self.player_teams = [-1; MAX_CLIENTS];
        self.records.clear();
        self.names.reset();
    }

    fn on_gamestate(&mut self, state: &ParserState, _event: &GamestateEvent) {
        self.player_teams = [-1; MAX_CLIENTS];
        for client in 0..MAX_CLIENTS {
            self.refresh_team(state, client);
        }
    }

    fn on_command(&mut self, state: &ParserState, _event: &CommandEvent<'_>) {
        // Team refresh keys off the plain three-token `cs` form only.
        let tokenizer = &state.tokenizer;
        if tokenizer.arg(0) != "cs" || tokenizer.arg_count() != 3 {
            return;
        }
        let Ok(cs_index) = tokenizer.arg(1).parse::<usize>() else {
            return;
        };
        if let Some(client) = state.normalizer.client_of_config_string(cs_index) {
            self.refresh_team(state, client);
        }
    }

    fn on_snapshot(&mut self, state: &ParserState, event: &SnapshotEvent<'_>) {
        for changed in event.changed_entities {
            if !changed.is_new_event {
                continue;
            }
            let Some(obituary) = state.normalizer.obituary_from_entity(&changed.state) else {
                continue;
            };

            let target = obituary.target;
            let attacker = obituary.attacker;
            let attacker_team = attacker.map_or(-1, |a| self.player_teams[a as usize]);
            let target_team = self.player_teams[target as usize];
            let attacker_name = self.intern_player_name(state, attacker);
            let target_name = self.intern_player_name(state, Some(target));

            self.records.push(ObituaryRecord {
                game_state_index: state.game_state_index,
                server_time_ms: event.server_time_ms,
                attacker_index: attacker.unwrap_or(-1),
                target_index: target,
                attacker_team,
                target_team,
                mean_of_death: obituary.mean_of_death,
                mean_of_death_name: obituary.mean_of_death.name(),
                attacker_name,
                target_name,
            });
        }
    }
}
