//! Cut-by-pattern plug-in
//!
//! Hosts the pattern analyzers, resolves the tracked player, and merges
//! the analyzers' candidate ranges into one disjoint cut list at finish.

use crate::cut_section::{self, CutSection};
use crate::decoder::{CommandEvent, GamestateEvent, ParserState, SnapshotEvent};
use crate::info_string;
use crate::plugin::ParserPlugin;
use crate::plugins::cut::chat::{ChatAnalyzer, CutByChatArg};
use crate::plugins::cut::flag_capture::{CutByFlagCaptureArg, FlagCaptureAnalyzer};
use crate::plugins::cut::flick_rail::{CutByFlickRailArg, FlickRailAnalyzer};
use crate::plugins::cut::frag::{CutByFragArg, FragAnalyzer};
use crate::plugins::cut::mid_air::{CutByMidAirArg, MidAirAnalyzer};
use crate::plugins::cut::multi_rail::{CutByMultiRailArg, MultiRailAnalyzer};
use crate::MAX_CLIENTS;

/// How the tracked player is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSelection {
    /// A literal client index in `[0, 64)`
    Index(u8),
    /// The client that recorded the demo, set at each gamestate
    DemoTaker,
    /// Whoever the first-person camera follows, updated each snapshot
    FirstPersonPlayer,
    /// Case-insensitive, color-stripped name match against player slots
    Name(String),
}

/// One pattern to search for
#[derive(Debug, Clone, PartialEq)]
pub enum PatternArg {
    Chat(CutByChatArg),
    Frag(CutByFragArg),
    MidAir(CutByMidAirArg),
    MultiRail(CutByMultiRailArg),
    FlagCapture(CutByFlagCaptureArg),
    FlickRail(CutByFlickRailArg),
}

/// Configuration of one cut-by-pattern run
#[derive(Debug, Clone, PartialEq)]
pub struct CutByPatternArg {
    /// Seconds of context kept before each matched moment
    pub start_offset_sec: u32,
    /// Seconds of context kept after each matched moment
    pub end_offset_sec: u32,
    pub player: PlayerSelection,
    pub patterns: Vec<PatternArg>,
}

/// Shared per-event view the plug-in hands its analyzers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AnalyzerContext {
    /// Resolved tracked player, when the selection has settled
    pub tracked_player: Option<i32>,
    pub start_offset_ms: i32,
    pub end_offset_ms: i32,
}

/// The pattern analyzers, dispatched by a closed match.
pub(crate) enum PatternAnalyzer {
    Chat(ChatAnalyzer),
    Frag(FragAnalyzer),
    MidAir(MidAirAnalyzer),
    MultiRail(MultiRailAnalyzer),
    FlagCapture(FlagCaptureAnalyzer),
    FlickRail(FlickRailAnalyzer),
}

impl PatternAnalyzer {
    fn reset(&mut self) {
        match self {
            PatternAnalyzer::Chat(a) => a.reset(),
            PatternAnalyzer::Frag(a) => a.reset(),
            PatternAnalyzer::MidAir(a) => a.reset(),
            PatternAnalyzer::MultiRail(a) => a.reset(),
            PatternAnalyzer::FlagCapture(a) => a.reset(),
            PatternAnalyzer::FlickRail(a) => a.reset(),
        }
    }

    fn on_gamestate(&mut self, ctx: &AnalyzerContext, state: &ParserState, event: &GamestateEvent) {
        match self {
            PatternAnalyzer::Chat(_) => {}
            PatternAnalyzer::Frag(a) => a.on_gamestate(ctx, state, event),
            PatternAnalyzer::MidAir(a) => a.on_gamestate(ctx, state, event),
            PatternAnalyzer::MultiRail(a) => a.on_gamestate(ctx, state, event),
            PatternAnalyzer::FlagCapture(a) => a.on_gamestate(ctx, state, event),
            PatternAnalyzer::FlickRail(a) => a.on_gamestate(ctx, state, event),
        }
    }

    fn on_snapshot(&mut self, ctx: &AnalyzerContext, state: &ParserState, event: &SnapshotEvent<'_>) {
        match self {
            PatternAnalyzer::Chat(_) => {}
            PatternAnalyzer::Frag(a) => a.on_snapshot(ctx, state, event),
            PatternAnalyzer::MidAir(a) => a.on_snapshot(ctx, state, event),
            PatternAnalyzer::MultiRail(a) => a.on_snapshot(ctx, state, event),
            PatternAnalyzer::FlagCapture(a) => a.on_snapshot(ctx, state, event),
            PatternAnalyzer::FlickRail(a) => a.on_snapshot(ctx, state, event),
        }
    }

    fn on_command(&mut self, ctx: &AnalyzerContext, state: &ParserState, event: &CommandEvent<'_>) {
        match self {
            PatternAnalyzer::Chat(a) => a.on_command(ctx, state, event),
            _ => {}
        }
    }

    fn finish(&mut self) {
        match self {
            PatternAnalyzer::Chat(a) => a.finish(),
            PatternAnalyzer::Frag(a) => a.finish(),
            PatternAnalyzer::MidAir(a) => a.finish(),
            PatternAnalyzer::MultiRail(a) => a.finish(),
            PatternAnalyzer::FlagCapture(a) => a.finish(),
            PatternAnalyzer::FlickRail(a) => a.finish(),
        }
    }

    fn cut_sections(&self) -> &[CutSection] {
        match self {
            PatternAnalyzer::Chat(a) => a.cut_sections(),
            PatternAnalyzer::Frag(a) => a.cut_sections(),
            PatternAnalyzer::MidAir(a) => a.cut_sections(),
            PatternAnalyzer::MultiRail(a) => a.cut_sections(),
            PatternAnalyzer::FlagCapture(a) => a.cut_sections(),
            PatternAnalyzer::FlickRail(a) => a.cut_sections(),
        }
    }
}

/// The plug-in itself.
pub struct CutByPatternPlugin {
    player: PlayerSelection,
    /// Pre-cleaned name for `PlayerSelection::Name`
    clean_target_name: Option<String>,
    start_offset_ms: i32,
    end_offset_ms: i32,
    tracked_player: Option<i32>,
    analyzers: Vec<PatternAnalyzer>,
    cut_sections: Vec<CutSection>,
}

impl CutByPatternPlugin {
    pub fn new(arg: &CutByPatternArg) -> Self {
        let analyzers = arg
            .patterns
            .iter()
            .map(|pattern| match pattern {
                PatternArg::Chat(a) => PatternAnalyzer::Chat(ChatAnalyzer::new(a.clone())),
                PatternArg::Frag(a) => PatternAnalyzer::Frag(FragAnalyzer::new(a.clone())),
                PatternArg::MidAir(a) => PatternAnalyzer::MidAir(MidAirAnalyzer::new(a.clone())),
                PatternArg::MultiRail(a) => {
                    PatternAnalyzer::MultiRail(MultiRailAnalyzer::new(a.clone()))
                }
                PatternArg::FlagCapture(a) => {
                    PatternAnalyzer::FlagCapture(FlagCaptureAnalyzer::new(a.clone()))
                }
                PatternArg::FlickRail(a) => {
                    PatternAnalyzer::FlickRail(FlickRailAnalyzer::new(a.clone()))
                }
            })
            .collect();
        let clean_target_name = match &arg.player {
            PlayerSelection::Name(name) => Some(info_string::clean_name(name)),
            _ => None,
        };
        Self {
            player: arg.player.clone(),
            clean_target_name,
            start_offset_ms: arg.start_offset_sec as i32 * 1000,
            end_offset_ms: arg.end_offset_sec as i32 * 1000,
            tracked_player: None,
            analyzers,
            cut_sections: Vec::new(),
        }
    }

    /// The merged, disjoint cut list; filled by `on_finish`.
    pub fn cut_sections(&self) -> &[CutSection] {
        &self.cut_sections
    }

    /// The tracked player as currently resolved.
    pub fn tracked_player(&self) -> Option<i32> {
        self.tracked_player
    }

    fn context(&self) -> AnalyzerContext {
        AnalyzerContext {
            tracked_player: self.tracked_player,
            start_offset_ms: self.start_offset_ms,
            end_offset_ms: self.end_offset_ms,
        }
    }

    /// Scan the player config strings for the configured name.
    fn resolve_by_name(&self, state: &ParserState) -> Option<i32> {
        let wanted = self.clean_target_name.as_deref()?;
        for client in 0..MAX_CLIENTS {
            let cs_index = state.normalizer.player_config_string_index(client)?;
            if let Some(name) = state.config_strings.clean_player_name(cs_index) {
                if name == wanted {
                    return Some(client as i32);
                }
            }
        }
        None
    }

    /// Late name resolution from a `cs` update to a player slot. The
    /// 3-token form is left to the extraction plug-ins.
    fn track_player_from_command(&mut self, state: &ParserState) {
        if self.tracked_player.is_some() || self.clean_target_name.is_none() {
            return;
        }
        let tokenizer = &state.tokenizer;
        if tokenizer.arg(0) != "cs" || tokenizer.arg_count() == 3 {
            return;
        }
        let Ok(cs_index) = tokenizer.arg(1).parse::<usize>() else {
            return;
        };
        if state.normalizer.client_of_config_string(cs_index).is_none() {
            return;
        }
        let wanted = self.clean_target_name.as_deref().unwrap_or_default();
        if let Some(name) = state.config_strings.clean_player_name(cs_index) {
            if name == wanted {
                self.tracked_player = state.normalizer.client_of_config_string(cs_index).map(|c| c as i32);
            }
        }
    }
}

impl ParserPlugin for CutByPatternPlugin {
    fn reset(&mut self) {
        self.tracked_player = None;
        self.cut_sections.clear();
        for analyzer in &mut self.analyzers {
            analyzer.reset();
        }
    }

    fn on_gamestate(&mut self, state: &ParserState, event: &GamestateEvent) {
        self.tracked_player = match &self.player {
            PlayerSelection::Index(index) if (*index as usize) < MAX_CLIENTS => {
                Some(*index as i32)
            }
            PlayerSelection::Index(_) => None,
            PlayerSelection::DemoTaker => Some(event.client_num),
            PlayerSelection::FirstPersonPlayer => self.tracked_player,
            PlayerSelection::Name(_) => self.resolve_by_name(state),
        };

        let ctx = self.context();
        for analyzer in &mut self.analyzers {
            analyzer.on_gamestate(&ctx, state, event);
        }
    }

    fn on_snapshot(&mut self, state: &ParserState, event: &SnapshotEvent<'_>) {
        if self.player == PlayerSelection::FirstPersonPlayer {
            let client = event.player_state.client_num;
            if (0..MAX_CLIENTS as i32).contains(&client) {
                self.tracked_player = Some(client);
            }
        }

        let ctx = self.context();
        for analyzer in &mut self.analyzers {
            analyzer.on_snapshot(&ctx, state, event);
        }
    }

    fn on_command(&mut self, state: &ParserState, event: &CommandEvent<'_>) {
        self.track_player_from_command(state);

        let ctx = self.context();
        for analyzer in &mut self.analyzers {
            analyzer.on_command(&ctx, state, event);
        }
    }

    fn on_finish(&mut self, _state: &ParserState) {
        for analyzer in &mut self.analyzers {
            analyzer.finish();
        }
        let outputs: Vec<&[CutSection]> =
            self.analyzers.iter().map(|a| a.cut_sections()).collect();
        self.cut_sections = cut_section::finalize(&outputs);
    }
}
