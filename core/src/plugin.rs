//! Plug-in dispatcher
//!
//! Plug-ins consume the normalized event stream and accumulate typed
//! output records. The dispatcher owns them for the lifetime of the
//! context and fans events out in registration order; a plug-in's output
//! buffer stays valid until the next parse call on the same context.

use crate::decoder::{CommandEvent, EventSink, GamestateEvent, ParserState, SnapshotEvent};
use crate::plugins::cut_pattern::CutByPatternPlugin;
use crate::plugins::game_state::GameStatePlugin;
use crate::plugins::obituaries::ObituariesPlugin;
use crate::plugins::scores::ScoresPlugin;
use crate::plugins::stats::StatsPlugin;

/// Extraction plug-ins selectable for a parse run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    GameState,
    Obituaries,
    Scores,
    Stats,
}

/// Callbacks every plug-in implements. Default bodies are no-ops so a
/// plug-in only declares the events it consumes.
pub trait ParserPlugin {
    /// Clear all carried state before a new recording.
    fn reset(&mut self);

    fn on_gamestate(&mut self, _state: &ParserState, _event: &GamestateEvent) {}
    fn on_snapshot(&mut self, _state: &ParserState, _event: &SnapshotEvent<'_>) {}
    fn on_command(&mut self, _state: &ParserState, _event: &CommandEvent<'_>) {}

    /// Last call of a parse; plug-ins finalize their output buffers here.
    fn on_finish(&mut self, _state: &ParserState) {}
}

/// One registered plug-in. Closed set; dispatch is a match, not a vtable
/// lookup through caller-registered types.
pub enum PluginInstance {
    GameState(GameStatePlugin),
    Obituaries(ObituariesPlugin),
    Scores(ScoresPlugin),
    Stats(StatsPlugin),
    CutByPattern(CutByPatternPlugin),
}

impl PluginInstance {
    fn as_plugin(&mut self) -> &mut dyn ParserPlugin {
        match self {
            PluginInstance::GameState(p) => p,
            PluginInstance::Obituaries(p) => p,
            PluginInstance::Scores(p) => p,
            PluginInstance::Stats(p) => p,
            PluginInstance::CutByPattern(p) => p,
        }
    }
}

/// The registered plug-ins of one context.
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<PluginInstance>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every registered plug-in (and its output).
    pub fn clear(&mut self) {
        self.plugins.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Register an extraction plug-in. Re-registering a kind replaces the
    /// previous instance.
    pub fn register(&mut self, kind: PluginKind) {
        self.unregister(kind);
        let instance = match kind {
            PluginKind::GameState => PluginInstance::GameState(GameStatePlugin::new()),
            PluginKind::Obituaries => PluginInstance::Obituaries(ObituariesPlugin::new(true)),
            PluginKind::Scores => PluginInstance::Scores(ScoresPlugin::new()),
            PluginKind::Stats => PluginInstance::Stats(StatsPlugin::new()),
        };
        self.plugins.push(instance);
    }

    fn unregister(&mut self, kind: PluginKind) {
        self.plugins.retain(|p| {
            !matches!(
                (p, kind),
                (PluginInstance::GameState(_), PluginKind::GameState)
                    | (PluginInstance::Obituaries(_), PluginKind::Obituaries)
                    | (PluginInstance::Scores(_), PluginKind::Scores)
                    | (PluginInstance::Stats(_), PluginKind::Stats)
            )
        });
    }

    /// Register the cut-by-pattern plug-in, replacing any previous one.
    pub fn register_cut_by_pattern(&mut self, plugin: CutByPatternPlugin) {
        self.plugins
            .retain(|p| !matches!(p, PluginInstance::CutByPattern(_)));
        self.plugins.push(PluginInstance::CutByPattern(plugin));
    }

    /// Reset every plug-in for a fresh recording.
    pub fn reset(&mut self) {
        for plugin in &mut self.plugins {
            plugin.as_plugin().reset();
        }
    }

    /// Run the finalizers in registration order.
    pub fn finish(&mut self, state: &ParserState) {
        for plugin in &mut self.plugins {
            plugin.as_plugin().on_finish(state);
        }
    }

    pub fn game_state(&self) -> Option<&GameStatePlugin> {
        self.plugins.iter().find_map(|p| match p {
            PluginInstance::GameState(inner) => Some(inner),
            _ => None,
        })
    }

    pub fn obituaries(&self) -> Option<&ObituariesPlugin> {
        self.plugins.iter().find_map(|p| match p {
            PluginInstance::Obituaries(inner) => Some(inner),
            _ => None,
        })
    }

    pub fn scores(&self) -> Option<&ScoresPlugin> {
        self.plugins.iter().find_map(|p| match p {
            PluginInstance::Scores(inner) => Some(inner),
            _ => None,
        })
    }

    pub fn stats(&self) -> Option<&StatsPlugin> {
        self.plugins.iter().find_map(|p| match p {
            PluginInstance::Stats(inner) => Some(inner),
            _ => None,
        })
    }

    pub fn cut_by_pattern(&self) -> Option<&CutByPatternPlugin> {
        self.plugins.iter().find_map(|p| match p {
            PluginInstance::CutByPattern(inner) => Some(inner),
            _ => None,
        })
    }
}

impl EventSink for PluginSet {
    fn on_gamestate(&mut self, state: &ParserState, event: &GamestateEvent) {
        for plugin in &mut self.plugins {
            plugin.as_plugin().on_gamestate(state, event);
        }
    }

    fn on_snapshot(&mut self, state: &ParserState, event: &SnapshotEvent<'_>) {
        for plugin in &mut self.plugins {
            plugin.as_plugin().on_snapshot(state, event);
        }
    }

    fn on_command(&mut self, state: &ParserState, event: &CommandEvent<'_>) {
        for plugin in &mut self.plugins {
            plugin.as_plugin().on_command(state, event);
        }
    }
}
