//! Parser context
//!
//! One [`Context`] owns everything a parse touches: the decoder, the
//! registered plug-ins and their output buffers, and the scratch buffer
//! pool. A context serves one parse at a time and is reused across
//! files; plug-in outputs stay valid until the next parse call on the
//! same context.

use crate::arena::ScratchPool;
use crate::cut_section::CutSection;
use crate::decoder::Decoder;
use crate::plugin::{PluginKind, PluginSet};
use crate::plugins::game_state::GameStateRecord;
use crate::plugins::obituaries::ObituaryRecord;
use crate::plugins::scores::ScoreRecord;
use crate::plugins::stats::StatsRecord;

/// Scratch buffers sized for a typical compressed recording.
const SCRATCH_BUFFER_BYTES: usize = 1 << 20;
const SCRATCH_BUFFER_COUNT: usize = 2;

/// Per-recording parser state and plug-in outputs.
pub struct Context {
    pub(crate) decoder: Option<Decoder>,
    pub(crate) plugins: PluginSet,
    pub(crate) scratch: ScratchPool,
    pub(crate) poisoned: bool,
}

impl Context {
    /// Create an empty context with no plug-ins registered.
    pub fn new() -> Self {
        Self {
            decoder: None,
            plugins: PluginSet::new(),
            scratch: ScratchPool::new(SCRATCH_BUFFER_BYTES, SCRATCH_BUFFER_COUNT),
            poisoned: false,
        }
    }

    /// Register an extraction plug-in for subsequent parse calls.
    pub fn register_plugin(&mut self, kind: PluginKind) {
        self.plugins.register(kind);
    }

    /// Drop all registered plug-ins and their outputs.
    pub fn clear_plugins(&mut self) {
        self.plugins.clear();
    }

    /// A fatal error left this context unusable until the next parse
    /// call resets it.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Decoder state left by the last parse: protocol, mod, config
    /// strings, final gamestate index.
    pub fn parser_state(&self) -> Option<&crate::decoder::ParserState> {
        self.decoder.as_ref().map(|decoder| decoder.state())
    }

    /// Obituary records from the last parse, if the plug-in ran.
    pub fn obituaries(&self) -> &[ObituaryRecord] {
        self.plugins
            .obituaries()
            .map_or(&[], |plugin| plugin.records())
    }

    /// Resolve an interned name from an obituary record.
    pub fn obituary_name(&self, handle: crate::arena::PooledString) -> Option<&str> {
        self.plugins.obituaries().map(|plugin| plugin.name(handle))
    }

    /// Game-state records from the last parse, if the plug-in ran.
    pub fn game_states(&self) -> &[GameStateRecord] {
        self.plugins
            .game_state()
            .map_or(&[], |plugin| plugin.records())
    }

    /// Score records from the last parse, if the plug-in ran.
    pub fn scores(&self) -> &[ScoreRecord] {
        self.plugins.scores().map_or(&[], |plugin| plugin.records())
    }

    /// Stats records from the last parse, if the plug-in ran.
    pub fn stats(&self) -> &[StatsRecord] {
        self.plugins.stats().map_or(&[], |plugin| plugin.records())
    }

    /// Merged cut sections from the last cut run on this context.
    pub fn cut_sections(&self) -> &[CutSection] {
        self.plugins
            .cut_by_pattern()
            .map_or(&[], |plugin| plugin.cut_sections())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
