//! Demsaw core - demo stream parsing and analysis
//!
//! This crate reads recorded Quake-family demo streams, reconstructs the
//! evolving world state frame by frame, and drives a pipeline of analyzer
//! plug-ins over the normalized event stream. Plug-ins either emit
//! time-range cuts (chat lines, frag runs, mid-air kills, multi-rail
//! kills, flag captures, flick rails) or extract structured records
//! (obituaries, game states, scores, frag stats).
//!
//! # Architecture
//!
//! - [`Context`] - Per-recording parser state, created once and reused
//! - [`parse_demo_file`] - Decode one recording and run the registered plug-ins
//! - [`parse_demo_files`] - Multi-file driver with worker threads
//! - [`cut_demo_file`] - Run the cut-by-pattern analyzers over one recording
//! - [`split_demo_file`] - Write one output file per gamestate segment
//!
//! Data flows strictly one way: file bytes are framed into messages, the
//! decoder rebuilds config strings and snapshots by applying per-entity
//! deltas against a ring of prior snapshots, the protocol normalizer maps
//! per-version magic numbers onto canonical identifiers, and the plug-in
//! dispatcher fans the resulting events out to the registered plug-ins.

pub mod api;
pub mod arena;
pub mod config_strings;
pub mod crash;
pub mod cut_section;
pub mod decoder;
pub mod entity_state;
pub mod error;
pub mod info_string;
pub mod normalizer;
pub mod player_state;
pub mod plugin;
pub mod plugins;
pub mod protocol;
pub mod snapshot;
pub mod splitter;
pub mod tokenizer;
pub mod wire;

mod context;

pub use api::{
    cut_demo_file, parse_demo_file, parse_demo_files, ChatOperator, ChatRule, CutByChatArg,
    CutByFlagCaptureArg, CutByFlickRailArg, CutByFragArg, CutByMidAirArg, CutByMultiRailArg,
    CutByPatternArg, MultiParseArg, ParseArg, PatternArg, PlayerSelection,
};
pub use context::Context;
pub use crash::{fatal_error, set_crash_handler, CrashHandler};
pub use cut_section::CutSection;
pub use error::{Error, MessageSeverity, Result};
pub use plugin::PluginKind;
pub use protocol::{GameMod, Protocol};
pub use splitter::split_demo_file;

// =============================================================================
// Protocol limits
// =============================================================================

/// Largest legal framed message body, in bytes
pub const MAX_MESSAGE_LENGTH: usize = 16384;

/// Number of entity slots per snapshot
pub const MAX_ENTITIES: usize = 1024;

/// Entity number marking the end of a snapshot's entity list
pub const ENTITY_NONE: u16 = (MAX_ENTITIES - 1) as u16;

/// Entity number standing in for the world (environment kills)
pub const ENTITY_WORLD: u16 = (MAX_ENTITIES - 2) as u16;

/// Number of configuration string slots
pub const MAX_CONFIG_STRINGS: usize = 1024;

/// Number of client slots
pub const MAX_CLIENTS: usize = 64;

/// Prior snapshots kept for delta reconstruction
pub const SNAPSHOT_BACKUP: usize = 32;

/// Reliable server command slots kept for delivery
pub const MAX_RELIABLE_COMMANDS: usize = 64;

/// Area-visibility bit vector size, in bytes
pub const MAX_AREAMASK_BYTES: usize = 32;

/// Longest config string the wire may carry, in bytes
pub const BIG_INFO_STRING: usize = 8192;

/// Longest tokenizable command string and token, in bytes
pub const MAX_STRING_CHARS: usize = 1024;

/// Most tokens one command may produce
pub const MAX_STRING_TOKENS: usize = 1024;
