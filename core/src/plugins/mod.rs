//! Parser plug-ins
//!
//! Extraction plug-ins turn the event stream into typed record buffers;
//! the cut-by-pattern plug-in hosts the pattern analyzers and merges
//! their time ranges.

pub mod cut;
pub mod cut_pattern;
pub mod game_state;
pub mod obituaries;
pub mod scores;
pub mod stats;
