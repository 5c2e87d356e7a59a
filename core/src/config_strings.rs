//! Configuration string table
//!
//! A fixed-capacity indexed mapping from config-string index to text.
//! The table is filled wholesale by a gamestate message and mutated one
//! slot at a time by `cs <index> "<value>"` server commands afterwards.

use crate::error::{Error, Result};
use crate::info_string;
use crate::MAX_CONFIG_STRINGS;

/// 1024-slot string table. Empty slots and explicitly empty strings are
/// indistinguishable on the wire; both read back as `None`.
#[derive(Debug)]
pub struct ConfigStringTable {
    strings: Vec<Option<String>>,
}

impl Default for ConfigStringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStringTable {
    pub fn new() -> Self {
        Self {
            strings: vec![None; MAX_CONFIG_STRINGS],
        }
    }

    /// Store `text` at `index`. An empty string clears the slot, matching
    /// how servers retire config strings.
    pub fn set(&mut self, index: usize, text: &str) -> Result<()> {
        if index >= MAX_CONFIG_STRINGS {
            return Err(Error::InvalidDemoFile(format!(
                "config string index {index} out of range"
            )));
        }
        self.strings[index] = if text.is_empty() {
            None
        } else {
            Some(text.to_owned())
        };
        Ok(())
    }

    /// The string at `index`, if the slot is populated.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index)?.as_deref()
    }

    /// Drop every slot. Called when a gamestate message rebuilds the table.
    pub fn clear(&mut self) {
        for slot in &mut self.strings {
            *slot = None;
        }
    }

    /// Look up `key` in the info string stored at `index`.
    pub fn parse_info_value(&self, index: usize, key: &str) -> Option<&str> {
        info_string::parse_info_value(self.get(index)?, key)
    }

    /// Look up `key` at `index` and parse it as an integer.
    pub fn parse_info_value_as_int(&self, index: usize, key: &str) -> Option<i32> {
        info_string::parse_info_value_as_int(self.get(index)?, key)
    }

    /// The color-stripped, lowercased player name stored at `index`
    /// (a player slot's `n` key), for case-insensitive matching.
    pub fn clean_player_name(&self, index: usize) -> Option<String> {
        let raw = self.parse_info_value(index, "n")?;
        if raw.is_empty() {
            return None;
        }
        Some(info_string::clean_name(raw))
    }
}
