//! Chat pattern analyzer
//!
//! Matches chat lines against configured rules and cuts a window around
//! each hit. Chat is global; the tracked player plays no part here.

use crate::cut_section::CutSection;
use crate::decoder::{CommandEvent, ParserState};
use crate::info_string::strip_color_codes;
use crate::plugins::cut::CutBuffer;
use crate::plugins::cut_pattern::AnalyzerContext;

/// String operator applied by a chat rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ChatOperator {
    Contains = 0,
    StartsWith,
    EndsWith,
    Equals,
    ContainsNoColor,
    StartsWithNoColor,
    EndsWithNoColor,
    EqualsNoColor,
}

impl ChatOperator {
    pub const COUNT: u32 = 8;

    fn strips_colors(self) -> bool {
        matches!(
            self,
            ChatOperator::ContainsNoColor
                | ChatOperator::StartsWithNoColor
                | ChatOperator::EndsWithNoColor
                | ChatOperator::EqualsNoColor
        )
    }
}

/// One chat matching rule
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRule {
    pub pattern: String,
    pub operator: ChatOperator,
    pub case_sensitive: bool,
    pub ignore_color_codes: bool,
}

impl ChatRule {
    /// Whether `message` satisfies this rule.
    pub fn matches(&self, message: &str) -> bool {
        let strip = self.ignore_color_codes || self.operator.strips_colors();
        let mut message = if strip {
            strip_color_codes(message)
        } else {
            message.to_owned()
        };
        let mut pattern = if strip {
            strip_color_codes(&self.pattern)
        } else {
            self.pattern.clone()
        };
        if !self.case_sensitive {
            message = message.to_lowercase();
            pattern = pattern.to_lowercase();
        }
        match self.operator {
            ChatOperator::Contains | ChatOperator::ContainsNoColor => message.contains(&pattern),
            ChatOperator::StartsWith | ChatOperator::StartsWithNoColor => {
                message.starts_with(&pattern)
            }
            ChatOperator::EndsWith | ChatOperator::EndsWithNoColor => message.ends_with(&pattern),
            ChatOperator::Equals | ChatOperator::EqualsNoColor => message == pattern,
        }
    }
}

/// Chat analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CutByChatArg {
    pub rules: Vec<ChatRule>,
}

pub struct ChatAnalyzer {
    arg: CutByChatArg,
    cuts: CutBuffer,
}

impl ChatAnalyzer {
    pub fn new(arg: CutByChatArg) -> Self {
        Self {
            arg,
            cuts: CutBuffer::default(),
        }
    }

    pub fn reset(&mut self) {
        self.cuts.clear();
    }

    pub fn on_command(
        &mut self,
        ctx: &AnalyzerContext,
        state: &ParserState,
        _event: &CommandEvent<'_>,
    ) {
        let tokenizer = &state.tokenizer;
        if tokenizer.arg_count() != 2 || tokenizer.arg(0) != "chat" {
            return;
        }
        let message = tokenizer.arg(1);
        // First matching rule wins; the rest are not evaluated.
        if !self.arg.rules.iter().any(|rule| rule.matches(message)) {
            return;
        }

        self.cuts.push(CutSection {
            game_state_index: state.game_state_index.max(0) as u32,
            start_time_ms: state.server_time_ms - ctx.start_offset_ms,
            end_time_ms: state.server_time_ms + ctx.end_offset_ms,
            very_short_desc: "chat",
        });
    }

    pub fn finish(&mut self) {
        self.cuts.finish();
    }

    pub fn cut_sections(&self) -> &[CutSection] {
        self.cuts.sections()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, operator: ChatOperator) -> ChatRule {
        ChatRule {
            pattern: pattern.to_owned(),
            operator,
            case_sensitive: false,
            ignore_color_codes: false,
        }
    }

    #[test]
    fn test_operators() {
        assert!(rule("world", ChatOperator::Contains).matches("hello world!"));
        assert!(rule("hello", ChatOperator::StartsWith).matches("hello world"));
        assert!(rule("world", ChatOperator::EndsWith).matches("hello world"));
        assert!(rule("hello world", ChatOperator::Equals).matches("hello world"));
        assert!(!rule("absent", ChatOperator::Contains).matches("hello"));
    }

    #[test]
    fn test_case_insensitive_by_default() {
        assert!(rule("HELLO", ChatOperator::Contains).matches("well hello there"));
        let mut sensitive = rule("HELLO", ChatOperator::Contains);
        sensitive.case_sensitive = true;
        assert!(!sensitive.matches("well hello there"));
    }

    #[test]
    fn test_color_stripping_variants() {
        // The NoColor operator strips codes from the message.
        assert!(rule("gg", ChatOperator::EqualsNoColor).matches("^1g^2g"));
        assert!(!rule("gg", ChatOperator::Equals).matches("^1g^2g"));
        // The flag has the same effect on a plain operator.
        let mut flagged = rule("gg", ChatOperator::Equals);
        flagged.ignore_color_codes = true;
        assert!(flagged.matches("^1g^2g"));
    }
}
