//! Server command tokenizer
//!
//! Reliable server commands arrive as one text line. Tokens are separated
//! by whitespace; a double-quoted run is one token with the quotes
//! stripped. The game guarantees no command exceeds 1024 tokens of 1024
//! bytes each; longer input is clamped to those limits.

use smallvec::SmallVec;

use crate::{MAX_STRING_CHARS, MAX_STRING_TOKENS};

/// Reusable tokenizer scratch. One lives on the context and is re-filled
/// for every delivered command.
#[derive(Debug, Default)]
pub struct CommandTokenizer {
    tokens: SmallVec<[String; 8]>,
}

impl CommandTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize `text`, replacing the previous token list.
    pub fn tokenize(&mut self, text: &str) {
        self.tokens.clear();
        let mut chars = text.char_indices().peekable();

        while let Some(&(start, c)) = chars.peek() {
            if c.is_ascii_whitespace() {
                chars.next();
                continue;
            }
            if self.tokens.len() == MAX_STRING_TOKENS {
                break;
            }

            let token = if c == '"' {
                chars.next();
                let content_start = chars.peek().map_or(text.len(), |&(i, _)| i);
                let mut content_end = text.len();
                for (i, q) in chars.by_ref() {
                    if q == '"' {
                        content_end = i;
                        break;
                    }
                }
                &text[content_start..content_end.min(text.len())]
            } else {
                let mut end = text.len();
                while let Some(&(i, w)) = chars.peek() {
                    if w.is_ascii_whitespace() {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                &text[start..end]
            };

            let clamped = clamp_to_char_boundary(token, MAX_STRING_CHARS);
            self.tokens.push(clamped.to_owned());
        }
    }

    /// Number of tokens in the current command.
    pub fn arg_count(&self) -> usize {
        self.tokens.len()
    }

    /// Token `index`, or `""` past the end (matching the game's tokenizer).
    pub fn arg(&self, index: usize) -> &str {
        self.tokens.get(index).map_or("", String::as_str)
    }
}

fn clamp_to_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        let mut t = CommandTokenizer::new();
        t.tokenize(text);
        (0..t.arg_count()).map(|i| t.arg(i).to_owned()).collect()
    }

    #[test]
    fn test_whitespace_split() {
        assert_eq!(tokens("cs 5 value"), ["cs", "5", "value"]);
        assert_eq!(tokens("  spaced\t\tout  "), ["spaced", "out"]);
        assert!(tokens("").is_empty());
    }

    #[test]
    fn test_quoted_run_is_one_token() {
        assert_eq!(tokens(r#"chat "hello world""#), ["chat", "hello world"]);
        assert_eq!(
            tokens(r#"cs 529 "\n\alice\t\1""#),
            ["cs", "529", r"\n\alice\t\1"]
        );
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        assert_eq!(tokens(r#"chat "no closing"#), ["chat", "no closing"]);
    }

    #[test]
    fn test_empty_quoted_token() {
        assert_eq!(tokens(r#"cs 5 """#), ["cs", "5", ""]);
    }

    #[test]
    fn test_arg_past_end_is_empty() {
        let mut t = CommandTokenizer::new();
        t.tokenize("one");
        assert_eq!(t.arg(5), "");
    }

    #[test]
    fn test_token_length_clamp() {
        let long = "x".repeat(MAX_STRING_CHARS + 10);
        let out = tokens(&long);
        assert_eq!(out[0].len(), MAX_STRING_CHARS);
    }
}
