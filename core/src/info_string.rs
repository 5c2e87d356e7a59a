//! Info string parsing
//!
//! Several config strings carry a `\key\value\key\value` bag (index 0,
//! the server info, most prominently). Keys and values may not contain
//! `\`; a leading or trailing separator is tolerated. Player names carry
//! in-band color escapes (`^` followed by one character) that are
//! stripped before case-insensitive matching.

/// Look up `key` in an info string, borrowing the value.
///
/// Returns `None` when the key is absent. An empty value is `Some("")`.
pub fn parse_info_value<'a>(info: &'a str, key: &str) -> Option<&'a str> {
    let mut parts = info.split('\\');
    // Tolerate a leading separator.
    if info.starts_with('\\') {
        parts.next();
    }
    loop {
        let k = parts.next()?;
        let v = parts.next().unwrap_or("");
        if k.eq_ignore_ascii_case(key) {
            return Some(v);
        }
    }
}

/// Look up `key` and parse its value as a decimal integer.
///
/// Fails (returns `None`) when the key is absent, the value is empty, or
/// the value is not numeric.
pub fn parse_info_value_as_int(info: &str, key: &str) -> Option<i32> {
    parse_info_value(info, key)?.trim().parse().ok()
}

/// Encode a sequence of key/value pairs as an info string.
///
/// Inverse of [`parse_info_value`] for maps whose keys and values contain
/// no `\`.
pub fn encode_info<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (k, v) in pairs {
        out.push('\\');
        out.push_str(k);
        out.push('\\');
        out.push_str(v);
    }
    out
}

/// Strip in-band color escapes: each `^` swallows itself and the next
/// character. A trailing lone `^` is dropped.
pub fn strip_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '^' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Color-strip and lowercase a player name for case-insensitive matching.
///
/// Idempotent: cleaning a cleaned name returns it unchanged.
pub fn clean_name(name: &str) -> String {
    strip_color_codes(name).to_lowercase()
}
