//! Line classification: indentation prefix, leading token, compound detection.
//!
//! This is a deliberate heuristic, not a parser: the leading token is chopped
//! at the first delimiter from a fixed separator set, and everything the
//! keyword tables don't recognize falls back to an ordinary statement. String
//! literals, multi-line expressions and the like get no special handling. The
//! rest of the pipeline only sees this module's narrow interface, so a
//! stricter tokenizer could be substituted without touching it.

use crate::models::Keyword;

/// Delimiters that terminate the leading token of a line.
pub const SEPARATORS: &[char] = &[' ', '=', '(', '[', '{', ':', '\'', '"', '\\'];

/// What role a line plays in the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Whitespace-only: produces no event, touches no state.
    Blank,
    /// An ordinary executable statement (also the fallback).
    Ordinary,
    /// Opens a nested block; continuation clauses carry their keyword too.
    Compound(Keyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a> {
    pub indent: &'a str,
    pub token: &'a str,
    pub kind: LineKind,
}

/// The run of characters before the first separator; the whole stripped line
/// if none occurs (bare `pass`, `break`, `continue`).
pub fn leading_token(stripped: &str) -> &str {
    for (i, ch) in stripped.char_indices() {
        if SEPARATORS.contains(&ch) {
            return &stripped[..i];
        }
    }
    stripped
}

pub fn classify(line: &str) -> Classified<'_> {
    let stripped = line.trim_start();
    let indent = &line[..line.len() - stripped.len()];
    if stripped.is_empty() {
        return Classified {
            indent,
            token: "",
            kind: LineKind::Blank,
        };
    }
    let token = leading_token(stripped);
    let kind = match Keyword::from_token(token) {
        Some(keyword) => LineKind::Compound(keyword),
        None => LineKind::Ordinary,
    };
    Classified {
        indent,
        token,
        kind,
    }
}
