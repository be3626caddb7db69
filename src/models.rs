//! Core data model for linetrace

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Compound-statement keywords recognized by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    For,
    While,
    If,
    Elif,
    Else,
    Def,
    Class,
    Try,
    Except,
    Finally,
    With,
}

impl Keyword {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "for" => Some(Keyword::For),
            "while" => Some(Keyword::While),
            "if" => Some(Keyword::If),
            "elif" => Some(Keyword::Elif),
            "else" => Some(Keyword::Else),
            "def" => Some(Keyword::Def),
            "class" => Some(Keyword::Class),
            "try" => Some(Keyword::Try),
            "except" => Some(Keyword::Except),
            "finally" => Some(Keyword::Finally),
            "with" => Some(Keyword::With),
            _ => None,
        }
    }

    /// Continuation clauses resume an existing construct instead of
    /// opening an independent statement.
    pub fn is_continuation(self) -> bool {
        matches!(
            self,
            Keyword::Else | Keyword::Elif | Keyword::Except | Keyword::Finally
        )
    }

    /// Loops are the only constructs whose exit is reported back to the
    /// header line, so a runtime can re-highlight it on each iteration.
    pub fn is_loop(self) -> bool {
        matches!(self, Keyword::For | Keyword::While)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::For => "for",
            Keyword::While => "while",
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::Def => "def",
            Keyword::Class => "class",
            Keyword::Try => "try",
            Keyword::Except => "except",
            Keyword::Finally => "finally",
            Keyword::With => "with",
        }
    }
}

/// When an instrumentation call fires relative to its target statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// The statement is about to execute.
    Before,
    /// Control returned to a loop header after its body finished.
    After,
    /// A continuation clause resumed; the highlight must hold in place.
    AfterNull,
}

/// One synthesized instrumentation call.
///
/// `place_lineno` is where the call is rendered; `target_lineno` is the
/// original line number reported to the runtime. The two differ for loop-exit
/// events, which attach to the line just before the dedent. `indent` stays
/// unresolved for a continuation clause until its body's first line is seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub kind: EventKind,
    pub place_lineno: usize,
    pub target_lineno: usize,
    pub indent: Option<String>,
}

/// A normalized input line. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    pub lineno: usize,
    pub text: String,
    pub indent: String,
    pub stripped: String,
}

impl SourceLine {
    pub fn new(lineno: usize, text: &str) -> Self {
        let stripped = text.trim_start();
        let indent = &text[..text.len() - stripped.len()];
        SourceLine {
            lineno,
            text: text.to_string(),
            indent: indent.to_string(),
            stripped: stripped.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.stripped.is_empty()
    }
}

/// One open block on the indentation stack.
///
/// The root frame carries the empty indent and is never popped. A block's
/// indent is unresolved until the first real line inside it is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Root,
    Block {
        cause: Keyword,
        cause_lineno: usize,
        indent: Option<String>,
    },
}

/// Events attached to a single output position, split by kind.
#[derive(Debug, Default, Clone, Serialize)]
pub struct LineBuckets {
    pub before: Vec<TraceEvent>,
    pub after: Vec<TraceEvent>,
    pub after_null: Vec<TraceEvent>,
}

/// Intermediate structures exposed for tooling and test harnesses.
#[derive(Debug, Serialize)]
pub struct Diagnostics {
    pub lines: Vec<SourceLine>,
    pub events: Vec<TraceEvent>,
    pub buckets: BTreeMap<usize, LineBuckets>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A dedent whose indentation matches no enclosing block level.
    #[error("malformed indentation at line {lineno}: dedent matches no enclosing block")]
    MalformedIndentation { lineno: usize },
}

/// Per-file event totals, reported in summaries and run logs.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct EventCounts {
    pub tracepoints: usize,
    pub loop_exits: usize,
    pub clause_resumes: usize,
    pub lines_in: usize,
    pub lines_out: usize,
}

impl EventCounts {
    pub fn tally(events: &[TraceEvent]) -> Self {
        let mut counts = EventCounts::default();
        for event in events {
            match event.kind {
                EventKind::Before => counts.tracepoints += 1,
                EventKind::After => counts.loop_exits += 1,
                EventKind::AfterNull => counts.clause_resumes += 1,
            }
        }
        counts
    }
}

/// Result of instrumenting a single file.
#[derive(Debug, Default, Serialize)]
pub struct FileResult {
    pub file_path: String,
    pub output: Option<String>,
    pub counts: EventCounts,
    pub error: Option<String>,
}

impl FileResult {
    pub fn new(file_path: String, output: String, counts: EventCounts) -> Self {
        FileResult {
            file_path,
            output: Some(output),
            counts,
            error: None,
        }
    }

    pub fn with_error(file_path: String, error: String) -> Self {
        FileResult {
            file_path,
            output: None,
            counts: EventCounts::default(),
            error: Some(error),
        }
    }
}
