//! Single forward scan over the line sequence: indentation stack tracking
//! fused with trace-call synthesis.
//!
//! Per non-blank line, in order: resolve any pending indent bindings, emit
//! exactly one event (Before, or AfterNull for continuation clauses), push a
//! frame for compound openers, then close blocks the line dedents out of.
//! Loop frames report their exit with an After event on close; other blocks
//! end silently. A virtual blank sentinel at the end of input forces any
//! still-open loop frames to close at root depth.

use crate::classify::{classify, LineKind};
use crate::models::{EventKind, Frame, SourceLine, TraceEvent, TransformError};

/// A completed scan, ready for rendering.
#[derive(Debug)]
pub struct Trace {
    pub lines: Vec<SourceLine>,
    pub events: Vec<TraceEvent>,
}

pub struct Tracer {
    lines: Vec<SourceLine>,
    stack: Vec<Frame>,
    events: Vec<TraceEvent>,
}

impl Tracer {
    pub fn new(source: &str, tab_width: usize) -> Self {
        let expanded = source.replace('\t', &" ".repeat(tab_width));
        let lines = expanded
            .split('\n')
            .enumerate()
            .map(|(lineno, text)| SourceLine::new(lineno, text))
            .collect();
        Tracer {
            lines,
            stack: vec![Frame::Root],
            events: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<Trace, TransformError> {
        for lineno in 0..self.lines.len() {
            let (kind, indent) = {
                let class = classify(&self.lines[lineno].text);
                (class.kind, class.indent.to_string())
            };
            if kind == LineKind::Blank {
                continue;
            }

            self.bind_pending(&indent);

            if let LineKind::Compound(keyword) = kind {
                let (event_kind, event_indent) = if keyword.is_continuation() {
                    // Resuming a clause is not an independent entry point;
                    // its rendering indent is only known once the body starts.
                    (EventKind::AfterNull, None)
                } else {
                    (EventKind::Before, Some(indent.clone()))
                };
                self.events.push(TraceEvent {
                    kind: event_kind,
                    place_lineno: lineno,
                    target_lineno: lineno,
                    indent: event_indent,
                });
                self.stack.push(Frame::Block {
                    cause: keyword,
                    cause_lineno: lineno,
                    indent: None,
                });
            } else {
                self.events.push(TraceEvent {
                    kind: EventKind::Before,
                    place_lineno: lineno,
                    target_lineno: lineno,
                    indent: Some(indent.clone()),
                });
            }

            self.close_blocks(&indent, lineno)?;
        }

        // Sentinel: a final blank line at root indentation. It emits nothing
        // itself, but runs the bind and dedent steps once more so open loop
        // frames close with their After placed on the last real line.
        let sentinel = self.lines.len();
        self.bind_pending("");
        self.close_blocks("", sentinel)?;

        Ok(Trace {
            lines: self.lines,
            events: self.events,
        })
    }

    /// Lazy indent resolution: a block's indentation is defined by its first
    /// contained line, and the latest event (a continuation clause's
    /// AfterNull) resolves the same way.
    fn bind_pending(&mut self, indent: &str) {
        if let Some(Frame::Block { indent: slot, .. }) = self.stack.last_mut() {
            if slot.is_none() {
                *slot = Some(indent.to_string());
            }
        }
        if let Some(event) = self.events.last_mut() {
            if event.indent.is_none() {
                event.indent = Some(indent.to_string());
            }
        }
    }

    /// Pop every resolved block the current line has dedented out of. The
    /// root frame never matches and so is structurally unpoppable; an indent
    /// comparable to no enclosing level aborts the transform.
    fn close_blocks(&mut self, indent: &str, lineno: usize) -> Result<(), TransformError> {
        loop {
            let (cause, cause_lineno, block_indent) = match self.stack.last() {
                Some(Frame::Block {
                    cause,
                    cause_lineno,
                    indent: Some(block_indent),
                }) => {
                    if indent.starts_with(block_indent.as_str()) {
                        // Same level or deeper: the block stays open.
                        break;
                    }
                    if !block_indent.starts_with(indent) {
                        return Err(TransformError::MalformedIndentation { lineno });
                    }
                    (*cause, *cause_lineno, block_indent.clone())
                }
                _ => break,
            };
            self.stack.pop();
            if cause.is_loop() {
                self.events.push(TraceEvent {
                    kind: EventKind::After,
                    // Attached to the line just before the dedent; that line
                    // may happen to be blank, which is fine.
                    place_lineno: lineno - 1,
                    target_lineno: cause_lineno,
                    indent: Some(block_indent),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind::{After, AfterNull, Before};

    fn scan(source: &str) -> Vec<TraceEvent> {
        Tracer::new(source, 4).run().unwrap().events
    }

    fn ev(kind: EventKind, place: usize, target: usize, indent: &str) -> TraceEvent {
        TraceEvent {
            kind,
            place_lineno: place,
            target_lineno: target,
            indent: Some(indent.to_string()),
        }
    }

    #[test]
    fn test_flat_statements() {
        // Scenario A: two plain statements, root depth only.
        let events = scan("x = 1\ny = 2");
        assert_eq!(events, vec![ev(Before, 0, 0, ""), ev(Before, 1, 1, "")]);
    }

    #[test]
    fn test_if_else() {
        // Scenario B: the else clause gets AfterNull, no Before, and its
        // indent resolves from the clause body's first line.
        let events = scan("if a:\n    x = 1\nelse:\n    y = 2");
        assert_eq!(
            events,
            vec![
                ev(Before, 0, 0, ""),
                ev(Before, 1, 1, "    "),
                ev(AfterNull, 2, 2, "    "),
                ev(Before, 3, 3, "    "),
            ]
        );
    }

    #[test]
    fn test_loop_exit_reported_to_header() {
        // Scenario C: the for frame pops at the dedent, targeting line 0 and
        // placed on the line just before it.
        let events = scan("for i in r:\n    x = 1\ny = 2");
        assert_eq!(
            events,
            vec![
                ev(Before, 0, 0, ""),
                ev(Before, 1, 1, "    "),
                ev(Before, 2, 2, ""),
                ev(After, 1, 0, "    "),
            ]
        );
    }

    #[test]
    fn test_blank_line_in_loop_body() {
        // Scenario D: the whitespace-only line emits nothing, affects no
        // binding, and neither triggers nor blocks dedent detection.
        let events = scan("for i in r:\n    x = 1\n   \n    z = 3\ny = 2");
        assert_eq!(
            events,
            vec![
                ev(Before, 0, 0, ""),
                ev(Before, 1, 1, "    "),
                ev(Before, 3, 3, "    "),
                ev(Before, 4, 4, ""),
                ev(After, 3, 0, "    "),
            ]
        );
    }

    #[test]
    fn test_sentinel_closes_trailing_loop() {
        // No dedent line exists; the sentinel pops the frame and the After
        // lands on the last real line.
        let events = scan("for i in r:\n    x = 1");
        assert_eq!(
            events,
            vec![
                ev(Before, 0, 0, ""),
                ev(Before, 1, 1, "    "),
                ev(After, 1, 0, "    "),
            ]
        );
    }

    #[test]
    fn test_nested_loops_pop_inner_first() {
        let events = scan("for i in r:\n    while c:\n        x = 1\ny = 2");
        assert_eq!(
            events,
            vec![
                ev(Before, 0, 0, ""),
                ev(Before, 1, 1, "    "),
                ev(Before, 2, 2, "        "),
                ev(Before, 3, 3, ""),
                ev(After, 2, 1, "        "),
                ev(After, 2, 0, "    "),
            ]
        );
    }

    #[test]
    fn test_try_except_finally() {
        let events = scan("try:\n    x = f()\nexcept E:\n    y = 2\nfinally:\n    z = 3");
        assert_eq!(
            events,
            vec![
                ev(Before, 0, 0, ""),
                ev(Before, 1, 1, "    "),
                ev(AfterNull, 2, 2, "    "),
                ev(Before, 3, 3, "    "),
                ev(AfterNull, 4, 4, "    "),
                ev(Before, 5, 5, "    "),
            ]
        );
    }

    #[test]
    fn test_loop_dedenting_into_continuation_defers_after() {
        // The else push leaves an unresolved frame on top, which blocks
        // dedent detection; the for frame only closes at the sentinel.
        let events = scan("if a:\n    for i in r:\n        x = 1\nelse:\n    y = 2");
        assert_eq!(
            events,
            vec![
                ev(Before, 0, 0, ""),
                ev(Before, 1, 1, "    "),
                ev(Before, 2, 2, "        "),
                ev(AfterNull, 3, 3, "    "),
                ev(Before, 4, 4, "    "),
                ev(After, 4, 1, "        "),
            ]
        );
    }

    #[test]
    fn test_continuation_at_end_resolves_to_root() {
        // A trailing clause header with no body: the sentinel binds the
        // dangling AfterNull indent to the empty string.
        let events = scan("if a:\n    x = 1\nelse:");
        assert_eq!(
            events,
            vec![
                ev(Before, 0, 0, ""),
                ev(Before, 1, 1, "    "),
                ev(AfterNull, 2, 2, ""),
            ]
        );
    }

    #[test]
    fn test_sequential_loops_defer_and_pop_newest_first() {
        // The second for pushes an unresolved frame, deferring the first
        // loop's close; both pop together at the final dedent, newest first.
        let events = scan("for i in r:\n    x = 1\nfor j in s:\n    y = 2\nz = 3");
        let afters: Vec<_> = events.iter().filter(|e| e.kind == After).collect();
        assert_eq!(afters.len(), 2);
        assert_eq!(afters[0].target_lineno, 2);
        assert_eq!(afters[1].target_lineno, 0);
        assert!(afters.iter().all(|e| e.place_lineno == 3));
    }

    #[test]
    fn test_tab_expansion() {
        let events = scan("if a:\n\tx = 1");
        assert_eq!(
            events,
            vec![ev(Before, 0, 0, ""), ev(Before, 1, 1, "    ")]
        );
    }

    #[test]
    fn test_malformed_indentation_is_surfaced() {
        // The block's indent starts with a form feed; a later space-only
        // indent is comparable to no enclosing level.
        let err = Tracer::new("if a:\n\u{0c}   x = 1\n  y = 2", 4)
            .run()
            .unwrap_err();
        assert_eq!(err, TransformError::MalformedIndentation { lineno: 2 });
    }

    #[test]
    fn test_empty_input() {
        let trace = Tracer::new("", 4).run().unwrap();
        assert!(trace.events.is_empty());
        assert_eq!(trace.lines.len(), 1);
    }

    #[test]
    fn test_target_lines_exist_in_input() {
        let source = "for i in r:\n    if a:\n        x = 1\n    y = 2\nz = 3";
        let trace = Tracer::new(source, 4).run().unwrap();
        for event in &trace.events {
            assert!(event.target_lineno < trace.lines.len());
        }
    }
}
