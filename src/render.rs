//! Event grouping and interleaved rendering of the instrumented output.
//!
//! Original lines are emitted verbatim, in order; instrumentation calls are
//! only ever inserted around them. Per line: before-bucket calls, the line
//! itself, after-bucket calls, then each after-null call immediately followed
//! by one placeholder call.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::models::{EventKind, LineBuckets, TraceEvent};
use crate::tracer::Trace;

/// Group the ordered event list by the line each event renders at.
pub fn group_events(events: &[TraceEvent]) -> BTreeMap<usize, LineBuckets> {
    let mut buckets: BTreeMap<usize, LineBuckets> = BTreeMap::new();
    for event in events {
        let bucket = buckets.entry(event.place_lineno).or_default();
        match event.kind {
            EventKind::Before => bucket.before.push(event.clone()),
            EventKind::After => bucket.after.push(event.clone()),
            EventKind::AfterNull => bucket.after_null.push(event.clone()),
        }
    }
    buckets
}

fn tracepoint_call(event: &TraceEvent, config: &Config) -> String {
    let indent = event.indent.as_deref().unwrap_or_default();
    format!("{}{}({})", indent, config.tracepoint, event.target_lineno)
}

fn placeholder_call(event: &TraceEvent, config: &Config) -> String {
    let indent = event.indent.as_deref().unwrap_or_default();
    format!("{}{}()", indent, config.placeholder)
}

pub fn render(trace: &Trace, config: &Config) -> String {
    let buckets = group_events(&trace.events);
    let mut out = Vec::new();

    for line in &trace.lines {
        if let Some(bucket) = buckets.get(&line.lineno) {
            for event in &bucket.before {
                out.push(tracepoint_call(event, config));
            }
        }

        if config.annotate_line_numbers {
            out.push(format!("{}   #  {}", line.text, line.lineno));
        } else {
            out.push(line.text.clone());
        }

        if let Some(bucket) = buckets.get(&line.lineno) {
            for event in &bucket.after {
                out.push(tracepoint_call(event, config));
            }
            for event in &bucket.after_null {
                out.push(tracepoint_call(event, config));
                out.push(placeholder_call(event, config));
            }
        }
    }

    out.join("\n")
}
