//! linetrace: weaves tracepoint calls into indentation-delimited source
//!
//! Given source text in an indentation-delimited language, produces a copy
//! with calls to two externally-defined instrumentation functions inserted
//! before/after each executable statement, so an external runtime can report
//! which original line is about to execute or has just finished — including
//! inside loops, conditionals and exception handlers, where one trace call
//! per physical line would misrepresent control flow.
//!
//! The core is a line-oriented pseudo-parser: no grammar, no AST. Nesting is
//! tracked via indentation alone, and the instrumented code's behavior is
//! defined entirely by the runtime that supplies the two functions.

pub mod classify;
pub mod config;
pub mod logging;
pub mod models;
pub mod render;
pub mod tracer;

use config::Config;
use models::{Diagnostics, EventCounts, FileResult, TransformError};
use rayon::prelude::*;
use std::path::Path;
use tracer::Tracer;
use walkdir::WalkDir;

/// Transform source text into its instrumented counterpart.
///
/// Pure and deterministic: identical input and configuration always yield
/// byte-identical output. Safe for concurrent invocation; every call builds
/// and discards its own model.
pub fn transform(source: &str, config: &Config) -> Result<String, TransformError> {
    let trace = Tracer::new(source, config.tab_width).run()?;
    Ok(render::render(&trace, config))
}

/// Diagnostic mode: return the intermediate structures instead of text.
pub fn transform_with_diagnostics(
    source: &str,
    config: &Config,
) -> Result<Diagnostics, TransformError> {
    let trace = Tracer::new(source, config.tab_width).run()?;
    let buckets = render::group_events(&trace.events);
    Ok(Diagnostics {
        lines: trace.lines,
        events: trace.events,
        buckets,
    })
}

/// Instrument source text and report per-file, embedding any failure.
pub fn transform_source(file_path: &str, source: &str, config: &Config) -> FileResult {
    let trace = match Tracer::new(source, config.tab_width).run() {
        Ok(trace) => trace,
        Err(e) => return FileResult::with_error(file_path.to_string(), e.to_string()),
    };

    let mut counts = EventCounts::tally(&trace.events);
    counts.lines_in = trace.lines.len();

    let output = render::render(&trace, config);
    counts.lines_out = output.split('\n').count();

    FileResult::new(file_path.to_string(), output, counts)
}

/// Instrument a single file and return the result
pub fn transform_file(file_path: &Path, config: &Config) -> FileResult {
    let path_str = file_path.to_string_lossy().to_string();

    let source = match std::fs::read_to_string(file_path) {
        Ok(s) => s,
        Err(e) => return FileResult::with_error(path_str, format!("Failed to read file: {}", e)),
    };

    transform_source(&path_str, &source, config)
}

/// Instrument multiple files in parallel
pub fn transform_files_parallel(
    files: &[std::path::PathBuf],
    config: &Config,
) -> Vec<FileResult> {
    files
        .par_iter()
        .map(|file| transform_file(file, config))
        .collect()
}

/// Collect Python files from paths
pub fn collect_python_files(
    paths: &[String],
    exclude_patterns: &[String],
) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        let p = Path::new(path);
        if p.is_file() {
            if p.extension().map_or(false, |e| e == "py") {
                files.push(p.to_path_buf());
            }
        } else if p.is_dir() {
            for entry in WalkDir::new(p)
                .into_iter()
                .filter_entry(|e| !should_exclude(e.path(), exclude_patterns))
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && path.extension().map_or(false, |e| e == "py") {
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    files
}

fn should_exclude(path: &Path, patterns: &[String]) -> bool {
    for pattern in patterns {
        if let Some(name) = path.file_name() {
            if let Some(name_str) = name.to_str() {
                if name_str == pattern || name_str.contains(pattern) {
                    return true;
                }
            }
        }
        for component in path.components() {
            if let Some(comp_str) = component.as_os_str().to_str() {
                if comp_str == pattern {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_transform_end_to_end() {
        let config = Config::default();
        let output = transform("if a:\n    x = 1\nelse:\n    y = 2", &config).unwrap();
        assert_eq!(
            output,
            "_tp(0)\nif a:\n    _tp(1)\n    x = 1\nelse:\n    _tp(2)\n    _tp_hold()\n    _tp(3)\n    y = 2"
        );
    }

    #[test]
    fn test_transform_is_deterministic() {
        let config = Config::default();
        let source = "for i in r:\n    if a:\n        x = 1\n    y = 2\nz = 3";
        let a = transform(source, &config).unwrap();
        let b = transform(source, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_transform_surfaces_malformed_indentation() {
        let config = Config::default();
        let err = transform("if a:\n\u{0c}   x = 1\n  y = 2", &config).unwrap_err();
        assert!(matches!(
            err,
            TransformError::MalformedIndentation { lineno: 2 }
        ));
    }

    #[test]
    fn test_diagnostics_structures() {
        let config = Config::default();
        let diag =
            transform_with_diagnostics("for i in r:\n    x = 1\ny = 2", &config).unwrap();

        assert_eq!(diag.lines.len(), 3);
        assert_eq!(diag.events.len(), 4);

        let bucket = diag.buckets.get(&1).unwrap();
        assert_eq!(bucket.before.len(), 1);
        assert_eq!(bucket.after.len(), 1);
        assert_eq!(bucket.after[0].kind, EventKind::After);
        assert_eq!(bucket.after[0].target_lineno, 0);

        // The diagnostics serialize cleanly for the CLI's JSON mode.
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"after-null\"") || json.contains("\"before\""));
    }

    #[test]
    fn test_transform_source_counts() {
        let config = Config::default();
        let result = transform_source(
            "demo.py",
            "for i in r:\n    x = 1\nelse_free = 2",
            &config,
        );
        assert!(result.error.is_none());
        assert_eq!(result.counts.tracepoints, 3);
        assert_eq!(result.counts.loop_exits, 1);
        assert_eq!(result.counts.clause_resumes, 0);
        assert_eq!(result.counts.lines_in, 3);
        assert_eq!(result.counts.lines_out, 7);
    }

    #[test]
    fn test_transform_file_missing() {
        let config = Config::default();
        let result = transform_file(Path::new("/nonexistent/missing.py"), &config);
        assert!(result.output.is_none());
        assert!(result.error.unwrap().contains("Failed to read file"));
    }

    #[test]
    fn test_collect_python_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        fs::write(dir.path().join("b.txt"), "not python").unwrap();
        let venv = dir.path().join(".venv");
        fs::create_dir(&venv).unwrap();
        fs::write(venv.join("c.py"), "x = 1").unwrap();

        let paths = vec![dir.path().to_string_lossy().to_string()];
        let excludes = vec![".venv".to_string()];
        let files = collect_python_files(&paths, &excludes);

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.py"));
    }

    #[test]
    fn test_transform_files_parallel() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.py");
        let b = dir.path().join("b.py");
        fs::write(&a, "for i in r:\n    x = 1\n").unwrap();
        fs::write(&b, "y = 2\n").unwrap();

        let config = Config::default();
        let results = transform_files_parallel(&[a, b], &config);

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error.is_none()));
        assert_eq!(results[0].counts.loop_exits, 1);
        assert_eq!(results[1].counts.loop_exits, 0);
    }
}
