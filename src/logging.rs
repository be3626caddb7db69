//! Logging module for linetrace
//!
//! Provides structured logging of instrumentation runs to a file in JSON
//! Lines format for later analysis.

use crate::models::FileResult;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single log entry representing one instrumentation run
#[derive(Debug, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// Unix timestamp of when the run happened
    pub timestamp: u64,
    /// ISO 8601 formatted date string
    pub datetime: String,
    /// Number of files processed
    pub files_processed: usize,
    /// Number of files that failed to transform
    pub files_failed: usize,
    /// Total input lines across all files
    pub lines_in: usize,
    /// Total output lines across all files
    pub lines_out: usize,
    /// Before-events emitted
    pub tracepoints: usize,
    /// Loop-exit events emitted
    pub loop_exits: usize,
    /// Continuation-clause resume events emitted
    pub clause_resumes: usize,
    /// Run mode (stdout, write, diagnostics)
    pub run_mode: String,
}

impl RunLogEntry {
    /// Create a new log entry from per-file results
    pub fn from_results(results: &[FileResult], run_mode: &str) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let timestamp = now.as_secs();
        let datetime = format_datetime(timestamp);

        let mut entry = Self {
            timestamp,
            datetime,
            files_processed: results.len(),
            files_failed: 0,
            lines_in: 0,
            lines_out: 0,
            tracepoints: 0,
            loop_exits: 0,
            clause_resumes: 0,
            run_mode: run_mode.to_string(),
        };

        for result in results {
            if result.error.is_some() {
                entry.files_failed += 1;
                continue;
            }
            entry.lines_in += result.counts.lines_in;
            entry.lines_out += result.counts.lines_out;
            entry.tracepoints += result.counts.tracepoints;
            entry.loop_exits += result.counts.loop_exits;
            entry.clause_resumes += result.counts.clause_resumes;
        }

        entry
    }
}

/// Logger that appends run entries to a file
pub struct RunLogger {
    writer: Option<BufWriter<File>>,
    log_path: String,
}

impl RunLogger {
    /// Create a new logger that writes to the specified file.
    /// If the file exists it is appended to, otherwise created.
    pub fn new(log_path: &str) -> std::io::Result<Self> {
        let path = Path::new(log_path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            log_path: log_path.to_string(),
        })
    }

    /// Log a run to the file
    pub fn log(&mut self, entry: &RunLogEntry) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(entry)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Get the path of the log file
    pub fn log_path(&self) -> &str {
        &self.log_path
    }
}

/// Format a unix timestamp as ISO 8601 datetime string
fn format_datetime(timestamp: u64) -> String {
    use std::time::Duration;
    let d = UNIX_EPOCH + Duration::from_secs(timestamp);
    let datetime: chrono::DateTime<chrono::Utc> = chrono::DateTime::from(d);
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
