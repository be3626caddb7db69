//! linetrace CLI

use anyhow::{bail, Context};
use clap::Parser;
use colored::*;
use linetrace::logging::{RunLogEntry, RunLogger};
use linetrace::{collect_python_files, config, transform_files_parallel, transform_with_diagnostics};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "linetrace")]
#[command(
    version,
    about = "Weaves tracepoint calls into indentation-delimited source for execution highlighting"
)]
struct Args {
    /// Files or directories to instrument
    #[arg(required = true)]
    paths: Vec<String>,

    /// Write <name>.traced.py next to each input instead of printing to stdout
    #[arg(short, long)]
    write: bool,

    /// Print the intermediate line/event structures as JSON instead of source
    #[arg(long)]
    diagnostics: bool,

    /// Append a visible original-line-number comment to each source line
    #[arg(long)]
    annotate: bool,

    /// Tab expansion width
    #[arg(long)]
    tab_width: Option<usize>,

    /// Name of the tracepoint function to call
    #[arg(long)]
    tracepoint: Option<String>,

    /// Name of the placeholder function to call
    #[arg(long)]
    placeholder: Option<String>,

    /// Exclude paths matching patterns
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Ignore pyproject.toml configuration
    #[arg(long)]
    no_config: bool,

    /// Append a JSON Lines run record to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let file_config = if args.no_config {
        None
    } else {
        config::load_config(None)
    };

    let overrides = config::Overrides {
        tab_width: args.tab_width,
        tracepoint: args.tracepoint.clone(),
        placeholder: args.placeholder.clone(),
        annotate_line_numbers: args.annotate,
        exclude: args.exclude.clone(),
    };
    let merged = config::merge_config(file_config, &overrides);

    if !config::is_valid_call_name(&merged.tracepoint) {
        bail!("invalid tracepoint function name: {:?}", merged.tracepoint);
    }
    if !config::is_valid_call_name(&merged.placeholder) {
        bail!("invalid placeholder function name: {:?}", merged.placeholder);
    }

    if args.verbose {
        eprintln!("Tracepoint call: {}", merged.tracepoint);
        eprintln!("Placeholder call: {}", merged.placeholder);
        eprintln!("Exclude patterns: {:?}", merged.exclude);
    }

    let files = collect_python_files(&args.paths, &merged.exclude);

    if args.verbose {
        eprintln!("Found {} Python files", files.len());
    }

    if files.is_empty() {
        eprintln!("No Python files found");
        return Ok(ExitCode::SUCCESS);
    }

    if args.diagnostics {
        return print_diagnostics(&files, &merged);
    }

    let results = transform_files_parallel(&files, &merged);

    let mut failed = 0;
    for result in &results {
        if let Some(error) = &result.error {
            eprintln!("{}: {}", result.file_path.red(), error);
            failed += 1;
        }
    }

    if args.write {
        for result in &results {
            if let Some(output) = &result.output {
                let target = PathBuf::from(&result.file_path).with_extension("traced.py");
                std::fs::write(&target, output)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                if args.verbose {
                    eprintln!("{} -> {}", result.file_path.dimmed(), target.display());
                }
            }
        }
    } else {
        if files.len() > 1 {
            bail!("refusing to print more than one file to stdout; use --write");
        }
        if let Some(output) = results.iter().find_map(|r| r.output.as_ref()) {
            println!("{}", output);
        }
    }

    let run_mode = if args.write { "write" } else { "stdout" };
    if let Some(log_file) = &args.log_file {
        let entry = RunLogEntry::from_results(&results, run_mode);
        let mut logger = RunLogger::new(&log_file.to_string_lossy())
            .with_context(|| format!("Failed to open log file {}", log_file.display()))?;
        logger.log(&entry)?;
    }

    let totals = RunLogEntry::from_results(&results, run_mode);
    eprintln!(
        "\nInstrumented {} file(s): {} tracepoint(s), {} loop exit(s), {} clause resume(s)",
        (results.len() - failed).to_string().green(),
        totals.tracepoints.to_string().yellow(),
        totals.loop_exits.to_string().yellow(),
        totals.clause_resumes.to_string().yellow(),
    );
    if failed > 0 {
        eprintln!("{} file(s) failed", failed.to_string().red().bold());
        return Ok(ExitCode::from(1));
    }

    Ok(ExitCode::SUCCESS)
}

fn print_diagnostics(files: &[PathBuf], merged: &config::Config) -> anyhow::Result<ExitCode> {
    let mut reports = Vec::new();
    let mut failed = 0;

    for file in files {
        let path_str = file.to_string_lossy().to_string();
        let source = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        match transform_with_diagnostics(&source, merged) {
            Ok(diag) => reports.push(serde_json::json!({
                "file": path_str,
                "diagnostics": diag,
            })),
            Err(e) => {
                eprintln!("{}: {}", path_str.red(), e);
                failed += 1;
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);

    if failed > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
