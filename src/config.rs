//! Configuration loading for linetrace
//!
//! Loads configuration from pyproject.toml [tool.linetrace] section; CLI
//! flags take precedence over file settings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

static CALL_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Width tabs are expanded to before processing
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,

    /// Name of the runtime function called as `name(lineno)`
    #[serde(default = "default_tracepoint")]
    pub tracepoint: String,

    /// Name of the no-argument hold function called after a clause resumes
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Append a visible original-line-number comment to each source line
    #[serde(default)]
    pub annotate_line_numbers: bool,

    /// Paths to exclude from file collection
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_width: default_tab_width(),
            tracepoint: default_tracepoint(),
            placeholder: default_placeholder(),
            annotate_line_numbers: false,
            exclude: vec![],
        }
    }
}

fn default_tab_width() -> usize {
    4
}

fn default_tracepoint() -> String {
    "_tp".to_string()
}

fn default_placeholder() -> String {
    "_tp_hold".to_string()
}

/// A (possibly dotted) identifier path, e.g. `_tp` or `RUR.control.hold`.
pub fn is_valid_call_name(name: &str) -> bool {
    CALL_NAME_REGEX.is_match(name)
}

/// Find pyproject.toml with a [tool.linetrace] section, walking up
pub fn find_config_pyproject_toml(start_path: &Path) -> Option<PathBuf> {
    let mut current = if start_path.is_file() {
        start_path.parent()?
    } else {
        start_path
    };

    loop {
        let pyproject = current.join("pyproject.toml");
        if pyproject.exists() {
            if let Ok(content) = std::fs::read_to_string(&pyproject) {
                if let Ok(value) = toml::from_str::<toml::Value>(&content) {
                    if let Some(tool) = value.get("tool") {
                        if tool.get("linetrace").is_some() {
                            return Some(pyproject);
                        }
                    }
                }
            }
        }

        current = current.parent()?;
    }
}

/// Load configuration from pyproject.toml
pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            p.to_path_buf()
        } else {
            return None;
        }
    } else {
        find_config_pyproject_toml(&std::env::current_dir().ok()?)?
    };

    let content = std::fs::read_to_string(&config_path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;

    let tool = value.get("tool")?;
    let linetrace = tool.get("linetrace")?;

    let config: Config = linetrace.clone().try_into().ok()?;

    Some(config)
}

/// Command-line settings layered on top of the file configuration
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub tab_width: Option<usize>,
    pub tracepoint: Option<String>,
    pub placeholder: Option<String>,
    pub annotate_line_numbers: bool,
    pub exclude: Vec<String>,
}

/// Merge command line arguments with config file settings.
/// CLI arguments take precedence.
pub fn merge_config(config: Option<Config>, overrides: &Overrides) -> Config {
    let mut merged = config.unwrap_or_default();

    if let Some(tab_width) = overrides.tab_width {
        merged.tab_width = tab_width;
    }
    if let Some(tracepoint) = &overrides.tracepoint {
        merged.tracepoint = tracepoint.clone();
    }
    if let Some(placeholder) = &overrides.placeholder {
        merged.placeholder = placeholder.clone();
    }
    if overrides.annotate_line_numbers {
        merged.annotate_line_numbers = true;
    }
    merged.exclude.extend(overrides.exclude.iter().cloned());

    // Add default excludes
    let defaults = vec![
        ".venv",
        "venv",
        "__pycache__",
        ".git",
        ".tox",
        "build",
        "dist",
        ".pytest_cache",
        ".ruff_cache",
        "node_modules",
        ".mypy_cache",
    ];
    for default in defaults {
        if !merged.exclude.contains(&default.to_string()) {
            merged.exclude.push(default.to_string());
        }
    }

    merged
}
