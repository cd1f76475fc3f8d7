//! Configuration loading, environment overrides and palette resolution.
//!
//! Parse `topless.toml` (or an override path provided by the binary). Every
//! field is optional; absent sections fall back to defaults and unknown fields
//! are ignored. After the file is read, the environment variables `COUNT_MAX`,
//! `LINE_COLOR`, `LINE_END`, `WORD_COLOR` and `WORD_END` take precedence over
//! the file values.
//!
//! Colors are named (`Red`, `RedB` for bold, `Red_` for underline, `BgRed`
//! for background, ...) or given verbatim as raw escape sequences.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{debug, info, warn};

pub mod palette;
pub use palette::{HighlightPalette, resolve_color};

pub const COUNT_MAX_DEFAULT: usize = 3;
pub const SHUTDOWN_GRACE_MS_DEFAULT: u64 = 2_000;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    #[serde(default = "HighlightConfig::default_count_max")]
    pub count_max: usize,
    #[serde(default = "HighlightConfig::default_line_color")]
    pub line_color: String,
    #[serde(default = "HighlightConfig::default_line_end")]
    pub line_end: String,
    #[serde(default = "HighlightConfig::default_word_color")]
    pub word_color: String,
    /// Empty means "reset, then re-apply the line color".
    #[serde(default)]
    pub word_end: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            count_max: Self::default_count_max(),
            line_color: Self::default_line_color(),
            line_end: Self::default_line_end(),
            word_color: Self::default_word_color(),
            word_end: String::new(),
        }
    }
}

impl HighlightConfig {
    const fn default_count_max() -> usize {
        COUNT_MAX_DEFAULT
    }
    fn default_line_color() -> String {
        "Normal".to_string()
    }
    fn default_line_end() -> String {
        "Normal".to_string()
    }
    fn default_word_color() -> String {
        "RedB".to_string()
    }

    /// Resolve color names into the escape sequences used by the highlight scan.
    pub fn palette(&self) -> HighlightPalette {
        HighlightPalette::from_names(
            &self.line_color,
            &self.line_end,
            &self.word_color,
            &self.word_end,
        )
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound on how long quit waits for an in-flight tick.
    #[serde(default = "RuntimeConfig::default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: Self::default_shutdown_grace_ms(),
        }
    }
}

impl RuntimeConfig {
    const fn default_shutdown_grace_ms() -> u64 {
        SHUTDOWN_GRACE_MS_DEFAULT
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub source: Option<PathBuf>,
    pub file: ConfigFile, // parsed (or default) data, env overrides applied
}

/// Best-effort config path: working directory first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("topless.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("topless").join("topless.toml");
    }
    PathBuf::from("topless.toml")
}

/// Load the config file (discovered when `path` is `None`). Missing or
/// unparsable files yield defaults; environment overrides are not applied here.
pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        debug!(target: "config", path = %path.display(), "config_file_absent");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_file_loaded");
            Ok(Config {
                raw: Some(content),
                source: Some(path),
                file,
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

/// Load the config file and apply process environment overrides.
pub fn load(path: Option<PathBuf>) -> Result<Config> {
    let mut cfg = load_from(path)?;
    cfg.apply_env(|key| std::env::var(key).ok());
    Ok(cfg)
}

impl Config {
    /// Apply environment overrides using `lookup` (injected for tests).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let hl = &mut self.file.highlight;
        if let Some(raw) = lookup("COUNT_MAX") {
            match raw.trim().parse::<usize>() {
                Ok(n) => {
                    debug!(target: "config", count_max = n, "env_override");
                    hl.count_max = n;
                }
                Err(_) => {
                    warn!(target: "config", value = raw.as_str(), "count_max_env_ignored");
                }
            }
        }
        for (key, slot) in [
            ("LINE_COLOR", &mut hl.line_color),
            ("LINE_END", &mut hl.line_end),
            ("WORD_COLOR", &mut hl.word_color),
            ("WORD_END", &mut hl.word_end),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                debug!(target: "config", key, "env_override");
                *slot = value;
            }
        }
    }

    pub fn count_max(&self) -> usize {
        self.file.highlight.count_max
    }

    pub fn palette(&self) -> HighlightPalette {
        self.file.highlight.palette()
    }

    pub fn shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.file.runtime.shutdown_grace_ms)
    }
}
