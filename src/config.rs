use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use cross_xdg::BaseDirs;
use tracing::{debug, warn};

use crate::engine::DEFAULT_MEMORY_SIZE;

/// Engine settings resolved from the config file and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Tape cells allocated per run.
    pub memory_size: usize,
    /// Wall-clock limit for a CLI run, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `jbf.toml` in the user config home, overridden by
    /// `JBF_MEMORY_SIZE` and `JBF_TIMEOUT_MS`.
    pub fn load() -> Self {
        let mut cfg = Self::default();
        if let Some(content) = config_path().and_then(|p| fs::read_to_string(p).ok()) {
            cfg.apply_toml(&content);
        }
        cfg.apply_env(|key| env::var(key).ok());
        cfg
    }

    /// Apply keys from the `[engine]` section of a TOML document.
    ///
    /// Only the flat `key = value` subset is understood. Unknown keys and
    /// unparsable values are ignored.
    pub fn apply_toml(&mut self, content: &str) {
        let map = parse_section(content, "engine");

        if let Some(v) = map.get("memory_size") {
            match parse_memory_size(v) {
                Some(n) => self.memory_size = n,
                None => warn!(value = %v, "ignoring invalid memory_size in config"),
            }
        }
        if let Some(v) = map.get("timeout_ms") {
            match v.parse::<u64>() {
                Ok(ms) => self.timeout_ms = Some(ms),
                Err(_) => warn!(value = %v, "ignoring invalid timeout_ms in config"),
            }
        }
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = lookup("JBF_MEMORY_SIZE").as_deref().and_then(parse_memory_size) {
            self.memory_size = n;
        }
        if let Some(ms) = lookup("JBF_TIMEOUT_MS").and_then(|s| s.trim().parse::<u64>().ok()) {
            self.timeout_ms = Some(ms);
        }
    }
}

fn parse_memory_size(value: &str) -> Option<usize> {
    value.trim().replace('_', "").parse::<usize>().ok().filter(|&n| n > 0)
}

fn config_path() -> Option<PathBuf> {
    // Linux: ~/.config, macOS: ~/.config, Windows: C:\Users\<user>\.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("jbf.toml");
    debug!(path = %path.display(), "config path");
    Some(path)
}

fn parse_section(content: &str, section: &str) -> HashMap<String, String> {
    let mut in_section = false;
    let mut map: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_section = line[1..line.len() - 1].trim() == section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, raw)) = line.split_once('=') {
            let raw = raw.trim();
            // Accept quoted or unquoted
            let val = raw
                .strip_prefix('"')
                .and_then(|r| r.strip_suffix('"'))
                .unwrap_or(raw);
            map.insert(key.trim().to_string(), val.to_string());
        }
    }
    map
}
