//! `bindpath.toml` loading.
//!
//! Options are layered: built-in defaults, then the config file, then
//! command-line flags.
//!
//! ```toml
//! [transform]
//! helper_name = "_c"
//! receiver = "this"
//! exclusions = ["wx", "getApp"]
//! terminators = ["count"]
//! collect = true
//!
//! [check]
//! extensions = ["js", "mjs"]
//! strict = false
//! ```

use anyhow::{Context, Result};
use bindpath_transform::TransformOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "bindpath.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub transform: TransformSection,
    pub check: CheckSection,
    /// File the config was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Overrides for [`TransformOptions`]; unset keys keep the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformSection {
    pub helper_name: Option<String>,
    pub receiver: Option<String>,
    pub exclusions: Vec<String>,
    pub replace_exclusions: bool,
    pub terminators: Vec<String>,
    pub replace_terminators: bool,
    pub collect_marker: Option<String>,
    /// `false` disables collection regions.
    pub collect: Option<bool>,
    pub max_depth: Option<usize>,
}

impl TransformSection {
    pub fn apply(&self, mut options: TransformOptions) -> TransformOptions {
        if let Some(helper_name) = &self.helper_name {
            options.helper_name = helper_name.clone();
        }
        if let Some(receiver) = &self.receiver {
            options.receiver = receiver.clone();
        }
        options.exclusions.extend(self.exclusions.iter().cloned());
        options.replace_exclusions |= self.replace_exclusions;
        options.terminators.extend(self.terminators.iter().cloned());
        options.replace_terminators |= self.replace_terminators;
        if let Some(marker) = &self.collect_marker {
            options.collect_marker = Some(marker.clone());
        }
        if self.collect == Some(false) {
            options.collect_marker = None;
        }
        if let Some(max_depth) = self.max_depth {
            options.max_depth = max_depth;
        }
        options
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckSection {
    /// File extensions `check` picks up, without the dot.
    pub extensions: Vec<String>,
    /// Directory names skipped while walking.
    pub skip_dirs: Vec<String>,
    pub strict: bool,
}

impl Default for CheckSection {
    fn default() -> Self {
        Self {
            extensions: vec!["js".to_string()],
            skip_dirs: vec!["node_modules".to_string()],
            strict: false,
        }
    }
}

/// Read and parse a config file.
pub fn load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let mut config: Config = toml::from_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    config.source = Some(path.to_path_buf());
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Load `explicit` if given, else `bindpath.toml` in `dir` if it exists,
/// else the defaults.
pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        return load(path);
    }

    let candidate = dir.join(CONFIG_FILE);
    if candidate.is_file() {
        load(&candidate)
    } else {
        Ok(Config::default())
    }
}
