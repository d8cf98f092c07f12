//! Configuration loading.
//!
//! Settings come from two JSON files, the user-level one in the home
//! directory and the project-level one in the working directory, each
//! overlaying the defaults in that order. A missing or malformed file
//! never fails a run: lint tools are expected to work out of the box,
//! so such files are logged at debug level and skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// File name of both the user and the project configuration.
pub const CONFIG_FILE: &str = ".ocelint.json";

/// Engine and session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads for bulk inspection. `0` lets the pool decide.
    pub workers: usize,
    /// Exit nonzero when findings survive filtering.
    pub fail_exit: bool,
    /// Load the built-in plugins before anything else.
    pub load_core: bool,
    /// Default log filter applied when the environment sets none.
    pub verbosity: String,
    /// Extra plugins to load, namespace to plugin names. Kept ordered
    /// so load order is stable across runs.
    pub plugins: BTreeMap<String, Vec<String>>,
    pub blacklist: Blacklist,
}

/// What to suppress: whole plugins at load time, individual report
/// codes at aggregation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blacklist {
    pub plugins: Vec<String>,
    pub codes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 0,
            fail_exit: true,
            load_core: true,
            verbosity: "info".to_owned(),
            plugins: BTreeMap::new(),
            blacklist: Blacklist::default(),
        }
    }
}

/// A partial config as read from disk; absent fields keep whatever the
/// previous layer set.
#[derive(Debug, Default, Deserialize)]
struct Overlay {
    workers: Option<usize>,
    fail_exit: Option<bool>,
    load_core: Option<bool>,
    verbosity: Option<String>,
    plugins: Option<BTreeMap<String, Vec<String>>>,
    blacklist: Option<BlacklistOverlay>,
}

#[derive(Debug, Default, Deserialize)]
struct BlacklistOverlay {
    plugins: Option<Vec<String>>,
    codes: Option<Vec<String>>,
}

impl Config {
    /// Defaults overlaid with `~/.ocelint.json`, then `./.ocelint.json`.
    pub fn discover() -> Self {
        let mut config = Config::default();
        if let Some(home) = dirs::home_dir() {
            config.overlay_file(&home.join(CONFIG_FILE));
        }
        config.overlay_file(Path::new(CONFIG_FILE));
        config
    }

    /// Applies one config file on top of the current settings.
    pub fn overlay_file(&mut self, path: &Path) {
        let Ok(text) = fs::read_to_string(path) else {
            debug!(path = %path.display(), "no config file");
            return;
        };
        match serde_json::from_str::<Overlay>(&text) {
            Ok(overlay) => self.apply(overlay),
            Err(err) => debug!(path = %path.display(), %err, "ignoring malformed config"),
        }
    }

    fn apply(&mut self, overlay: Overlay) {
        if let Some(workers) = overlay.workers {
            self.workers = workers;
        }
        if let Some(fail_exit) = overlay.fail_exit {
            self.fail_exit = fail_exit;
        }
        if let Some(load_core) = overlay.load_core {
            self.load_core = load_core;
        }
        if let Some(verbosity) = overlay.verbosity {
            self.verbosity = verbosity;
        }
        if let Some(plugins) = overlay.plugins {
            for (namespace, names) in plugins {
                self.plugins.entry(namespace).or_default().extend(names);
            }
        }
        if let Some(blacklist) = overlay.blacklist {
            if let Some(plugins) = blacklist.plugins {
                self.blacklist.plugins.extend(plugins);
            }
            if let Some(codes) = blacklist.codes {
                self.blacklist.codes.extend(codes);
            }
        }
    }
}
