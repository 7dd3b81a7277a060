// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::errors::ConfigError;

use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/// Policy knobs. Every field has a default so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds after a peer session starts before the first piece is picked.
    pub initial_delay_secs: u64,
    /// Seconds a finished piece is given to upload before it can be abandoned.
    pub min_piece_secs: u64,
    pub up_idle_limit_secs_default: u64,
    pub up_idle_limit_secs_inc: u64,
    pub min_interested_peers: usize,
    pub max_seeds_per_torrent: usize,
    pub max_upload_slots: u32,
    pub selected_piece_priority: i64,
    /// The seed pass runs on every Nth timer tick.
    pub seed_pass_every_ticks: u64,
    pub provider_recheck_secs: u64,
    pub upload_average_window: usize,
    /// Comma separated ISO-3166 codes, e.g. "CN, RU".
    pub blocked_countries: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 60,
            min_piece_secs: 60,
            up_idle_limit_secs_default: 120,
            up_idle_limit_secs_inc: 120,
            min_interested_peers: 3,
            max_seeds_per_torrent: 20,
            max_upload_slots: 100,
            selected_piece_priority: 100_000,
            seed_pass_every_ticks: 10,
            provider_recheck_secs: 20,
            upload_average_window: 60,
            blocked_countries: String::new(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn min_piece_wait(&self) -> Duration {
        Duration::from_secs(self.min_piece_secs)
    }

    pub fn provider_recheck(&self) -> Duration {
        Duration::from_secs(self.provider_recheck_secs)
    }
}

/// Reads settings from `path`. A missing file is not an error and yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Settings::from_toml_str(&text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
        Err(e) => Err(e.into()),
    }
}

/// Splits a comma separated country list. Entries are trimmed, empty entries
/// dropped, and case is left untouched.
pub fn parse_country_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|cc| !cc.is_empty())
        .map(str::to_string)
        .collect()
}
