//! Player settings, read from a TOML file. Every field has a default so an empty or
//! missing file gives the stock player.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{VmError, VmResult};
use crate::random::RandMode;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "magnetic.toml";

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Fixed random seed for reproducible play
    pub seed: Option<u32>,
    #[serde(default = "enabled")]
    pub graphics: bool,
    #[serde(default = "enabled")]
    pub animation: bool,
    pub instruction_limit: Option<u64>,
    #[serde(default = "enabled")]
    pub status_line: bool,
    /// Story comes from the Magnetic Windows collection
    pub magnetic_windows: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            seed: None,
            graphics: true,
            animation: true,
            instruction_limit: None,
            status_line: true,
            magnetic_windows: false,
        }
    }
}

impl PlayerConfig {
    pub fn from_toml(text: &str) -> VmResult<PlayerConfig> {
        toml::from_str(text).map_err(|e| VmError::malformed("config file", e.to_string()))
    }

    pub fn from_file(path: &Path) -> VmResult<PlayerConfig> {
        info!("reading settings from {}", path.display());
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Read `explicit` if given, else `magnetic.toml` when it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> VmResult<PlayerConfig> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::from_file(&fallback)
        } else {
            debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(PlayerConfig::default())
        }
    }

    pub fn rand_mode(&self) -> RandMode {
        match self.seed {
            Some(seed) => RandMode::Predictable(seed),
            None => RandMode::RandomUniform,
        }
    }
}
