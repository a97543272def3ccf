// User configuration and on-disk locations
// Preferences are persisted as TOML next to the best-times file

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::xtm_error::StoreError;
use crate::xtm_game::{Difficulty, FirstClick};

/// User preferences, persisted to disk as TOML
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub difficulty: Difficulty,   // Preset to start on
    pub first_click: FirstClick,  // How the first reveal is protected
    pub ascii_icons: bool,        // Use ASCII fallback icons
}

impl Default for Config {
    fn default() -> Self {
        Config {
            difficulty: Difficulty::Easy,
            first_click: FirstClick::default(),
            ascii_icons: false,
        }
    }
}

/// Command line settings that apply to this run only and are never saved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub difficulty: Option<Difficulty>,
    pub first_click: Option<FirstClick>,
}

impl Overrides {
    /// Settings to play with: the saved ones with the overrides laid on top
    pub fn apply(&self, saved: &Config) -> Config {
        Config {
            difficulty: self.difficulty.unwrap_or(saved.difficulty),
            first_click: self.first_click.unwrap_or(saved.first_click),
            ..saved.clone()
        }
    }
}

/// Directory holding the config, records and log files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    dir: PathBuf,
}

impl Paths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Paths { dir: dir.into() }
    }

    /// Platform config directory (e.g. ~/.config/xtmines on Linux),
    /// falling back to the current directory if there is none
    pub fn resolve() -> Result<Paths, StoreError> {
        if let Some(proj) = ProjectDirs::from("com", "xhbl", "xtmines") {
            return Ok(Paths::new(proj.config_dir()));
        }
        match env::current_dir() {
            Ok(dir) => Ok(Paths::new(dir)),
            Err(_) => Err(StoreError::NoConfigDir),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> PathBuf {
        self.dir.join("xtmines.toml")
    }

    pub fn records(&self) -> PathBuf {
        self.dir.join("records.toml")
    }

    pub fn log(&self) -> PathBuf {
        self.dir.join("xtmines.log")
    }
}

/// Load configuration from disk, or create the default one if missing
/// A file that does not parse is left alone and defaults are used
pub fn load_or_create_config(path: &Path) -> Config {
    match fs::read_to_string(path) {
        Ok(s) => match toml::from_str::<Config>(&s) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Ignoring config at {}: {}", path.display(), e);
                Config::default()
            }
        },
        Err(_) => {
            let cfg = Config::default();
            match save_config(&cfg, path) {
                Ok(()) => info!("Created default config at {}", path.display()),
                Err(e) => warn!("Could not create config at {}: {}", path.display(), e),
            }
            cfg
        }
    }
}

/// Save configuration to disk as TOML
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), StoreError> {
    let s = toml::to_string(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, s)?;
    Ok(())
}
