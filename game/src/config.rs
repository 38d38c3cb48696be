use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::LockRules;
use crate::garbage::{GarbageRules, StormRules};
use crate::scoring::ProgressionRules;
use crate::session::SessionRules;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const CONFIG_PATH_ENV: &str = "TETRIS_CONFIG_PATH";
pub const API_BASE_URL_ENV: &str = "TETRIS_API_BASE_URL";
pub const API_TOKEN_ENV: &str = "TETRIS_API_TOKEN";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesSection {
    pub lock: LockRules,
    pub progression: ProgressionRules,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_ms: u64,
    pub leaderboard_limit: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: 5_000,
            leaderboard_limit: 10,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn sanitized(mut self) -> Self {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        self.base_url = if trimmed.is_empty() {
            DEFAULT_API_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        };
        self.timeout_ms = self.timeout_ms.clamp(100, 60_000);
        self.leaderboard_limit = self.leaderboard_limit.clamp(1, 100);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub rules: RulesSection,
    #[serde(default)]
    pub garbage: GarbageRules,
    #[serde(default)]
    pub storm: StormRules,
    #[serde(default)]
    pub api: ApiSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            rules: RulesSection::default(),
            garbage: GarbageRules::default(),
            storm: StormRules::default(),
            api: ApiSettings::default(),
        }
    }
}

impl GameConfig {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        let rules = self.session_rules().sanitized();
        self.rules.lock = rules.lock;
        self.garbage = rules.garbage;
        self.storm = rules.storm;
        self.api = self.api.sanitized();
        self
    }

    pub fn session_rules(&self) -> SessionRules {
        SessionRules {
            lock: self.rules.lock,
            progression: self.rules.progression,
            garbage: self.garbage,
            storm: self.storm,
        }
    }

    /// Applies `TETRIS_API_BASE_URL` on top of the file contents.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(API_BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url;
                self.api = self.api.sanitized();
            }
        }
        self
    }
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::new(explicit);
        }
        let mut path = config_dir();
        path.push("config.json");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or malformed files yield the defaults.
    pub fn load(&self) -> GameConfig {
        let Ok(bytes) = fs::read(&self.path) else {
            return GameConfig::default();
        };
        match serde_json::from_slice::<GameConfig>(&bytes) {
            Ok(config) => config.sanitized(),
            Err(err) => {
                eprintln!(
                    "[config] ignoring malformed {}: {err}",
                    self.path.display()
                );
                GameConfig::default()
            }
        }
    }

    pub fn save(&self, config: &GameConfig) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}

/// `$XDG_CONFIG_HOME/tetris`, falling back to `~/.config/tetris`.
pub fn config_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| {
                let mut p = PathBuf::from(home);
                p.push(".config");
                p
            })
        })
        .unwrap_or_else(|| PathBuf::from("."));
    let mut dir = base;
    dir.push("tetris");
    dir
}
