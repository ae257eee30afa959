use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IntoSkillError, SkillError};

/// Environment variable that points at an alternative settings file
pub const CONFIG_PATH_ENV: &str = "LOCAL_MUSIC_SKILL_CONFIG";

/// Directory name used under the user's config and cache directories
const APP_DIR: &str = "local-music-skill";

/// Skill settings
///
/// Stored as JSON at `$XDG_CONFIG_HOME/local-music-skill/settings.json`
/// (or the path in `LOCAL_MUSIC_SKILL_CONFIG`). Missing fields take their
/// defaults, and a missing file means all defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mpc_path: String,           // mpc executable (name on PATH or absolute path)
    pub music_uri: String,          // Prefix joined onto library file names, e.g. "file:///mnt/usb/music/"
    pub max_queued: usize,          // Maximum number of tracks or stations to queue
    pub internet_max_results: usize, // Videos to queue from an internet search (the stream helper is slow)
    pub stations_file: PathBuf,     // Radio station CSV file
    pub stream_helper: String,      // Command that adds a video page URL to the mpc queue
    pub news_url: String,           // Page scraped for the latest news bulletin
    pub download_dir: PathBuf,      // Where news bulletins are downloaded
    pub youtube_api_key: Option<String>, // Use the Data API instead of scraping when set
    pub http_timeout_secs: u64,     // Timeout for every HTTP request
    pub skill_icon: String,         // Icon reported with every search result
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR);

        Settings {
            mpc_path: "mpc".to_string(),
            music_uri: String::new(),
            max_queued: 20,
            internet_max_results: 3,
            stations_file: data_dir.join("radio.stations.csv"),
            stream_helper: "/usr/local/sbin/ytadd".to_string(),
            news_url: "https://www.npr.org/podcasts/500005/npr-news-now".to_string(),
            download_dir: cache_dir,
            youtube_api_key: None,
            http_timeout_secs: 10,
            skill_icon: "ui/music-solid.svg".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default location (or the env override)
    pub fn load() -> Result<Self, SkillError> {
        match resolve_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::warn!("No config directory available, using default settings");
                Ok(Settings::default())
            }
        }
    }

    /// Load settings from a specific file; a missing file gives defaults
    pub fn load_from(path: &Path) -> Result<Self, SkillError> {
        if !path.exists() {
            log::info!("Settings file {} not found, using defaults", path.display());
            return Ok(Settings::default());
        }

        log::info!("Loading settings from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), SkillError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_skill_err(|e| SkillError::Config(format!("Failed to create config directory: {}", e)))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Basic sanity checks on loaded settings
    pub fn validate(&self) -> Result<(), SkillError> {
        if self.max_queued == 0 {
            return Err(SkillError::Config("max_queued must be >= 1".to_string()));
        }
        if self.internet_max_results == 0 {
            return Err(SkillError::Config("internet_max_results must be >= 1".to_string()));
        }
        if self.mpc_path.trim().is_empty() {
            return Err(SkillError::Config("mpc_path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve `mpc_path` to an absolute executable path
    pub fn resolve_mpc(&self) -> Result<PathBuf, SkillError> {
        which::which(&self.mpc_path)
            .map_skill_err(|e| SkillError::Config(format!("mpc not found ({}): {}", self.mpc_path, e)))
    }
}

/// Settings path from `LOCAL_MUSIC_SKILL_CONFIG` or the user config directory
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir().map(|d| d.join(APP_DIR).join("settings.json"))
}
