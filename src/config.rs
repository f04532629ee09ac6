use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

/// Key names as written in the config file; missing keys take their default
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub quit: String,
    pub new: String,
    pub edit: String,
    pub save: String,
    pub delete: String,
    pub search: String,
    pub filter: String,
    pub reset_filters: String,
    pub toggle_task_status: String,
    pub list_up: String,
    pub list_down: String,
    pub help: String,
}

/// Named or `#rrggbb` colors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub fg: String,
    pub bg: String,
    pub highlight_bg: String,
    pub highlight_fg: String,
    pub accent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
            search_debounce_ms: default_search_debounce_ms(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let key = |k: &str| k.to_string();
        Self {
            quit: key("q"),
            new: key("n"),
            edit: key("e"),
            save: key("Ctrl+s"),
            delete: key("d"),
            search: key("/"),
            filter: key("f"),
            reset_filters: key("r"),
            toggle_task_status: key("Space"),
            list_up: key("k"),
            list_down: key("j"),
            help: key("F1"),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::from_colors(["white", "black", "blue", "white", "yellow"])
    }
}

impl Theme {
    /// Build from `[fg, bg, highlight_bg, highlight_fg, accent]`
    fn from_colors([fg, bg, highlight_bg, highlight_fg, accent]: [&str; 5]) -> Self {
        Self {
            fg: fg.to_string(),
            bg: bg.to_string(),
            highlight_bg: highlight_bg.to_string(),
            highlight_fg: highlight_fg.to_string(),
            accent: accent.to_string(),
        }
    }

    /// Themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();

        themes.insert("default".to_string(), Theme::default());

        themes.insert("light".to_string(), Theme::from_colors(["black", "white", "blue", "white", "magenta"]));
        themes.insert("green".to_string(), Theme::from_colors(["green", "black", "yellow", "black", "lightgreen"]));
        themes
    }
}

// Default value functions
fn default_database_path() -> String {
    // Fallback only; the profile decides the real path at load time
    if let Some(data_dir) = utils::get_data_dir(utils::Profile::Prod) {
        data_dir.join("tasks.db").to_string_lossy().to_string()
    } else {
        "~/.local/share/tasktrack/tasks.db".to_string()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration for `profile`, creating a default file if missing
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        let mut config = Self::load_from_path(&config_path)?;
        // Keep the database inside the profile's data directory
        config.database_path = Self::default_database_path_for_profile(profile);
        Ok(config)
    }

    /// Load configuration from an explicit file, creating it with defaults if missing
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            let mut config = Config::default();
            config.save_to_path(path)?;
            Ok(config)
        }
    }

    /// Write configuration to `path`, creating parent directories
    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Path to the config file of `profile`
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("tasks.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/tasktrack-dev/tasks.db".to_string(),
                utils::Profile::Prod => "~/.local/share/tasktrack/tasks.db".to_string(),
            }
        }
    }

    /// Database path with `~` expanded
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Directory for log files: next to the database
    pub fn get_log_dir(&self) -> PathBuf {
        self.get_database_path()
            .parent()
            .map(|p| p.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// The active theme: user-defined first, then presets, then the default
    pub fn get_active_theme(&self) -> Theme {
        self.themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            search_debounce_ms = 150
            [key_bindings]
            quit = "x"
            "#,
        )
        .unwrap();
        assert_eq!(config.search_debounce(), Duration::from_millis(150));
        assert_eq!(config.key_bindings.quit, "x");
        assert_eq!(config.key_bindings.new, "n");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn active_theme_prefers_user_definitions() {
        let mut config = Config::default();
        assert_eq!(config.get_active_theme(), Theme::default());

        config.current_theme = "light".to_string();
        assert_eq!(config.get_active_theme().bg, "white");

        config.themes.insert("light".to_string(), Theme {
            bg: "gray".to_string(),
            ..Theme::default()
        });
        assert_eq!(config.get_active_theme().bg, "gray");

        config.current_theme = "missing".to_string();
        assert_eq!(config.get_active_theme(), Theme::default());
    }
}
