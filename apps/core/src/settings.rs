use std::path::PathBuf;

use crate::config::{self, Config};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub keyword: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the desktop settings, polled at call time.
pub trait SettingsProvider: Send + Sync {
    fn snapshot(&self) -> Result<Settings, SettingsError>;
}

/// Settings fixed at construction, taken from an already loaded config.
pub struct ConfigSettings {
    settings: Settings,
}

impl ConfigSettings {
    pub fn new(cfg: &Config) -> Self {
        Self {
            settings: Settings {
                enabled: cfg.enabled,
                keyword: cfg.keyword.clone(),
            },
        }
    }
}

impl SettingsProvider for ConfigSettings {
    fn snapshot(&self) -> Result<Settings, SettingsError> {
        Ok(self.settings.clone())
    }
}

/// Settings re-read from the config file on every poll, so edits apply
/// without restarting a long-lived service.
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsProvider for FileSettings {
    fn snapshot(&self) -> Result<Settings, SettingsError> {
        let cfg = config::load(Some(&self.path))
            .map_err(|error| SettingsError::Unavailable(error.to_string()))?;
        Ok(Settings {
            enabled: cfg.enabled,
            keyword: cfg.keyword,
        })
    }
}

pub fn validate_keyword(input: &str) -> Result<(), String> {
    if input.contains(':') {
        return Err("Keyword must not contain ':'.".to_string());
    }

    if input.chars().any(char::is_control) {
        return Err("Keyword must not contain control characters.".to_string());
    }

    if input.trim() != input {
        return Err("Keyword must not start or end with whitespace.".to_string());
    }

    Ok(())
}
