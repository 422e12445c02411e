use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_EXPIRY_SECS: u64 = 86_400;
pub const TOKEN_PLACEHOLDER: &str = "{token}";

const APP_DIR_NAME: &str = "pkgsearch";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    pub keyword: String,
    pub cache_root: PathBuf,
    pub expiry_secs: u64,
    pub api_base_url: String,
    pub icon_url_template: String,
    pub package_url_prefix: String,
    pub rows_per_page: u16,
    pub http_timeout_secs: u64,
    pub log_level: String,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            keyword: String::new(),
            cache_root: stable_cache_dir(),
            expiry_secs: DEFAULT_EXPIRY_SECS,
            api_base_url: "https://apps.fedoraproject.org/packages".to_string(),
            icon_url_template: "https://apps.fedoraproject.org/packages/images/icons/{token}.png"
                .to_string(),
            package_url_prefix: "https://apps.fedoraproject.org/packages".to_string(),
            rows_per_page: 10,
            http_timeout_secs: 10,
            log_level: "info".to_string(),
            config_path: default_config_path(),
        }
    }
}

impl Config {
    pub fn icon_dir(&self) -> PathBuf {
        self.cache_root.join("icons")
    }

    pub fn search_dir(&self) -> PathBuf {
        self.cache_root.join("search")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.cache_root.join("logs")
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

pub fn stable_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Loads the config at `path` (or the default location), falling back to
/// defaults when the file does not exist.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            let cfg = Config {
                config_path: path,
                ..Config::default()
            };
            validate(&cfg)?;
            return Ok(cfg);
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    let mut cfg = parse(&path, &raw)?;
    cfg.config_path = path;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let encoded = toml::to_string_pretty(cfg)?;
    std::fs::write(&cfg.config_path, encoded).map_err(|source| ConfigError::Io {
        path: cfg.config_path.clone(),
        source,
    })
}

fn parse(path: &Path, raw: &str) -> Result<Config, ConfigError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);

    let parsed = if is_json {
        json5::from_str::<Config>(raw).map_err(|e| e.to_string())
    } else {
        toml::from_str::<Config>(raw).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.expiry_secs == 0 {
        return Err(invalid("expiry_secs must be greater than zero"));
    }

    if !(1..=100).contains(&cfg.rows_per_page) {
        return Err(invalid("rows_per_page out of range"));
    }

    if !(1..=120).contains(&cfg.http_timeout_secs) {
        return Err(invalid("http_timeout_secs out of range"));
    }

    if cfg.cache_root.as_os_str().is_empty() {
        return Err(invalid("cache_root is required"));
    }

    for (name, url) in [
        ("api_base_url", &cfg.api_base_url),
        ("icon_url_template", &cfg.icon_url_template),
        ("package_url_prefix", &cfg.package_url_prefix),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(&format!("{name} must be an http(s) URL")));
        }
    }

    if !cfg.icon_url_template.contains(TOKEN_PLACEHOLDER) {
        return Err(invalid("icon_url_template must contain {token}"));
    }

    if !LOG_LEVELS.contains(&cfg.log_level.to_ascii_lowercase().as_str()) {
        return Err(invalid(&format!("unknown log_level '{}'", cfg.log_level)));
    }

    crate::settings::validate_keyword(&cfg.keyword).map_err(ConfigError::Invalid)?;

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
