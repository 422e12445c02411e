use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use walkdir::WalkDir;

use crate::config::{Config, TOKEN_PLACEHOLDER};
use crate::keyed_lock::KeyedLocks;

pub const ICON_EXTENSION: &str = "png";
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
pub const MAX_ICON_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum IconError {
    #[error("invalid icon token '{0}'")]
    InvalidToken(String),
    #[error("icon download failed: {message}")]
    Http { message: String },
    #[error("icon download from {url} is not a PNG image")]
    NotAnImage { url: String },
    #[error("icon download from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
    #[error("icon cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to scan icon cache: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Downloads one icon into `dest`, leaving nothing behind on failure.
pub trait IconFetcher: Send + Sync {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), IconError>;
}

pub struct HttpIconFetcher {
    agent: ureq::Agent,
}

impl HttpIconFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl IconFetcher for HttpIconFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), IconError> {
        let response = self.agent.get(url).call().map_err(|err| {
            let message = match err {
                ureq::Error::Status(code, _response) => {
                    format!("server returned status {code} for {url}")
                }
                ureq::Error::Transport(transport) => {
                    format!("transport error for {url}: {transport}")
                }
            };
            IconError::Http { message }
        })?;

        let too_large = || IconError::TooLarge {
            url: url.to_string(),
            limit: MAX_ICON_BYTES,
        };
        let declared = response
            .header("Content-Length")
            .and_then(|len| len.trim().parse::<u64>().ok());
        if declared.is_some_and(|len| len > MAX_ICON_BYTES) {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_ICON_BYTES + 1)
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > MAX_ICON_BYTES {
            return Err(too_large());
        }

        if !bytes.starts_with(&PNG_SIGNATURE) {
            return Err(IconError::NotAnImage {
                url: url.to_string(),
            });
        }

        atomic_write(dest, &bytes)
    }
}

/// Writes through a temp file in the destination directory and renames it
/// into place.
pub fn atomic_write(dest: &Path, bytes: &[u8]) -> Result<(), IconError> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|err| IconError::Io(err.error))?;
    Ok(())
}

/// Icon files keyed by their token, fetched once and kept forever.
pub struct IconStore {
    dir: PathBuf,
    url_template: String,
    fetcher: Arc<dyn IconFetcher>,
    entries: Mutex<HashMap<String, PathBuf>>,
    fetches: KeyedLocks<String>,
}

impl IconStore {
    pub fn new(dir: PathBuf, url_template: &str, fetcher: Arc<dyn IconFetcher>) -> Self {
        Self {
            dir,
            url_template: url_template.to_string(),
            fetcher,
            entries: Mutex::new(HashMap::new()),
            fetches: KeyedLocks::new(),
        }
    }

    /// Builds the store and runs [`IconStore::initialize`].
    pub fn open(cfg: &Config, fetcher: Arc<dyn IconFetcher>) -> Result<Self, IconError> {
        let store = Self::new(cfg.icon_dir(), &cfg.icon_url_template, fetcher);
        store.initialize()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the icon directory and rebuilds the token map from the
    /// files already in it. Returns the number of known icons.
    pub fn initialize(&self) -> Result<usize, IconError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut found = HashMap::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ICON_EXTENSION) {
                continue;
            }
            let Some(token) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_token(token).is_ok() {
                found.insert(token.to_string(), path.to_path_buf());
            }
        }

        let count = found.len();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        *entries = found;
        log::debug!("icon cache initialized with {count} icons from {}", self.dir.display());
        Ok(count)
    }

    pub fn url_for(&self, token: &str) -> String {
        self.url_template.replace(TOKEN_PLACEHOLDER, token)
    }

    pub fn path_for(&self, token: &str) -> PathBuf {
        self.dir.join(format!("{token}.{ICON_EXTENSION}"))
    }

    /// Local path holding the icon for `token`, downloading it on first use.
    /// A failed download is not remembered, so the next call retries.
    pub fn resolve(&self, token: &str) -> Result<PathBuf, IconError> {
        validate_token(token)?;
        if let Some(path) = self.cached(token) {
            return Ok(path);
        }

        let _fetch = self.fetches.lock(&token.to_string());
        if let Some(path) = self.cached(token) {
            return Ok(path);
        }

        let url = self.url_for(token);
        let path = self.path_for(token);
        self.fetcher.fetch(&url, &path)?;
        log::info!("cached icon '{token}' at {}", path.display());

        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.to_string(), path.clone());
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, token: &str) -> Option<PathBuf> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .cloned()
    }
}

fn validate_token(token: &str) -> Result<(), IconError> {
    let unsafe_token = token.is_empty()
        || token == "."
        || token.contains("..")
        || token
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control());
    if unsafe_token {
        return Err(IconError::InvalidToken(token.to_string()));
    }
    Ok(())
}
