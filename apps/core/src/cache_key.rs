use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// SHA-256 of a search term, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_term(term: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(term.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `root/<h[0:2]>/<h[2:4]>/<h[4:6]>`. Distinct terms may share a shard
    /// file; entries inside it are keyed by the raw term.
    pub fn shard_path(&self, root: &Path) -> PathBuf {
        root.join(&self.0[0..2])
            .join(&self.0[2..4])
            .join(&self.0[4..6])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
