use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache_key::CacheKey;
use crate::keyed_lock::KeyedLocks;
use crate::model::PackageRow;
use crate::query::{PackageSource, QueryError};
use crate::shard_store::{self, CacheRecord, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum TermCacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Wall-clock source in epoch seconds.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Term-keyed result cache spread over SQLite shard files under `root`.
pub struct TermCache {
    root: PathBuf,
    expiry_secs: u64,
    source: Arc<dyn PackageSource>,
    clock: Arc<dyn Clock>,
    fills: KeyedLocks<String>,
}

impl TermCache {
    pub fn new(root: PathBuf, expiry_secs: u64, source: Arc<dyn PackageSource>) -> Self {
        Self::with_clock(root, expiry_secs, source, Arc::new(SystemClock))
    }

    pub fn with_clock(
        root: PathBuf,
        expiry_secs: u64,
        source: Arc<dyn PackageSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            root,
            expiry_secs,
            source,
            clock,
            fills: KeyedLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shard_path(&self, term: &str) -> PathBuf {
        CacheKey::for_term(term).shard_path(&self.root)
    }

    /// Returns the rows for an already normalized term, refilling from the
    /// package source when the stored record is missing or expired.
    ///
    /// A failed refill falls back to whatever rows are stored for the term;
    /// the error only surfaces when nothing was stored at all. Rows that were
    /// fetched but could not be written back are still returned.
    pub fn lookup(&self, term: &str) -> Result<Vec<PackageRow>, TermCacheError> {
        let _fill = self.fills.lock(&term.to_string());

        let shard = shard_store::open(&self.shard_path(term))?;
        let existing = shard.get(term)?;

        let now = self.clock.now_secs();
        if let Some(record) = existing.as_ref().filter(|r| !self.is_expired(r, now)) {
            log::debug!("term cache hit for '{term}'");
            return Ok(record.rows.clone());
        }

        match self.source.search(term) {
            Ok(rows) => {
                log::info!(
                    "refilled '{term}' from {} ({} rows)",
                    self.source.source_name(),
                    rows.len()
                );
                let fresh = CacheRecord {
                    created_at: now,
                    rows,
                };
                if let Err(error) = shard.put(term, &fresh).and_then(|()| shard.close()) {
                    log::warn!("could not store refilled rows for '{term}': {error}");
                }
                Ok(fresh.rows)
            }
            Err(error) => match existing {
                Some(stale) => {
                    log::warn!("serving stale rows for '{term}' after refill failure: {error}");
                    Ok(stale.rows)
                }
                None => Err(error.into()),
            },
        }
    }

    /// Fresh while `now - created_at <= expiry`.
    fn is_expired(&self, record: &CacheRecord, now: u64) -> bool {
        now.saturating_sub(record.created_at) > self.expiry_secs
    }
}
