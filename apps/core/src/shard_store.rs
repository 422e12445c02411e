use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::model::PackageRow;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to prepare shard directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shard {path}: {source}")]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to encode cached rows: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Rows cached for one term together with their fill time (epoch seconds).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheRecord {
    pub created_at: u64,
    pub rows: Vec<PackageRow>,
}

/// One open shard file: a small key-value table keyed by the raw term.
/// The handle is released when the value is dropped.
pub struct Shard {
    conn: Connection,
    path: PathBuf,
}

pub fn open(path: &Path) -> Result<Shard, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let sqlite = |source: rusqlite::Error| StoreError::Sqlite {
        path: path.to_path_buf(),
        source,
    };
    let conn = Connection::open(path).map_err(sqlite)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(sqlite)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entry (
            term TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            rows TEXT NOT NULL
        )",
    )
    .map_err(sqlite)?;

    Ok(Shard {
        conn,
        path: path.to_path_buf(),
    })
}

impl Shard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the record for `term`. A row whose payload no longer decodes
    /// reads as absent so the caller refills it.
    pub fn get(&self, term: &str) -> Result<Option<CacheRecord>, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT created_at, rows FROM entry WHERE term = ?1",
                params![term],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|source| self.sqlite(source))?;

        let Some((created_at, encoded)) = found else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<PackageRow>>(&encoded) {
            Ok(rows) => Ok(Some(CacheRecord {
                created_at: created_at.max(0) as u64,
                rows,
            })),
            Err(error) => {
                log::warn!(
                    "discarding undecodable entry in shard {}: {error}",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }

    pub fn put(&self, term: &str, record: &CacheRecord) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(&record.rows)?;
        let created_at = i64::try_from(record.created_at).unwrap_or(i64::MAX);
        self.conn
            .execute(
                "INSERT INTO entry (term, created_at, rows) VALUES (?1, ?2, ?3)
                 ON CONFLICT(term) DO UPDATE SET created_at=excluded.created_at, rows=excluded.rows",
                params![term, created_at, encoded],
            )
            .map_err(|source| self.sqlite(source))?;
        Ok(())
    }

    pub fn terms(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT term FROM entry ORDER BY term")
            .map_err(|source| self.sqlite(source))?;
        let terms = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|source| self.sqlite(source))?;
        Ok(terms)
    }

    /// Closes the handle, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), StoreError> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, source)| StoreError::Sqlite { path, source })
    }

    fn sqlite(&self, source: rusqlite::Error) -> StoreError {
        StoreError::Sqlite {
            path: self.path.clone(),
            source,
        }
    }
}
