use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::engine::codec::{composite, row};
use crate::engine::errors::BackendError;
use crate::engine::types::ScalarValue;

const LOG_TARGET: &str = "engine::backend::store";

// One table holds every qbuf; isolation comes from the bucket portion of
// the composite key.
const ROWS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("qbuf_rows");

/// Adapter over the shared ordered KV store. Only the manager actor
/// calls into it.
pub struct BackendStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for BackendStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendStore")
            .field("path", &self.path)
            .finish()
    }
}

impl BackendStore {
    /// Create a store at `path`, failing if one already exists. The
    /// store is fresh per process; the manager controls row lifetime, so
    /// there is no auto-expiry, and redb stores bytes uncompressed.
    pub fn open(path: &Path, cache_bytes: usize) -> Result<Self, BackendError> {
        if path.exists() {
            return Err(BackendError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::builder().set_cache_size(cache_bytes).create(path)?;

        // Create the table up front so scans on an empty store succeed.
        let txn = db.begin_write()?;
        txn.open_table(ROWS_TABLE)?;
        txn.commit()?;

        debug!(target: LOG_TARGET, path = %path.display(), "Backend store opened");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Wipe the store files.
    pub fn destroy(path: &Path) -> std::io::Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store pre-encoded rows under their composite keys. One write
    /// transaction per chunk; any failure rejects the chunk as a whole.
    pub fn put(&self, keyed_rows: &[(Vec<u8>, Vec<u8>)]) -> Result<(), BackendError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ROWS_TABLE)?;
            for (key, value) in keyed_rows {
                table.insert(key.as_slice(), value.as_slice())?;
            }
        }
        txn.commit()?;
        debug!(target: LOG_TARGET, rows = keyed_rows.len(), "Chunk written to backend");
        Ok(())
    }

    /// Ordered scan over one bucket, skipping `offset` rows and yielding
    /// at most `limit` (all if `None`), decoded.
    pub fn scan(
        &self,
        ref_bytes: &[u8],
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Vec<ScalarValue>>, BackendError> {
        let max = limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        if max == 0 {
            return Ok(rows);
        }

        let (lower, upper) = composite::bucket_range(ref_bytes);
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ROWS_TABLE)?;
        for (i, entry) in table.range(lower.as_slice()..upper.as_slice())?.enumerate() {
            let (_, value) = entry?;
            if i < offset {
                continue;
            }
            rows.push(row::decode_row(value.value())?);
            if rows.len() == max {
                break;
            }
        }
        Ok(rows)
    }

    /// Remove every key of one bucket. Used when a dropped qbuf had
    /// spilled.
    pub fn delete_bucket(&self, ref_bytes: &[u8]) -> Result<usize, BackendError> {
        let (lower, upper) = composite::bucket_range(ref_bytes);
        let txn = self.db.begin_write()?;
        let removed;
        {
            let mut table = txn.open_table(ROWS_TABLE)?;
            let keys: Vec<Vec<u8>> = table
                .range(lower.as_slice()..upper.as_slice())?
                .map(|entry| entry.map(|(k, _)| k.value().to_vec()))
                .collect::<Result<_, redb::StorageError>>()?;
            removed = keys.len();
            for key in &keys {
                table.remove(key.as_slice())?;
            }
        }
        txn.commit()?;
        debug!(target: LOG_TARGET, rows = removed, "Bucket dropped from backend");
        Ok(removed)
    }
}
