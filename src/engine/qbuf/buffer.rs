use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::engine::backend::BackendStore;
use crate::engine::codec::{composite, row, sort_key};
use crate::engine::errors::BackendError;
use crate::engine::qbuf::types::QBufRef;
use crate::engine::schema::{QuerySchema, QuerySpec};
use crate::engine::types::ScalarValue;

pub type Row = Vec<ScalarValue>;
type KeyedRow = (Vec<u8>, Row);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QBufStatus {
    CollectingChunks,
    ServingFetches,
    Expiring,
    Expired,
}

/// Where a buffer's rows live. A qbuf never holds data in both places:
/// it either stages in memory or everything sits in the shared store.
#[derive(Debug)]
pub enum QBufData {
    /// Key-sorted `(composite_key, row)` staging while collecting.
    Staging(Vec<KeyedRow>),
    /// Keys stripped once complete without ever spilling.
    Resident(Vec<Row>),
    /// Rows live in the shared store under this qbuf's bucket.
    Spilled(Arc<BackendStore>),
}

/// In-memory state of one query buffer.
#[derive(Debug)]
pub struct QBuf {
    pub qref: QBufRef,
    /// Human-readable name, logs only.
    pub name: String,
    pub status: QBufStatus,
    /// The compiled query this buffer was created for. Kept to match
    /// duplicate queries, which today always miss (every create is new).
    pub orig_query: QuerySpec,
    pub schema: QuerySchema,
    /// Serving-phase idle timeout; overridable per qbuf.
    pub expire_after: Duration,
    pub data: QBufData,
    pub chunks_got: u32,
    pub chunks_need: u32,
    pub total_records: u64,
    /// Externalized byte size of all accepted chunk data.
    pub size_bytes: u64,
    pub last_accessed: Instant,
    pub ready_notifier: Option<oneshot::Sender<QBufRef>>,
}

impl QBuf {
    pub fn new(
        qref: QBufRef,
        orig_query: QuerySpec,
        schema: QuerySchema,
        expire_after: Duration,
    ) -> Self {
        let name = orig_query.display_name();
        let chunks_need = orig_query.n_subqueries;
        let mut qbuf = Self {
            qref,
            name,
            status: QBufStatus::CollectingChunks,
            orig_query,
            schema,
            expire_after,
            data: QBufData::Staging(Vec::new()),
            chunks_got: 0,
            chunks_need,
            total_records: 0,
            size_bytes: 0,
            last_accessed: Instant::now(),
            ready_notifier: None,
        };
        // A query with no subqueries is born complete.
        if chunks_need == 0 {
            qbuf.finish_collecting();
        }
        qbuf
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self.data, QBufData::Spilled(_))
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    /// Composite-key every row of one chunk. `chunk_id` and the row
    /// index only break ties; the sort key carries the ORDER BY values.
    pub fn build_keyed(&self, chunk_id: u32, rows: Vec<Row>) -> Vec<KeyedRow> {
        rows.into_iter()
            .enumerate()
            .map(|(idx, r)| {
                let sort = sort_key::encode_sort_key(&self.schema.order_by_key, &r);
                let key = composite::encode_key(self.qref.as_bytes(), &sort, chunk_id, idx as u32);
                (key, r)
            })
            .collect()
    }

    /// Merge a keyed chunk into the in-memory staging list, keeping the
    /// whole sequence sorted by composite key.
    pub fn stage_chunk(&mut self, mut keyed: Vec<KeyedRow>) {
        if let QBufData::Staging(staged) = &mut self.data {
            staged.append(&mut keyed);
            staged.sort_by(|a, b| a.0.cmp(&b.0));
        }
    }

    /// Write a keyed chunk through the backend. The first spill flushes
    /// the staged rows in the same put; only full success flips the
    /// qbuf to spilled, so a failed chunk leaves it retryable.
    pub fn spill_chunk(
        &mut self,
        backend: &Arc<BackendStore>,
        keyed: &[KeyedRow],
    ) -> Result<(), BackendError> {
        let staged_len = match &self.data {
            QBufData::Staging(staged) => staged.len(),
            _ => 0,
        };
        let mut batch: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(staged_len + keyed.len());
        if let QBufData::Staging(staged) = &self.data {
            for (key, r) in staged {
                batch.push((key.clone(), row::encode_row(r)?));
            }
        }
        for (key, r) in keyed {
            batch.push((key.clone(), row::encode_row(r)?));
        }

        backend.put(&batch)?;
        self.data = QBufData::Spilled(Arc::clone(backend));
        Ok(())
    }

    /// Last chunk arrived: start serving. Staged rows drop their keys
    /// (order preserved); the one-shot notifier fires if registered.
    pub fn finish_collecting(&mut self) {
        self.status = QBufStatus::ServingFetches;
        if let QBufData::Staging(staged) = &mut self.data {
            let rows = std::mem::take(staged).into_iter().map(|(_, r)| r).collect();
            self.data = QBufData::Resident(rows);
        }
        self.notify_ready();
    }

    pub fn notify_ready(&mut self) {
        if let Some(tx) = self.ready_notifier.take() {
            let _ = tx.send(self.qref.clone());
        }
    }

    /// One page of rows, from memory or via a bucket-ranged scan.
    pub fn page(&self, offset: usize, limit: Option<usize>) -> Result<Vec<Row>, BackendError> {
        match &self.data {
            QBufData::Resident(rows) => {
                let start = offset.min(rows.len());
                let end = limit
                    .map(|l| start.saturating_add(l).min(rows.len()))
                    .unwrap_or(rows.len());
                Ok(rows[start..end].to_vec())
            }
            QBufData::Spilled(backend) => backend.scan(self.qref.as_bytes(), offset, limit),
            // Callers gate on status; a collecting qbuf is never paged.
            QBufData::Staging(_) => Ok(Vec::new()),
        }
    }
}
