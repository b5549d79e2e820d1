use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::engine::backend::BackendStore;
use crate::engine::codec::composite;
use crate::engine::errors::{BackendError, QBufError};
use crate::engine::qbuf::buffer::{QBuf, QBufData, QBufStatus, Row};
use crate::engine::qbuf::memory::StagingGauge;
use crate::engine::qbuf::message::QBufMessage;
use crate::engine::qbuf::types::{CreateMode, ExpiryAck, FetchResult, QBufRef};
use crate::engine::schema::{QuerySchema, QuerySpec};
use crate::engine::types::row_external_size;
use crate::shared::config::CONFIG;

const LOG_TARGET: &str = "engine::qbuf::manager";

/// Manager tunables. Production reads them from `CONFIG`; tests build
/// them directly over temp dirs.
#[derive(Debug, Clone)]
pub struct QBufConfig {
    pub root_dir: PathBuf,
    /// Aggregate size above which new qbuf creation is refused.
    pub soft_watermark: u64,
    /// Aggregate size above which any new chunk is refused.
    pub hard_watermark: u64,
    /// In-memory budget above which qbufs spill to the backend.
    pub inmem_max: u64,
    pub max_query_data_size: u64,
    pub default_expire: Duration,
    pub incomplete_release: Duration,
    pub tick_interval: Duration,
    /// Drive the expiry handshake from the ticker. Off when an external
    /// backend (or a test) performs the handshake itself.
    pub auto_expiry_handshake: bool,
    pub write_buffer_bytes: usize,
}

impl QBufConfig {
    pub fn from_settings() -> Self {
        let q = &CONFIG.qbuf;
        Self {
            root_dir: PathBuf::from(&q.root_dir),
            soft_watermark: q.soft_watermark,
            hard_watermark: q.hard_watermark,
            inmem_max: q.inmem_max,
            max_query_data_size: q.max_query_data_size,
            default_expire: Duration::from_millis(q.default_expire_ms),
            incomplete_release: Duration::from_millis(q.incomplete_release_ms),
            tick_interval: Duration::from_millis(q.tick_interval_ms),
            auto_expiry_handshake: q.auto_expiry_handshake,
            write_buffer_bytes: CONFIG.backend.write_buffer_bytes,
        }
    }

    pub(crate) fn store_path(&self) -> PathBuf {
        self.root_dir.join("qbuf.redb")
    }
}

#[derive(Debug)]
enum InitStatus {
    InProgress,
    Failed(String),
    Ready,
}

/// The serialized command dispatcher. One task owns this state; every
/// public operation and the lifecycle tick go through its queue.
pub struct QBufManager {
    config: QBufConfig,
    init: InitStatus,
    backend: Option<Arc<BackendStore>>,
    qbufs: BTreeMap<QBufRef, QBuf>,
    total_size: u64,
    gauge: StagingGauge,
    max_query_data_size: u64,
    cmd_tx: Sender<QBufMessage>,
}

impl QBufManager {
    pub fn new(config: QBufConfig, cmd_tx: Sender<QBufMessage>) -> Self {
        let gauge = StagingGauge::new(config.inmem_max);
        let max_query_data_size = config.max_query_data_size;
        Self {
            config,
            init: InitStatus::InProgress,
            backend: None,
            qbufs: BTreeMap::new(),
            total_size: 0,
            gauge,
            max_query_data_size,
            cmd_tx,
        }
    }

    /// Main command loop. Runs until every handle is dropped.
    pub async fn run(mut self, mut rx: Receiver<QBufMessage>) {
        info!(target: LOG_TARGET, "Query buffer manager started");

        while let Some(msg) = rx.recv().await {
            match msg {
                QBufMessage::InitDone(result) => self.on_init_done(result),
                QBufMessage::Tick => self.on_tick(),
                QBufMessage::GetOrCreate { spec, reply } => {
                    let _ = reply.send(self.on_get_or_create(spec));
                }
                QBufMessage::Delete { qref, reply } => {
                    let _ = reply.send(self.on_delete(qref));
                }
                QBufMessage::BatchPut { qref, rows, reply } => {
                    let _ = reply.send(self.on_batch_put(qref, rows));
                }
                QBufMessage::SetReadyNotifier {
                    qref,
                    notifier,
                    reply,
                } => {
                    let _ = reply.send(self.on_set_ready_notifier(qref, notifier));
                }
                QBufMessage::Fetch {
                    qref,
                    limit,
                    offset,
                    reply,
                } => {
                    let _ = reply.send(self.on_fetch(qref, limit, offset));
                }
                QBufMessage::GetExpiry { qref, reply } => {
                    let _ = reply.send(self.on_get_expiry(qref));
                }
                QBufMessage::SetExpiry {
                    qref,
                    expire_after_ms,
                    reply,
                } => {
                    let _ = reply.send(self.on_set_expiry(qref, expire_after_ms));
                }
                QBufMessage::GetMaxQueryDataSize { reply } => {
                    let _ = reply.send(self.ensure_ready().map(|_| self.max_query_data_size));
                }
                QBufMessage::SetMaxQueryDataSize { bytes, reply } => {
                    let result = self.ensure_ready().map(|_| {
                        self.max_query_data_size = bytes;
                    });
                    let _ = reply.send(result);
                }
                QBufMessage::KillAll { reply } => {
                    let _ = reply.send(self.on_kill_all());
                }
                QBufMessage::BackendExpiryRequest {
                    bucket,
                    qref,
                    reply,
                } => {
                    let _ = reply.send(self.on_backend_expiry_request(bucket, qref));
                }
            }
        }

        info!(target: LOG_TARGET, "Query buffer manager shutting down");
    }

    fn ensure_ready(&self) -> Result<(), QBufError> {
        match &self.init {
            InitStatus::Ready => Ok(()),
            InitStatus::InProgress => Err(QBufError::NotReady),
            InitStatus::Failed(reason) => Err(QBufError::InitFailed(reason.clone())),
        }
    }

    fn on_init_done(&mut self, result: Result<BackendStore, BackendError>) {
        match result {
            Ok(store) => {
                info!(target: LOG_TARGET, path = %store.path().display(), "Backend store ready");
                self.backend = Some(Arc::new(store));
                self.init = InitStatus::Ready;
            }
            Err(e) => {
                error!(target: LOG_TARGET, error = %e, "Backend init failed; manager frozen until restart");
                self.init = InitStatus::Failed(e.to_string());
            }
        }
    }

    fn on_get_or_create(&mut self, spec: QuerySpec) -> Result<(CreateMode, QBufRef), QBufError> {
        self.ensure_ready()?;

        if self.total_size > self.config.soft_watermark {
            debug!(
                target: LOG_TARGET,
                total_size = self.total_size,
                soft_watermark = self.config.soft_watermark,
                "Refusing new query buffer above soft watermark"
            );
            return Err(QBufError::QuotaExceeded);
        }

        let schema = QuerySchema::resolve(&spec)?;
        let qref = QBufRef::generate();
        let expire_after = spec
            .options
            .expire_after_ms
            .map(Duration::from_millis)
            .unwrap_or(self.config.default_expire);
        let qbuf = QBuf::new(qref.clone(), spec, schema, expire_after);

        info!(
            target: LOG_TARGET,
            qref = %qref,
            name = %qbuf.name,
            chunks_need = qbuf.chunks_need,
            "Query buffer created"
        );
        self.qbufs.insert(qref.clone(), qbuf);
        Ok((CreateMode::New, qref))
    }

    fn on_delete(&mut self, qref: QBufRef) -> Result<(), QBufError> {
        self.ensure_ready()?;
        let qbuf = self
            .qbufs
            .remove(&qref)
            .ok_or_else(|| QBufError::BadRef(qref.to_string()))?;
        self.total_size = self.total_size.saturating_sub(qbuf.size_bytes);
        self.drop_qbuf_data(&qbuf);
        info!(target: LOG_TARGET, qref = %qref, "Query buffer deleted");
        Ok(())
    }

    fn on_batch_put(&mut self, qref: QBufRef, rows: Vec<Row>) -> Result<(), QBufError> {
        self.ensure_ready()?;
        let qbuf = self
            .qbufs
            .get_mut(&qref)
            .ok_or_else(|| QBufError::BadRef(qref.to_string()))?;
        if qbuf.status != QBufStatus::CollectingChunks {
            return Err(QBufError::AlreadyFinished);
        }

        let chunk_bytes: u64 = rows.iter().map(|r| row_external_size(r)).sum();
        if self.total_size.saturating_add(chunk_bytes) > self.config.hard_watermark {
            debug!(
                target: LOG_TARGET,
                qref = %qref,
                chunk_bytes,
                total_size = self.total_size,
                "Refusing chunk above hard watermark"
            );
            return Err(QBufError::QuotaExceeded);
        }
        if qbuf.size_bytes.saturating_add(chunk_bytes) > self.max_query_data_size {
            debug!(
                target: LOG_TARGET,
                qref = %qref,
                size_bytes = qbuf.size_bytes,
                chunk_bytes,
                "Refusing chunk above per-query data cap"
            );
            return Err(QBufError::QuotaExceeded);
        }

        let chunk_id = qbuf.chunks_got;
        let n_rows = rows.len() as u64;
        let keyed = qbuf.build_keyed(chunk_id, rows);

        if !qbuf.is_spilled() && self.gauge.can_afford(chunk_bytes) {
            qbuf.stage_chunk(keyed);
            self.gauge.grow(chunk_bytes);
        } else {
            let Some(backend) = &self.backend else {
                return Err(QBufError::NotReady);
            };
            let was_in_memory = !qbuf.is_spilled();
            qbuf.spill_chunk(backend, &keyed).map_err(|e| {
                warn!(target: LOG_TARGET, qref = %qref, error = %e, "Chunk rejected by backend");
                QBufError::BackendPutFailed(e.to_string())
            })?;
            if was_in_memory {
                // The staged bytes moved to disk with this put.
                self.gauge.release(qbuf.size_bytes);
                debug!(target: LOG_TARGET, qref = %qref, "Query buffer spilled to backend");
            }
        }

        qbuf.chunks_got += 1;
        qbuf.size_bytes += chunk_bytes;
        qbuf.total_records += n_rows;
        qbuf.touch();
        self.total_size += chunk_bytes;

        if qbuf.chunks_got == qbuf.chunks_need {
            qbuf.finish_collecting();
            info!(
                target: LOG_TARGET,
                qref = %qref,
                records = qbuf.total_records,
                size_bytes = qbuf.size_bytes,
                spilled = qbuf.is_spilled(),
                "Query buffer complete; serving fetches"
            );
        }
        Ok(())
    }

    fn on_set_ready_notifier(
        &mut self,
        qref: QBufRef,
        notifier: oneshot::Sender<QBufRef>,
    ) -> Result<(), QBufError> {
        self.ensure_ready()?;
        let qbuf = self
            .qbufs
            .get_mut(&qref)
            .ok_or_else(|| QBufError::BadRef(qref.to_string()))?;
        match qbuf.status {
            // Already serving: fire immediately, do not store.
            QBufStatus::ServingFetches => {
                let _ = notifier.send(qref);
            }
            QBufStatus::CollectingChunks => qbuf.ready_notifier = Some(notifier),
            QBufStatus::Expiring | QBufStatus::Expired => {
                return Err(QBufError::BadRef(qref.to_string()));
            }
        }
        Ok(())
    }

    fn on_fetch(
        &mut self,
        qref: QBufRef,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<FetchResult, QBufError> {
        self.ensure_ready()?;
        let qbuf = self
            .qbufs
            .get_mut(&qref)
            .ok_or_else(|| QBufError::BadRef(qref.to_string()))?;
        match qbuf.status {
            QBufStatus::CollectingChunks => Err(QBufError::NotReady),
            QBufStatus::Expiring | QBufStatus::Expired => {
                Err(QBufError::BadRef(qref.to_string()))
            }
            QBufStatus::ServingFetches => {
                let rows = qbuf.page(offset, limit).map_err(|e| {
                    error!(target: LOG_TARGET, qref = %qref, error = %e, "Backend scan failed");
                    QBufError::BackendScanFailed(e.to_string())
                })?;
                qbuf.touch();
                Ok(FetchResult {
                    column_names: qbuf.schema.column_names.clone(),
                    column_types: qbuf.schema.column_types.clone(),
                    rows,
                })
            }
        }
    }

    fn on_get_expiry(&self, qref: QBufRef) -> Result<u64, QBufError> {
        self.ensure_ready()?;
        self.qbufs
            .get(&qref)
            .map(|q| q.expire_after.as_millis() as u64)
            .ok_or_else(|| QBufError::BadRef(qref.to_string()))
    }

    fn on_set_expiry(&mut self, qref: QBufRef, expire_after_ms: u64) -> Result<(), QBufError> {
        self.ensure_ready()?;
        let qbuf = self
            .qbufs
            .get_mut(&qref)
            .ok_or_else(|| QBufError::BadRef(qref.to_string()))?;
        qbuf.expire_after = Duration::from_millis(expire_after_ms);
        Ok(())
    }

    fn on_kill_all(&mut self) -> Result<(), QBufError> {
        self.ensure_ready()?;
        let dropped = self.qbufs.len();
        self.qbufs.clear();
        self.total_size = 0;
        self.gauge.reset();

        if let Some(backend) = self.backend.take() {
            let path = backend.path().to_path_buf();
            match Arc::try_unwrap(backend) {
                Ok(store) => drop(store),
                Err(shared) => {
                    warn!(target: LOG_TARGET, "Backend handle still shared during kill_all");
                    drop(shared);
                }
            }
            if let Err(e) = BackendStore::destroy(&path) {
                warn!(target: LOG_TARGET, error = %e, "Failed to destroy backend store");
            }
        }

        info!(target: LOG_TARGET, dropped, "All query buffers killed; backend re-initializing");
        self.init = InitStatus::InProgress;
        spawn_backend_init(self.config.clone(), self.cmd_tx.clone());
        Ok(())
    }

    fn on_backend_expiry_request(
        &mut self,
        bucket: String,
        qref: QBufRef,
    ) -> Result<ExpiryAck, QBufError> {
        self.ensure_ready()?;
        if bucket != composite::BUCKET_TAG {
            return Err(QBufError::NotAQbuf);
        }
        let qbuf = self
            .qbufs
            .get_mut(&qref)
            .ok_or_else(|| QBufError::BadRef(qref.to_string()))?;
        if qbuf.status != QBufStatus::Expiring {
            return Err(QBufError::BadRef(qref.to_string()));
        }
        qbuf.status = QBufStatus::Expired;
        debug!(target: LOG_TARGET, qref = %qref, "Backend acknowledged expiry");
        Ok(ExpiryAck::Expiring)
    }

    /// One lifecycle sweep. Serialized with commands through the queue.
    fn on_tick(&mut self) {
        if !matches!(self.init, InitStatus::Ready) {
            return;
        }

        let now = Instant::now();
        let mut dropped: Vec<QBufRef> = Vec::new();
        let mut newly_expiring: Vec<QBufRef> = Vec::new();

        for (qref, qbuf) in self.qbufs.iter_mut() {
            match qbuf.status {
                QBufStatus::Expired => dropped.push(qref.clone()),
                QBufStatus::CollectingChunks
                    if now.duration_since(qbuf.last_accessed) > self.config.incomplete_release =>
                {
                    warn!(
                        target: LOG_TARGET,
                        qref = %qref,
                        chunks_got = qbuf.chunks_got,
                        chunks_need = qbuf.chunks_need,
                        "Releasing abandoned incomplete query buffer"
                    );
                    qbuf.status = QBufStatus::Expiring;
                    newly_expiring.push(qref.clone());
                }
                QBufStatus::ServingFetches
                    if now.duration_since(qbuf.last_accessed) > qbuf.expire_after =>
                {
                    debug!(target: LOG_TARGET, qref = %qref, "Query buffer idle; expiring");
                    qbuf.status = QBufStatus::Expiring;
                    newly_expiring.push(qref.clone());
                }
                // Expiring waits for the backend handshake.
                _ => {}
            }
        }

        for qref in dropped {
            if let Some(qbuf) = self.qbufs.remove(&qref) {
                self.drop_qbuf_data(&qbuf);
                info!(
                    target: LOG_TARGET,
                    qref = %qref,
                    records = qbuf.total_records,
                    "Expired query buffer dropped"
                );
            }
        }

        self.total_size = self.qbufs.values().map(|q| q.size_bytes).sum();

        if self.config.auto_expiry_handshake {
            for qref in newly_expiring {
                spawn_expiry_handshake(self.cmd_tx.clone(), qref);
            }
        }
    }

    /// Release whatever the removed qbuf was holding: gauge bytes if it
    /// lived in memory, its bucket if it had spilled.
    fn drop_qbuf_data(&mut self, qbuf: &QBuf) {
        match &qbuf.data {
            QBufData::Spilled(backend) => {
                if let Err(e) = backend.delete_bucket(qbuf.qref.as_bytes()) {
                    warn!(
                        target: LOG_TARGET,
                        qref = %qbuf.qref,
                        error = %e,
                        "Failed to drop bucket from backend"
                    );
                }
            }
            QBufData::Staging(_) | QBufData::Resident(_) => {
                self.gauge.release(qbuf.size_bytes);
            }
        }
    }
}

/// Wipe the store root and open a fresh backend off the actor task,
/// reporting back with a single `InitDone` message. Qbufs never survive
/// a restart.
pub(crate) fn spawn_backend_init(config: QBufConfig, tx: Sender<QBufMessage>) {
    tokio::spawn(async move {
        let result = match tokio::task::spawn_blocking(move || init_backend(&config)).await {
            Ok(result) => result,
            Err(e) => Err(BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            ))),
        };
        if tx.send(QBufMessage::InitDone(result)).await.is_err() {
            warn!(target: LOG_TARGET, "Manager gone before backend init completed");
        }
    });
}

fn init_backend(config: &QBufConfig) -> Result<BackendStore, BackendError> {
    if config.root_dir.exists() {
        std::fs::remove_dir_all(&config.root_dir)?;
    }
    std::fs::create_dir_all(&config.root_dir)?;
    BackendStore::open(&config.store_path(), config.write_buffer_bytes)
}

/// The embedded store has no expiry subsystem of its own, so the ticker
/// doubles as its expiry agent: each transition to `expiring` asks the
/// manager, through the ordinary command queue, to confirm the drop.
fn spawn_expiry_handshake(tx: Sender<QBufMessage>, qref: QBufRef) {
    tokio::spawn(async move {
        let (reply_tx, reply_rx) = oneshot::channel();
        let msg = QBufMessage::BackendExpiryRequest {
            bucket: composite::BUCKET_TAG.to_string(),
            qref,
            reply: reply_tx,
        };
        if tx.send(msg).await.is_ok() {
            let _ = reply_rx.await;
        }
    });
}
