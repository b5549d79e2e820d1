use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::info;

use crate::engine::errors::QBufError;
use crate::engine::qbuf::buffer::Row;
use crate::engine::qbuf::manager::{spawn_backend_init, QBufConfig, QBufManager};
use crate::engine::qbuf::message::QBufMessage;
use crate::engine::qbuf::ticker::start_lifecycle_ticker;
use crate::engine::qbuf::types::{CreateMode, ExpiryAck, FetchResult, QBufRef};
use crate::engine::schema::QuerySpec;

const LOG_TARGET: &str = "engine::qbuf::handle";

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Cloneable async front door to the manager actor. Every call enqueues
/// one command and awaits its one-shot reply.
#[derive(Debug, Clone)]
pub struct QBufHandle {
    pub(crate) tx: mpsc::Sender<QBufMessage>,
}

impl QBufHandle {
    /// Start the manager actor, its backend init task, and the
    /// lifecycle ticker.
    pub fn spawn(config: QBufConfig) -> Self {
        info!(target: LOG_TARGET, root = %config.root_dir.display(), "Spawning query buffer manager");
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

        spawn_backend_init(config.clone(), tx.clone());
        start_lifecycle_ticker(tx.clone(), config.tick_interval);

        let manager = QBufManager::new(config, tx.clone());
        tokio::spawn(manager.run(rx));

        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, QBufError>>) -> QBufMessage,
    ) -> Result<T, QBufError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| QBufError::ManagerGone)?;
        reply_rx.await.map_err(|_| QBufError::ManagerGone)?
    }

    pub async fn get_or_create(
        &self,
        spec: QuerySpec,
    ) -> Result<(CreateMode, QBufRef), QBufError> {
        self.request(|reply| QBufMessage::GetOrCreate { spec, reply })
            .await
    }

    pub async fn delete(&self, qref: QBufRef) -> Result<(), QBufError> {
        self.request(|reply| QBufMessage::Delete { qref, reply })
            .await
    }

    pub async fn batch_put(&self, qref: QBufRef, rows: Vec<Row>) -> Result<(), QBufError> {
        self.request(|reply| QBufMessage::BatchPut { qref, rows, reply })
            .await
    }

    /// Register the one-shot ready notifier. The returned receiver
    /// resolves when the buffer starts serving; immediately if it
    /// already is.
    pub async fn set_ready_notifier(
        &self,
        qref: QBufRef,
    ) -> Result<oneshot::Receiver<QBufRef>, QBufError> {
        let (notifier, ready_rx) = oneshot::channel();
        self.request(|reply| QBufMessage::SetReadyNotifier {
            qref,
            notifier,
            reply,
        })
        .await?;
        Ok(ready_rx)
    }

    pub async fn fetch(
        &self,
        qref: QBufRef,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<FetchResult, QBufError> {
        self.request(|reply| QBufMessage::Fetch {
            qref,
            limit,
            offset,
            reply,
        })
        .await
    }

    pub async fn get_expiry(&self, qref: QBufRef) -> Result<u64, QBufError> {
        self.request(|reply| QBufMessage::GetExpiry { qref, reply })
            .await
    }

    pub async fn set_expiry(&self, qref: QBufRef, expire_after_ms: u64) -> Result<(), QBufError> {
        self.request(|reply| QBufMessage::SetExpiry {
            qref,
            expire_after_ms,
            reply,
        })
        .await
    }

    pub async fn get_max_query_data_size(&self) -> Result<u64, QBufError> {
        self.request(|reply| QBufMessage::GetMaxQueryDataSize { reply })
            .await
    }

    pub async fn set_max_query_data_size(&self, bytes: u64) -> Result<(), QBufError> {
        self.request(|reply| QBufMessage::SetMaxQueryDataSize { bytes, reply })
            .await
    }

    /// Best-effort teardown of every qbuf and the backing store.
    pub async fn kill_all(&self) -> Result<(), QBufError> {
        self.request(|reply| QBufMessage::KillAll { reply }).await
    }

    /// Endpoint the KV backend calls to confirm a qbuf may be dropped.
    pub async fn backend_expiry_request(
        &self,
        bucket: &str,
        qref: QBufRef,
    ) -> Result<ExpiryAck, QBufError> {
        let bucket = bucket.to_string();
        self.request(|reply| QBufMessage::BackendExpiryRequest {
            bucket,
            qref,
            reply,
        })
        .await
    }
}
