use tokio::sync::oneshot;

use crate::engine::backend::BackendStore;
use crate::engine::errors::{BackendError, QBufError};
use crate::engine::qbuf::buffer::Row;
use crate::engine::qbuf::types::{CreateMode, ExpiryAck, FetchResult, QBufRef};
use crate::engine::schema::QuerySpec;

type Reply<T> = oneshot::Sender<Result<T, QBufError>>;

/// Commands the manager actor processes one at a time. Public
/// operations carry a one-shot reply channel; `InitDone` and `Tick` are
/// internal.
pub enum QBufMessage {
    GetOrCreate {
        spec: QuerySpec,
        reply: Reply<(CreateMode, QBufRef)>,
    },
    Delete {
        qref: QBufRef,
        reply: Reply<()>,
    },
    BatchPut {
        qref: QBufRef,
        rows: Vec<Row>,
        reply: Reply<()>,
    },
    SetReadyNotifier {
        qref: QBufRef,
        notifier: oneshot::Sender<QBufRef>,
        reply: Reply<()>,
    },
    Fetch {
        qref: QBufRef,
        limit: Option<usize>,
        offset: usize,
        reply: Reply<FetchResult>,
    },
    GetExpiry {
        qref: QBufRef,
        reply: Reply<u64>,
    },
    SetExpiry {
        qref: QBufRef,
        expire_after_ms: u64,
        reply: Reply<()>,
    },
    GetMaxQueryDataSize {
        reply: Reply<u64>,
    },
    SetMaxQueryDataSize {
        bytes: u64,
        reply: Reply<()>,
    },
    KillAll {
        reply: Reply<()>,
    },
    BackendExpiryRequest {
        bucket: String,
        qref: QBufRef,
        reply: Reply<ExpiryAck>,
    },
    InitDone(Result<BackendStore, BackendError>),
    Tick,
}
