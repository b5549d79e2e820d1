use std::path::PathBuf;
use thiserror::Error;

use crate::engine::schema::errors::SchemaError;

/// Errors reported across the manager boundary. Every reply is one of
/// these kinds; nothing is thrown across the actor.
#[derive(Debug, Error)]
pub enum QBufError {
    #[error("query buffer manager is still initializing")]
    NotReady,

    #[error("query buffer manager failed to initialize: {0}")]
    InitFailed(String),

    #[error("unknown query buffer ref: {0}")]
    BadRef(String),

    #[error("query buffer already has all of its chunks")]
    AlreadyFinished,

    #[error("query buffer quota exceeded")]
    QuotaExceeded,

    #[error("backend put failed: {0}")]
    BackendPutFailed(String),

    #[error("backend scan failed: {0}")]
    BackendScanFailed(String),

    #[error("bucket does not belong to the query buffer subsystem")]
    NotAQbuf,

    #[error("query cannot be served from a query buffer: {0}")]
    QueryNonPageable(#[from] SchemaError),

    #[error("query buffer manager is gone")]
    ManagerGone,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("store already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("row payload error: {0}")]
    Codec(#[from] CodecError),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("row serialization error: {0}")]
    Row(#[from] bincode::Error),
}
