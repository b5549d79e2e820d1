use std::fmt;

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::engine::types::{LogicalType, ScalarValue};

/// Opaque identifier of one query buffer. Unique within a process
/// lifetime; doubles as the bucket portion of composite storage keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QBufRef(String);

impl QBufRef {
    pub(crate) fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for QBufRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `get_or_create` matched an existing buffer or allocated a new
/// one. Structural query de-duplication is not implemented, so today
/// every call allocates and `Existing` is never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    New,
    Existing,
}

/// Reply of the backend expiry handshake. `Expiring` tells the backend
/// to go ahead and drop the bucket's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAck {
    Expiring,
}

/// One page of a completed query buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub column_names: Vec<String>,
    pub column_types: Vec<LogicalType>,
    pub rows: Vec<Vec<ScalarValue>>,
}
