pub mod buffer;
pub mod handle;
pub mod manager;
pub mod memory;
pub mod message;
pub mod ticker;
pub mod types;

pub use buffer::{QBuf, QBufData, QBufStatus, Row};
pub use handle::QBufHandle;
pub use manager::{QBufConfig, QBufManager};
pub use types::{CreateMode, ExpiryAck, FetchResult, QBufRef};

#[cfg(test)]
mod buffer_test;
#[cfg(test)]
mod ticker_test;
