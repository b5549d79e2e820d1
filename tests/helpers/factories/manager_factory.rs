use std::time::Duration;

use tempfile::TempDir;

use crate::engine::errors::QBufError;
use crate::engine::qbuf::{QBufConfig, QBufHandle};

/// Spawns managers over isolated temp roots with test-friendly
/// defaults: fast ticks, no automatic expiry handshake, lifetimes long
/// enough not to interfere. TempDir is kept alive for the factory's
/// lifetime.
pub struct QBufManagerFactory {
    config: QBufConfig,
    _tempdir: TempDir,
}

impl QBufManagerFactory {
    pub fn new() -> Self {
        let tempdir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = QBufConfig {
            root_dir: tempdir.path().join("qbuf"),
            soft_watermark: 64 * 1024 * 1024,
            hard_watermark: 80 * 1024 * 1024,
            inmem_max: 8 * 1024 * 1024,
            max_query_data_size: 32 * 1024 * 1024,
            default_expire: Duration::from_secs(60),
            incomplete_release: Duration::from_secs(120),
            tick_interval: Duration::from_millis(20),
            auto_expiry_handshake: false,
            write_buffer_bytes: 1 << 20,
        };
        Self {
            config,
            _tempdir: tempdir,
        }
    }

    pub fn with_soft_watermark(mut self, bytes: u64) -> Self {
        self.config.soft_watermark = bytes;
        self
    }

    pub fn with_hard_watermark(mut self, bytes: u64) -> Self {
        self.config.hard_watermark = bytes;
        self
    }

    pub fn with_inmem_max(mut self, bytes: u64) -> Self {
        self.config.inmem_max = bytes;
        self
    }

    pub fn with_max_query_data_size(mut self, bytes: u64) -> Self {
        self.config.max_query_data_size = bytes;
        self
    }

    pub fn with_default_expire_ms(mut self, ms: u64) -> Self {
        self.config.default_expire = Duration::from_millis(ms);
        self
    }

    pub fn with_incomplete_release_ms(mut self, ms: u64) -> Self {
        self.config.incomplete_release = Duration::from_millis(ms);
        self
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval = Duration::from_millis(ms);
        self
    }

    pub fn with_auto_expiry_handshake(mut self, enabled: bool) -> Self {
        self.config.auto_expiry_handshake = enabled;
        self
    }

    pub fn config(&self) -> &QBufConfig {
        &self.config
    }

    pub fn spawn(&self) -> QBufHandle {
        QBufHandle::spawn(self.config.clone())
    }

    /// Spawn and block until backend init completed.
    pub async fn spawn_ready(&self) -> QBufHandle {
        let handle = self.spawn();
        Self::wait_ready(&handle).await;
        handle
    }

    /// Poll until the manager leaves `NotReady` (init is asynchronous).
    pub async fn wait_ready(handle: &QBufHandle) {
        for _ in 0..500 {
            match handle.get_max_query_data_size().await {
                Err(QBufError::NotReady) => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                _ => return,
            }
        }
        panic!("manager did not become ready in time");
    }
}
