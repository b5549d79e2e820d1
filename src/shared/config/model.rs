use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub qbuf: QBufSection,
    pub backend: BackendSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct QBufSection {
    pub root_dir: String,
    /// Aggregate size above which new qbuf creation is refused.
    pub soft_watermark: u64,
    /// Aggregate size above which any new chunk is refused.
    pub hard_watermark: u64,
    /// Staged bytes across unspilled qbufs before chunks go to disk.
    pub inmem_max: u64,
    pub max_query_data_size: u64,
    pub default_expire_ms: u64,
    pub incomplete_release_ms: u64,
    pub tick_interval_ms: u64,
    pub auto_expiry_handshake: bool,
}

#[derive(Debug, Deserialize)]
pub struct BackendSection {
    pub write_buffer_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

use std::env;

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("QBUF_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .set_default("qbuf.root_dir", "data/qbuf")?
        .set_default("qbuf.soft_watermark", 1_073_741_824_i64)?
        .set_default("qbuf.hard_watermark", 1_342_177_280_i64)?
        .set_default("qbuf.inmem_max", 67_108_864_i64)?
        .set_default("qbuf.max_query_data_size", 268_435_456_i64)?
        .set_default("qbuf.default_expire_ms", 60_000_i64)?
        .set_default("qbuf.incomplete_release_ms", 120_000_i64)?
        .set_default("qbuf.tick_interval_ms", 1_000_i64)?
        .set_default("qbuf.auto_expiry_handshake", true)?
        .set_default("backend.write_buffer_bytes", 10_485_760_i64)?
        .set_default("logging.log_dir", "logs")?
        .set_default("logging.stdout_level", "info")?
        .set_default("logging.file_level", "debug")?
        .add_source(config::File::with_name(&config_path).required(false))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
