use tracing::debug;

const LOG_TARGET: &str = "engine::qbuf::memory";

/// Tracks the bytes query buffers hold in process memory (staging lists
/// and completed resident buffers) and answers the spill decision
/// against the configured budget. The estimate is advisory: once a
/// qbuf spills it never comes back to memory.
#[derive(Debug)]
pub struct StagingGauge {
    inmem_bytes: u64,
    inmem_max: u64,
}

impl StagingGauge {
    pub fn new(inmem_max: u64) -> Self {
        Self {
            inmem_bytes: 0,
            inmem_max,
        }
    }

    /// Is there headroom for `incoming` more bytes in memory?
    pub fn can_afford(&self, incoming: u64) -> bool {
        let fits = self.inmem_bytes.saturating_add(incoming) <= self.inmem_max;
        if !fits {
            debug!(
                target: LOG_TARGET,
                in_memory = self.inmem_bytes,
                incoming,
                budget = self.inmem_max,
                "Memory budget exhausted; chunk goes to the backend"
            );
        }
        fits
    }

    pub fn grow(&mut self, bytes: u64) {
        self.inmem_bytes = self.inmem_bytes.saturating_add(bytes);
    }

    pub fn release(&mut self, bytes: u64) {
        self.inmem_bytes = self.inmem_bytes.saturating_sub(bytes);
    }

    pub fn reset(&mut self) {
        self.inmem_bytes = 0;
    }

    pub fn in_memory_bytes(&self) -> u64 {
        self.inmem_bytes
    }
}
