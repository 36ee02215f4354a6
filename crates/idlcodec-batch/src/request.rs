//! Batch decode request configuration.

use idlcodec_core::{decoder::ErrorMode, RawRecord};

/// Configuration for a batch decode job.
pub struct BatchRequest {
    /// The raw records to decode
    pub records: Vec<RawRecord>,
    /// Number of Rayon workers (0 = the global pool)
    pub concurrency: usize,
    /// Max records per chunk (memory safety)
    pub chunk_size: usize,
    /// How to handle decode errors
    pub error_mode: ErrorMode,
    /// Called after each chunk with (decoded so far, total)
    pub on_progress: Option<Box<dyn Fn(usize, usize) + Send + Sync>>,
}

impl BatchRequest {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            concurrency: 0,
            chunk_size: 10_000,
            error_mode: ErrorMode::Skip,
            on_progress: None,
        }
    }

    /// Account snapshots whose kind is resolved by discriminator.
    pub fn accounts<I, D>(data: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Vec<u8>>,
    {
        Self::new(data.into_iter().map(RawRecord::account).collect())
    }

    /// Clamped to at least one record per chunk.
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn on_progress<F: Fn(usize, usize) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }
}
