//! `BatchEngine` orchestrates chunked, parallel batch decoding.

use crate::request::BatchRequest;
use idlcodec_core::{
    decoder::{ErrorMode, RecordCodec},
    error::{BatchError, CodecError},
    filter::RecordPredicate,
    DecodedRecord,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a batch decode job.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// `(input index, record)` in input order
    pub records: Vec<(usize, DecodedRecord)>,
    /// `(input index, error)` pairs, only populated in Collect mode
    pub errors: Vec<(usize, CodecError)>,
    /// Total raw records processed
    pub total_input: usize,
}

impl BatchResult {
    /// Decoded records in input order, without their indices.
    pub fn into_records(self) -> Vec<DecodedRecord> {
        self.records.into_iter().map(|(_, r)| r).collect()
    }

    /// Keep only the records `pred` accepts.
    pub fn retain<P: RecordPredicate + ?Sized>(&mut self, pred: &P) {
        self.records.retain(|(_, r)| pred.test(r));
    }
}

/// Batch decode engine.
pub struct BatchEngine {
    codec: Arc<dyn RecordCodec>,
}

impl BatchEngine {
    pub fn new(codec: Arc<dyn RecordCodec>) -> Self {
        Self { codec }
    }

    /// Execute a batch decode request.
    pub fn decode(&self, req: BatchRequest) -> Result<BatchResult, BatchError> {
        if req.concurrency == 0 {
            return self.run(&req);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(req.concurrency)
            .build()
            .map_err(|e| BatchError::Other(format!("thread pool: {e}")))?;
        pool.install(|| self.run(&req))
    }

    fn run(&self, req: &BatchRequest) -> Result<BatchResult, BatchError> {
        let total_input = req.records.len();
        info!(
            total = total_input,
            chunk_size = req.chunk_size,
            mode = ?req.error_mode,
            "batch decode started"
        );

        let mut out = BatchResult {
            records: Vec::with_capacity(total_input),
            errors: Vec::new(),
            total_input,
        };
        let mut offset = 0usize;

        for chunk in req.records.chunks(req.chunk_size.max(1)) {
            let result = self
                .codec
                .decode_batch(chunk, req.error_mode, None)
                .map_err(|e| match e {
                    BatchError::ItemFailed { index, source } => BatchError::ItemFailed {
                        index: offset + index,
                        source,
                    },
                    other => other,
                })?;

            out.records
                .extend(result.records.into_iter().map(|(i, r)| (offset + i, r)));
            if req.error_mode == ErrorMode::Collect {
                out.errors
                    .extend(result.errors.into_iter().map(|(i, e)| (offset + i, e)));
            }
            offset += chunk.len();
            debug!(processed = offset, decoded = out.records.len(), "chunk done");

            if let Some(cb) = &req.on_progress {
                cb(out.records.len(), total_input);
            }
        }

        info!(
            decoded = out.records.len(),
            errors = out.errors.len(),
            "batch decode complete"
        );
        Ok(out)
    }
}
