//! The core `RecordCodec` trait and associated progress/batch types.
//!
//! The binary codec implements `RecordCodec`. The trait is object-safe so a
//! codec can be stored as `Arc<dyn RecordCodec>` in the batch engine and the
//! event pipeline.

use crate::error::{BatchError, CodecError};
use crate::record::{DecodedRecord, RawRecord};
use crate::schema::RecordCategory;

/// Callback invoked by the batch engine during long-running decodes.
/// `decoded` is the number of records successfully decoded so far;
/// `total` is the total count in the current batch.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, decoded: usize, total: usize);
}

/// Blanket impl so closures can be used as progress callbacks.
impl<F: Fn(usize, usize) + Send + Sync> ProgressCallback for F {
    fn on_progress(&self, decoded: usize, total: usize) {
        self(decoded, total)
    }
}

/// Controls how batch decoding reacts to individual decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Silently skip records that fail to decode. Suitable for best-effort analytics.
    #[default]
    Skip,
    /// Collect decode errors alongside successes and return both at the end.
    Collect,
    /// Abort the entire batch on first error.
    Throw,
}

/// The output of a batch decode: successful records plus any collected errors.
#[derive(Debug, Default)]
pub struct BatchDecodeResult {
    /// `(input index, record)` in input order
    pub records: Vec<(usize, DecodedRecord)>,
    /// Populated only when `ErrorMode::Collect` is used.
    pub errors: Vec<(usize, CodecError)>,
}

/// A schema-driven binary codec.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so they can be shared across
/// Rayon threads without additional locking.
pub trait RecordCodec: Send + Sync {
    /// Decode `data` as `kind`, checking its discriminator first.
    fn decode(&self, data: &[u8], kind: &str) -> Result<DecodedRecord, CodecError>;

    /// Decode `data`, resolving the kind from its discriminator.
    fn decode_any(
        &self,
        data: &[u8],
        category: RecordCategory,
    ) -> Result<DecodedRecord, CodecError>;

    /// Encode a record: discriminator, then fields in schema order.
    fn encode(&self, record: &DecodedRecord) -> Result<Vec<u8>, CodecError>;

    /// Decode one raw record, honouring its kind hint if present.
    fn decode_raw(&self, raw: &RawRecord) -> Result<DecodedRecord, CodecError> {
        match &raw.kind {
            Some(kind) => self.decode(&raw.data, kind),
            None => self.decode_any(&raw.data, raw.category),
        }
    }

    /// Decode a batch of raw records.
    ///
    /// Each failure concerns exactly one record; `mode` decides whether it
    /// is dropped, collected, or aborts the batch.
    fn decode_batch(
        &self,
        raws: &[RawRecord],
        mode: ErrorMode,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<BatchDecodeResult, BatchError> {
        decode_sequential(self, raws, mode, progress)
    }
}

/// One record at a time, in input order, reporting progress after each.
///
/// This is the provided `decode_batch`; codecs that override it with a
/// parallel path can still fall back here.
pub fn decode_sequential<C: RecordCodec + ?Sized>(
    codec: &C,
    raws: &[RawRecord],
    mode: ErrorMode,
    progress: Option<&dyn ProgressCallback>,
) -> Result<BatchDecodeResult, BatchError> {
    let mut result = BatchDecodeResult {
        records: Vec::with_capacity(raws.len()),
        errors: Vec::new(),
    };

    for (idx, raw) in raws.iter().enumerate() {
        match codec.decode_raw(raw) {
            Ok(record) => result.records.push((idx, record)),
            Err(err) => match mode {
                ErrorMode::Skip => {
                    tracing::trace!(index = idx, error = %err, "skipping record");
                }
                ErrorMode::Collect => result.errors.push((idx, err)),
                ErrorMode::Throw => {
                    return Err(BatchError::ItemFailed {
                        index: idx,
                        source: err,
                    });
                }
            },
        }

        if let Some(cb) = progress {
            cb.on_progress(result.records.len(), raws.len());
        }
    }

    Ok(result)
}
