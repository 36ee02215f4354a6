//! # idlcodec-borsh
//!
//! Borsh decoder and encoder for Anchor accounts and events.
//!
//! ## Wire format
//! - An optional opaque header, then the discriminator (8 bytes by default)
//! - Fields in declaration order, no padding
//! - Little-endian integers; `bool` is one byte, 0 or 1
//! - `Vec`, `String` and `bytes` carry a u32 length prefix
//! - `Option` is a 0/1 tag byte then the payload; enums are a u8 variant tag
//!   then the variant's fields
//! - Trailing bytes after the last field are ignored, so accounts that grew
//!   new fields still decode under an older IDL

mod decoder;
mod encoder;
mod reader;

use std::sync::Arc;

use idlcodec_core::{
    decoder::{decode_sequential, BatchDecodeResult, ErrorMode, ProgressCallback, RecordCodec},
    error::BatchError,
    CodecError, DecodedRecord, IdlType, RawRecord, RecordCategory, SchemaRegistry, Value,
};
use rayon::prelude::*;

use crate::reader::Reader;

/// The registry-driven Borsh codec.
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct BorshCodec {
    registry: Arc<dyn SchemaRegistry>,
}

impl BorshCodec {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &dyn SchemaRegistry {
        self.registry.as_ref()
    }

    /// Encode a single value as `ty`, e.g. to build a memcmp filter on a
    /// field that is not a public key.
    pub fn encode_value(&self, ty: &IdlType, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        encoder::encode_value(ty, value, self.registry(), &mut out, 0)?;
        Ok(out)
    }

    /// Decode a single value of type `ty` from the start of `data`.
    pub fn decode_value(&self, ty: &IdlType, data: &[u8]) -> Result<Value, CodecError> {
        let mut reader = Reader::new(data, 0);
        decoder::decode_value(ty, &mut reader, self.registry(), 0)
    }

    /// Error for data whose prefix names no kind in `category`.
    fn unidentified(&self, data: &[u8], category: RecordCategory) -> CodecError {
        let shortest = self
            .registry
            .schemas()
            .into_iter()
            .filter(|s| s.category == category)
            .map(|s| s.body_offset())
            .min();
        match shortest {
            Some(needed) if data.len() < needed => CodecError::Truncated {
                field: decoder::DISCRIMINATOR_FIELD.to_string(),
                offset: 0,
                needed,
                available: data.len(),
            },
            _ => {
                let shown = &data[..data.len().min(idlcodec_core::DISCRIMINATOR_LEN)];
                CodecError::UnknownRecordKind {
                    kind: format!("{category} 0x{}", hex::encode(shown)),
                }
            }
        }
    }
}

impl std::fmt::Debug for BorshCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BorshCodec")
            .field("kinds", &self.registry.schemas().len())
            .finish()
    }
}

impl RecordCodec for BorshCodec {
    fn decode(&self, data: &[u8], kind: &str) -> Result<DecodedRecord, CodecError> {
        let schema = self.registry.lookup(kind)?;
        decoder::decode_record(self.registry(), schema, data)
    }

    fn decode_any(
        &self,
        data: &[u8],
        category: RecordCategory,
    ) -> Result<DecodedRecord, CodecError> {
        match self.registry.schema_by_discriminator(category, data) {
            Some(schema) => decoder::decode_record(self.registry(), schema, data),
            None => Err(self.unidentified(data, category)),
        }
    }

    fn encode(&self, record: &DecodedRecord) -> Result<Vec<u8>, CodecError> {
        let schema = self.registry.lookup(&record.kind)?;
        if schema.category != record.category {
            return Err(CodecError::TypeMismatch {
                field: record.kind.clone(),
                expected: schema.category.to_string(),
                got: record.category.to_string(),
            });
        }
        let bytes = encoder::encode_record(self.registry(), schema, record)?;
        tracing::trace!(kind = %schema.name, len = bytes.len(), "encoded record");
        Ok(bytes)
    }

    /// Parallel decode with Rayon; falls back to the sequential default
    /// when a progress callback is supplied.
    fn decode_batch(
        &self,
        raws: &[RawRecord],
        mode: ErrorMode,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<BatchDecodeResult, BatchError> {
        if progress.is_some() {
            return decode_sequential(self, raws, mode, progress);
        }

        let results: Vec<(usize, Result<DecodedRecord, CodecError>)> = raws
            .par_iter()
            .enumerate()
            .map(|(idx, raw)| (idx, self.decode_raw(raw)))
            .collect();

        let mut out = BatchDecodeResult {
            records: Vec::with_capacity(raws.len()),
            errors: Vec::new(),
        };
        for (idx, result) in results {
            match result {
                Ok(record) => out.records.push((idx, record)),
                Err(err) => match mode {
                    ErrorMode::Skip => {
                        tracing::trace!(index = idx, error = %err, "skipping record");
                    }
                    ErrorMode::Collect => out.errors.push((idx, err)),
                    ErrorMode::Throw => {
                        return Err(BatchError::ItemFailed {
                            index: idx,
                            source: err,
                        });
                    }
                },
            }
        }
        tracing::debug!(
            total = raws.len(),
            decoded = out.records.len(),
            "batch decoded"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlcodec_core::{Discriminator, FieldDef, Pubkey, Schema, TypeDef, VariantDef, VariantFields};
    use idlcodec_registry::MemoryRegistry;

    fn side() -> TypeDef {
        TypeDef::Enum {
            variants: ["None", "Long", "Short"]
                .iter()
                .map(|n| VariantDef {
                    name: n.to_string(),
                    fields: VariantFields::Unit,
                })
                .collect(),
        }
    }

    fn codec() -> BorshCodec {
        let position = Schema {
            name: "Position".into(),
            category: RecordCategory::Account,
            discriminator: Discriminator::anchor(RecordCategory::Account, "Position", 8),
            discriminator_offset: 0,
            fields: vec![
                FieldDef::new("owner", IdlType::Pubkey),
                FieldDef::new("side", IdlType::defined("Side")),
                FieldDef::new("sizeUsd", IdlType::Uint(64)),
                FieldDef::new("tags", IdlType::vec(IdlType::Str)),
                FieldDef::new("limit", IdlType::option(IdlType::Int(32))),
            ],
        };
        let registry = MemoryRegistry::builder()
            .type_def("Side", side())
            .schema(position)
            .build()
            .unwrap();
        BorshCodec::new(Arc::new(registry))
    }

    fn sample() -> DecodedRecord {
        DecodedRecord::new("Position", RecordCategory::Account)
            .with("owner", Pubkey::new([3; 32]))
            .with("side", Value::unit_variant("Short"))
            .with("sizeUsd", 42u64)
            .with("tags", Value::Array(vec!["a".into(), "bc".into()]))
            .with("limit", -5i32)
    }

    #[test]
    fn encode_layout_is_borsh() {
        let bytes = codec().encode(&sample()).unwrap();
        let disc = Discriminator::anchor(RecordCategory::Account, "Position", 8);
        assert_eq!(&bytes[..8], disc.as_bytes());
        assert_eq!(&bytes[8..40], &[3u8; 32]);
        assert_eq!(bytes[40], 2); // Short
        assert_eq!(&bytes[41..49], &42u64.to_le_bytes());
        assert_eq!(&bytes[49..53], &2u32.to_le_bytes());
        assert_eq!(&bytes[53..58], &[1, 0, 0, 0, b'a']);
        assert_eq!(bytes[64], 1);
        assert_eq!(&bytes[65..69], &(-5i32).to_le_bytes());
        assert_eq!(bytes.len(), 69);
    }

    #[test]
    fn decode_inverts_encode() {
        let c = codec();
        let bytes = c.encode(&sample()).unwrap();
        assert_eq!(c.decode(&bytes, "position").unwrap(), sample());
        assert_eq!(c.decode_any(&bytes, RecordCategory::Account).unwrap(), sample());
    }

    #[test]
    fn errors_carry_paths() {
        let c = codec();
        let mut bytes = c.encode(&sample()).unwrap();
        bytes[40] = 7;
        match c.decode(&bytes, "Position").unwrap_err() {
            CodecError::FieldDecode { field, .. } => assert_eq!(field, "side"),
            other => panic!("unexpected {other:?}"),
        }

        let bytes = c.encode(&sample()).unwrap();
        match c.decode(&bytes[..61], "Position").unwrap_err() {
            CodecError::Truncated { field, .. } => assert_eq!(field, "tags[1]"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn encode_rejects_bad_values() {
        let c = codec();
        let rec = sample().with("sizeUsd", Value::Uint(u128::from(u64::MAX) + 1));
        assert!(matches!(
            c.encode(&rec),
            Err(CodecError::EncodeOverflow { field, .. }) if field == "sizeUsd"
        ));

        let rec = sample().with("side", Value::unit_variant("Sideways"));
        assert!(matches!(c.encode(&rec), Err(CodecError::TypeMismatch { .. })));

        let mut rec = sample();
        rec.fields.shift_remove("owner");
        assert!(matches!(
            c.encode(&rec),
            Err(CodecError::MissingField { field }) if field == "owner"
        ));

        let rec = sample().with("tags", Value::Array(vec![Value::Uint(1)]));
        assert!(matches!(
            c.encode(&rec),
            Err(CodecError::TypeMismatch { field, .. }) if field == "tags[0]"
        ));
    }

    #[test]
    fn decode_any_reports_unknown_prefix() {
        let c = codec();
        assert!(matches!(
            c.decode_any(&[0u8; 80], RecordCategory::Account),
            Err(CodecError::UnknownRecordKind { .. })
        ));
        assert!(matches!(
            c.decode_any(&[0u8; 3], RecordCategory::Account),
            Err(CodecError::Truncated { .. })
        ));
        assert!(matches!(
            c.decode_any(&[0u8; 80], RecordCategory::Event),
            Err(CodecError::UnknownRecordKind { .. })
        ));
    }

    #[test]
    fn single_values() {
        let c = codec();
        let bytes = c.encode_value(&IdlType::Uint(16), &Value::Uint(0x0102)).unwrap();
        assert_eq!(bytes, vec![0x02, 0x01]);
        assert_eq!(
            c.decode_value(&IdlType::defined("Side"), &[1]).unwrap(),
            Value::unit_variant("Long")
        );
    }

    #[test]
    fn parallel_and_sequential_batches_agree() {
        let c = codec();
        let good = c.encode(&sample()).unwrap();
        let raws = vec![
            RawRecord::account(good.clone()),
            RawRecord::account(vec![1, 2, 3]),
            RawRecord::account(good).with_kind("position"),
        ];
        let par = c.decode_batch(&raws, ErrorMode::Collect, None).unwrap();
        let seq = c
            .decode_batch(&raws, ErrorMode::Collect, Some(&|_: usize, _: usize| {}))
            .unwrap();
        assert_eq!(par.records, seq.records);
        assert_eq!(par.errors, seq.errors);
        assert_eq!(par.errors[0].0, 1);
    }
}
