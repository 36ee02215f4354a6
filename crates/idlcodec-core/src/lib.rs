//! # idlcodec-core
//!
//! Core traits, types, and primitives shared across all IDLCodec crates.
//! The registry, the binary codec, the event extractor and the batch engine
//! are all built on top of the interfaces defined here.

pub mod decoder;
pub mod discriminator;
pub mod error;
pub mod filter;
pub mod layout;
pub mod pubkey;
pub mod record;
pub mod schema;
pub mod types;

pub use decoder::{decode_sequential, BatchDecodeResult, ErrorMode, ProgressCallback, RecordCodec};
pub use discriminator::{Discriminator, Matcher, MemcmpFilter, DISCRIMINATOR_LEN};
pub use error::{BatchError, CodecError, RegistryError};
pub use filter::{is_open_position, OpenPosition, PredicateExt, RecordPredicate};
pub use pubkey::Pubkey;
pub use record::{DecodedRecord, RawRecord};
pub use schema::{FieldDef, RecordCategory, Schema, SchemaRegistry, TypeDef, VariantDef, VariantFields};
pub use types::{IdlType, Value};
