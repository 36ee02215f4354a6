//! # idlcodec-registry
//!
//! Schema Registry for IDLCodec.
//!
//! An Anchor IDL (legacy or current JSON format) is parsed once into an
//! immutable `MemoryRegistry`, validated as a whole, and then shared by
//! reference with every decoder. There is no runtime mutation.
//!
//! The public-facing API is the `SchemaRegistry` trait from `idlcodec-core`.

pub mod config;
pub mod idl;
pub mod memory;
pub mod perpetuals;

pub use config::RegistryConfig;
pub use idl::{IdlParser, ParsedIdl, ProgramInfo};
pub use memory::{MemoryRegistry, RegistryBuilder};
