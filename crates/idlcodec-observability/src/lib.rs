//! # idlcodec-observability
//!
//! Structured logging for IDLCodec binaries.
//!
//! Library crates only emit `tracing` events; a binary calls
//! [`init_tracing`] once to install a subscriber. Levels come from
//! [`LogConfig`] (usually a `logging:` section of the CLI's YAML config) or
//! from `RUST_LOG`. JSON output is compatible with ELK, Loki and
//! CloudWatch.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
