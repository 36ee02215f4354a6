//! # idlcodec-batch
//!
//! High-throughput batch decoding for account snapshots and event
//! candidates.
//!
//! ## Features
//! - Memory-bounded chunking (default 10,000 records per chunk)
//! - CPU-parallel decoding via Rayon, optionally on a dedicated pool
//! - Progress callbacks (for progress bars / ETAs)
//! - Three error modes: Skip, Collect, Throw
//! - Input order is kept; each result carries its input index
//!
//! ## Usage
//! ```no_run
//! use std::sync::Arc;
//! use idlcodec_batch::{BatchEngine, BatchRequest};
//! use idlcodec_borsh::BorshCodec;
//! use idlcodec_core::OpenPosition;
//! use idlcodec_registry::perpetuals;
//!
//! let codec = BorshCodec::new(Arc::new(perpetuals::registry().unwrap()));
//! let engine = BatchEngine::new(Arc::new(codec));
//! let accounts: Vec<Vec<u8>> = Vec::new();
//! let mut result = engine.decode(BatchRequest::accounts(accounts)).unwrap();
//! result.retain(&OpenPosition::default());
//! ```

pub mod engine;
pub mod request;

pub use engine::{BatchEngine, BatchResult};
pub use request::BatchRequest;
