//! # idlcodec-events
//!
//! Event reconstruction from transaction traces.
//!
//! ```text
//! getTransaction JSON ──► TransactionTrace ──► EventExtractor ──► CandidateEventBytes
//!                                                                        │
//!                                           EventOutcome ◄── decode_candidates (RecordCodec)
//! ```
//!
//! Every stage is pure. A malformed candidate yields one failed
//! `EventOutcome` and never aborts the rest.

pub mod extractor;
pub mod pipeline;
pub mod trace;

pub use extractor::{
    extract_candidates, CandidateEventBytes, CandidateOrigin, EventExtractor, ExtractorConfig,
    EVENT_IX_TAG,
};
pub use pipeline::{decode_candidates, events_named, EventOutcome};
pub use trace::{
    decode_payload, InnerInstructionGroup, LoggedInstruction, PayloadEncoding, TransactionTrace,
};
