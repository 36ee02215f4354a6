//! Per-candidate decoding.

use idlcodec_core::{filter::same_kind, CodecError, DecodedRecord, RecordCategory, RecordCodec};

use crate::extractor::{CandidateEventBytes, CandidateOrigin};

/// The decode result for one candidate. A failure here never affects the
/// other candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub origin: CandidateOrigin,
    pub result: Result<DecodedRecord, CodecError>,
}

impl EventOutcome {
    /// Event name, if the candidate decoded.
    pub fn name(&self) -> Option<&str> {
        self.record().map(|r| r.kind.as_str())
    }

    pub fn record(&self) -> Option<&DecodedRecord> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CodecError> {
        self.result.as_ref().err()
    }

    pub fn is_event(&self, name: &str) -> bool {
        self.name().is_some_and(|n| same_kind(n, name))
    }
}

/// Decode each candidate by discriminator in the event namespace.
pub fn decode_candidates(
    candidates: &[CandidateEventBytes],
    codec: &dyn RecordCodec,
) -> Vec<EventOutcome> {
    let outcomes: Vec<EventOutcome> = candidates
        .iter()
        .map(|c| {
            let result = codec.decode_any(&c.data, RecordCategory::Event);
            if let Err(err) = &result {
                tracing::debug!(
                    signature = %c.origin.signature,
                    group = c.origin.group,
                    position = c.origin.position,
                    error = %err,
                    "event candidate did not decode"
                );
            }
            EventOutcome {
                origin: c.origin.clone(),
                result,
            }
        })
        .collect();
    let decoded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    tracing::debug!(
        candidates = candidates.len(),
        decoded,
        "decoded event candidates"
    );
    outcomes
}

/// Decoded events named `name`, in order.
pub fn events_named<'a>(
    outcomes: &'a [EventOutcome],
    name: &'a str,
) -> impl Iterator<Item = &'a DecodedRecord> + 'a {
    outcomes
        .iter()
        .filter(move |o| o.is_event(name))
        .filter_map(EventOutcome::record)
}
