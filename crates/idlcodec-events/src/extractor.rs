//! Candidate event extraction.
//!
//! Anchor programs emit events by invoking themselves with an instruction
//! signed by a dedicated event-authority account. Each such inner
//! instruction carries `tag ++ event discriminator ++ borsh fields`; the
//! extractor strips the tag and hands the rest to the decoder.

use idlcodec_core::{Pubkey, DISCRIMINATOR_LEN};
use serde::{Deserialize, Serialize};

use crate::trace::TransactionTrace;

/// Anchor's event-CPI instruction tag, `0x1d9acb512ea545e4` little-endian.
pub const EVENT_IX_TAG: [u8; 8] = [0xe4, 0x45, 0xa5, 0x2e, 0x51, 0xcb, 0x9a, 0x1d];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Program id that marks an inner instruction as an event
    pub authority: Pubkey,
    /// Bytes stripped from the front of each matching instruction
    #[serde(default = "default_prefix_len")]
    pub prefix_len: usize,
    /// Ignore transactions whose execution failed
    #[serde(default = "bool_true")]
    pub skip_failed: bool,
    /// Only accept instructions whose prefix is `EVENT_IX_TAG`
    #[serde(default)]
    pub require_event_tag: bool,
}

fn default_prefix_len() -> usize {
    DISCRIMINATOR_LEN
}
fn bool_true() -> bool {
    true
}

impl ExtractorConfig {
    pub fn new(authority: Pubkey) -> Self {
        Self {
            authority,
            prefix_len: default_prefix_len(),
            skip_failed: true,
            require_event_tag: false,
        }
    }
}

/// Where a candidate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateOrigin {
    pub signature: String,
    pub slot: u64,
    /// Position of the group in the trace
    pub group: usize,
    /// Outer instruction that produced the group
    pub outer_instruction: u32,
    /// Position of the instruction within its group
    pub position: usize,
}

/// Event bytes with the prefix removed. Empty when the instruction was
/// shorter than the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEventBytes {
    pub origin: CandidateOrigin,
    pub data: Vec<u8>,
}

pub struct EventExtractor {
    config: ExtractorConfig,
}

impl EventExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Candidates from every trace, in trace, group and instruction order.
    pub fn extract(&self, traces: &[TransactionTrace]) -> Vec<CandidateEventBytes> {
        let mut out = Vec::new();
        for trace in traces {
            if self.config.skip_failed && !trace.succeeded {
                tracing::debug!(signature = %trace.signature, "skipping failed transaction");
                continue;
            }
            self.extract_one(trace, &mut out);
        }
        tracing::debug!(
            traces = traces.len(),
            candidates = out.len(),
            "extracted event candidates"
        );
        out
    }

    fn extract_one(&self, trace: &TransactionTrace, out: &mut Vec<CandidateEventBytes>) {
        let prefix = self.config.prefix_len;
        for (group_idx, group) in trace.groups.iter().enumerate() {
            for ix in &group.instructions {
                let pos = ix.position;
                if ix.program_id != self.config.authority {
                    continue;
                }
                let data = match ix.data.get(prefix..) {
                    Some(rest) => {
                        if self.config.require_event_tag && ix.data[..prefix] != EVENT_IX_TAG[..] {
                            tracing::trace!(
                                signature = %trace.signature,
                                group = group_idx,
                                position = pos,
                                "authority instruction without event tag"
                            );
                            continue;
                        }
                        rest.to_vec()
                    }
                    None => {
                        tracing::warn!(
                            signature = %trace.signature,
                            group = group_idx,
                            position = pos,
                            len = ix.data.len(),
                            "event instruction shorter than its prefix"
                        );
                        Vec::new()
                    }
                };
                out.push(CandidateEventBytes {
                    origin: CandidateOrigin {
                        signature: trace.signature.clone(),
                        slot: trace.slot,
                        group: group_idx,
                        outer_instruction: group.index,
                        position: pos,
                    },
                    data,
                });
            }
        }
    }
}

/// Extract with default settings: 8-byte prefix, failed transactions
/// skipped, no tag check.
pub fn extract_candidates(
    traces: &[TransactionTrace],
    authority: &Pubkey,
) -> Vec<CandidateEventBytes> {
    EventExtractor::new(ExtractorConfig::new(*authority)).extract(traces)
}
