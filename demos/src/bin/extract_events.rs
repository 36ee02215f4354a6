//! # extract_events
//!
//! Reconstructs Perpetuals events from recorded `getTransaction` results
//! and keeps the `ClosePositionRequestEvent`s, with structured logging set
//! up through `idlcodec-observability`.
//!
//! Run with:
//! ```sh
//! cargo run --bin extract_events
//!
//! # With JSON logging:
//! LOG_JSON=1 cargo run --bin extract_events
//!
//! # With debug level for the events crate:
//! RUST_LOG=info,idlcodec_events=debug cargo run --bin extract_events
//! ```

use anyhow::{Context, Result};
use idlcodec_borsh::BorshCodec;
use idlcodec_events::{
    decode_candidates, events_named, EventExtractor, ExtractorConfig, TransactionTrace,
};
use idlcodec_observability::{init_tracing, LogConfig};
use idlcodec_registry::perpetuals;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

fn main() -> Result<()> {
    let mut logging = LogConfig::with_level("info");
    logging.json = std::env::var("LOG_JSON").is_ok();
    init_tracing(&logging);

    // ── 1. Registry and codec ─────────────────────────────────────────────────
    let codec = BorshCodec::new(Arc::new(perpetuals::registry()?));

    // ── 2. Recorded transactions ──────────────────────────────────────────────
    let path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../fixtures/rpc/perps_transactions.json")
    });
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read '{}'", path.display()))?;
    let traces = TransactionTrace::from_rpc_str(&text)?;
    info!(transactions = traces.len(), path = %path.display(), "loaded transactions");

    // ── 3. Extract and decode ─────────────────────────────────────────────────
    let authority = idlcodec_core::Pubkey::from_str(perpetuals::EVENT_AUTHORITY)?;
    let extractor = EventExtractor::new(ExtractorConfig::new(authority));
    let candidates = extractor.extract(&traces);
    let outcomes = decode_candidates(&candidates, &codec);

    for outcome in &outcomes {
        match &outcome.result {
            Ok(record) => info!(
                event = %record.kind,
                slot = outcome.origin.slot,
                position = outcome.origin.position,
                "decoded event"
            ),
            Err(err) => warn!(
                slot = outcome.origin.slot,
                position = outcome.origin.position,
                error = %err,
                "candidate did not decode"
            ),
        }
    }

    // ── 4. Close requests ─────────────────────────────────────────────────────
    println!("\n─── ClosePositionRequestEvent ──────────────────────────");
    for event in events_named(&outcomes, "ClosePositionRequestEvent") {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    Ok(())
}
