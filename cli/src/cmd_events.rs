//! `idlcodec events` — reconstruct events from recorded transactions.

use anyhow::{Context, Result};
use idlcodec_borsh::BorshCodec;
use idlcodec_events::{decode_candidates, EventExtractor, ExtractorConfig, TransactionTrace};

use crate::input::read_source;

pub struct EventsArgs<'a> {
    pub source: &'a str,
    pub config: ExtractorConfig,
    pub name: Option<&'a str>,
    pub show_failures: bool,
    pub json: bool,
}

pub fn run(codec: &BorshCodec, args: EventsArgs<'_>) -> Result<()> {
    let text = read_source(args.source)?;
    let traces = TransactionTrace::from_rpc_str(&text).context("parse transactions")?;
    tracing::info!(
        transactions = traces.len(),
        authority = %args.config.authority,
        "extracting events"
    );

    let candidates = EventExtractor::new(args.config).extract(&traces);
    let outcomes = decode_candidates(&candidates, codec);

    let mut shown = 0usize;
    let mut failed = 0usize;
    for outcome in &outcomes {
        let origin = &outcome.origin;
        match &outcome.result {
            Ok(record) => {
                if args.name.is_some_and(|n| !outcome.is_event(n)) {
                    continue;
                }
                shown += 1;
                if args.json {
                    let line = serde_json::json!({
                        "signature": origin.signature,
                        "slot": origin.slot,
                        "group": origin.group,
                        "position": origin.position,
                        "event": record,
                    });
                    println!("{}", serde_json::to_string(&line)?);
                } else {
                    println!(
                        "{} slot={} ix={}/{} {}",
                        short(&origin.signature),
                        origin.slot,
                        origin.outer_instruction,
                        origin.position,
                        record.kind
                    );
                    for (name, value) in &record.fields {
                        println!("    {name}: {value}");
                    }
                }
            }
            Err(err) => {
                failed += 1;
                if args.show_failures {
                    eprintln!(
                        "  ✗ {} ix={}/{}: {err}",
                        short(&origin.signature),
                        origin.outer_instruction,
                        origin.position
                    );
                }
            }
        }
    }

    if !args.json {
        println!(
            "\n{} transactions, {} candidates, {} shown, {} undecodable",
            traces.len(),
            candidates.len(),
            shown,
            failed
        );
    }
    Ok(())
}

fn short(signature: &str) -> &str {
    signature.get(..12).unwrap_or(signature)
}
