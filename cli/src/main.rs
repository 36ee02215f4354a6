//! IDLCodec CLI — decode Anchor accounts and events from the command line.
//!
//! # Commands
//! ```text
//! idlcodec inspect        [--kind <Name>]
//! idlcodec memcmp         --kind <Name> [--field <name> --pubkey <key>]
//! idlcodec decode         --data <text> [--encoding hex|base64|base58] [--kind <Name>] [--event]
//! idlcodec encode         --record <file.json|-> [--encoding ...]
//! idlcodec events         --traces <file.json|-> [--authority <key>] [--name <Event>]
//! idlcodec open-positions --accounts <file.json|-> [--owner <key>]
//! idlcodec info
//! ```
//!
//! Every command works offline on bytes or JSON captured elsewhere. The
//! registry comes from `--idl`, the `idl:` key of `--config`, or the
//! bundled Perpetuals IDL.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idlcodec_borsh::BorshCodec;
use idlcodec_core::{Pubkey, RecordCategory};
use idlcodec_events::ExtractorConfig;
use idlcodec_observability::init_tracing;
use idlcodec_registry::perpetuals;

mod cmd_accounts;
mod cmd_decode;
mod cmd_events;
mod cmd_inspect;
mod config;
mod input;

use config::CliConfig;
use input::DataEncoding;

#[derive(Parser)]
#[command(
    name = "idlcodec",
    about = "Anchor IDL-driven decoder for Solana accounts and events",
    long_about = "
IDLCodec CLI: decode Anchor program accounts and self-CPI events using the
program's IDL. Ships with the Jupiter Perpetuals IDL.

ENVIRONMENT VARIABLES:
  RUST_LOG    Log filter, overrides the config's logging section
",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// IDL JSON file (default: bundled Perpetuals IDL)
    #[arg(long, global = true)]
    idl: Option<PathBuf>,

    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the kinds of the loaded IDL, or one kind's byte layout
    Inspect {
        #[arg(long)]
        kind: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print getProgramAccounts memcmp filters for an account kind
    Memcmp {
        #[arg(long)]
        kind: String,
        /// Fixed-offset field to compare, e.g. owner
        #[arg(long, requires = "pubkey")]
        field: Option<String>,
        /// Base-58 public key the field must equal
        #[arg(long, requires = "field")]
        pubkey: Option<String>,
    },

    /// Decode one account or event
    Decode {
        /// Encoded record bytes
        #[arg(long)]
        data: String,
        #[arg(long, value_enum, default_value_t = DataEncoding::Base64)]
        encoding: DataEncoding,
        /// Expected kind (default: resolve by discriminator)
        #[arg(long)]
        kind: Option<String>,
        /// Resolve among events instead of accounts
        #[arg(long)]
        event: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode a record given as JSON ({"kind", "category", "fields"})
    Encode {
        /// JSON file, or - for stdin
        #[arg(long)]
        record: String,
        #[arg(long, value_enum, default_value_t = DataEncoding::Hex)]
        encoding: DataEncoding,
    },

    /// Extract and decode events from getTransaction results
    Events {
        /// JSON file holding one result or an array of them, or - for stdin
        #[arg(long)]
        traces: String,
        /// Event authority (default: config, then Perpetuals)
        #[arg(long)]
        authority: Option<String>,
        /// Only show events with this name, e.g. ClosePositionRequestEvent
        #[arg(long)]
        name: Option<String>,
        /// Also scan transactions that failed
        #[arg(long)]
        include_failed: bool,
        /// Only accept instructions carrying Anchor's event tag
        #[arg(long)]
        require_tag: bool,
        /// Report candidates that did not decode
        #[arg(long)]
        show_failures: bool,
        /// One JSON object per event
        #[arg(long)]
        json: bool,
    },

    /// Decode a getProgramAccounts dump and list open positions
    #[command(name = "open-positions")]
    OpenPositions {
        /// JSON file, or - for stdin
        #[arg(long)]
        accounts: String,
        #[arg(long, default_value = "Position")]
        kind: String,
        /// Only positions owned by this wallet
        #[arg(long)]
        owner: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show build and capability info
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".into();
    }
    init_tracing(&logging);

    if let Commands::Info = cli.command {
        return cmd_info();
    }

    let registry = config.registry(cli.idl.as_deref())?;
    let codec = BorshCodec::new(Arc::new(registry.clone()));

    match cli.command {
        Commands::Inspect { kind, json } => cmd_inspect::run(&registry, kind.as_deref(), json),

        Commands::Memcmp { kind, field, pubkey } => {
            cmd_decode::memcmp(&registry, &kind, field.as_deref(), pubkey.as_deref())
        }

        Commands::Decode { data, encoding, kind, event, json } => {
            let category = if event { RecordCategory::Event } else { RecordCategory::Account };
            cmd_decode::decode(&codec, &data, encoding, kind.as_deref(), category, json)
        }

        Commands::Encode { record, encoding } => cmd_decode::encode(&codec, &record, encoding),

        Commands::Events {
            traces,
            authority,
            name,
            include_failed,
            require_tag,
            show_failures,
            json,
        } => {
            let mut extractor = match (authority, &config.events) {
                (Some(key), _) => ExtractorConfig::new(
                    Pubkey::from_str(&key).with_context(|| format!("invalid authority '{key}'"))?,
                ),
                (None, Some(cfg)) => cfg.clone(),
                (None, None) => ExtractorConfig::new(Pubkey::from_str(perpetuals::EVENT_AUTHORITY)?),
            };
            if include_failed {
                extractor.skip_failed = false;
            }
            if require_tag {
                extractor.require_event_tag = true;
            }
            cmd_events::run(
                &codec,
                cmd_events::EventsArgs {
                    source: &traces,
                    config: extractor,
                    name: name.as_deref(),
                    show_failures,
                    json,
                },
            )
        }

        Commands::OpenPositions { accounts, kind, owner, json } => {
            cmd_accounts::run(&codec, &accounts, &kind, owner.as_deref(), json)
        }

        Commands::Info => cmd_info(),
    }
}

fn cmd_info() -> Result<()> {
    println!("IDLCodec v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Capabilities:");
    println!("  ✓ Anchor IDL parsing         (legacy and 0.30+ JSON)");
    println!("  ✓ Discriminator matching     (sha256 namespaces, memcmp export)");
    println!("  ✓ Borsh decode / encode      (u128/i128 exact, nested types)");
    println!("  ✓ Event extraction           (self-CPI via event authority)");
    println!("  ✓ Parallel batch decode      (Rayon)");
    println!();
    println!("Bundled IDL:   Jupiter Perpetuals ({})", perpetuals::PROGRAM_ID);
    println!("Event authority:                {}", perpetuals::EVENT_AUTHORITY);
    Ok(())
}
