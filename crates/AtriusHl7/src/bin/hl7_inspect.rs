//! # hl7-inspect
//!
//! Decodes an ER7 message and prints its structure tree as JSON.
//!
//! ```text
//! hl7-inspect [OPTIONS] [INPUT]
//!
//!   [INPUT]                          ER7 file to read (stdin when omitted)
//!       --validate                   Also report conformance issues
//!       --default-version <VERSION>  Version to assume when MSH-12 is empty
//!       --strict                     Reject fields exceeding their repetition limit
//!       --compact                    Print JSON on one line
//! ```
//!
//! ```bash
//! hl7-inspect --validate adt_a01.hl7
//! cat oru.hl7 | RUST_LOG=debug hl7-inspect --default-version 2.3
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use atrius_hl7_lib::{Hl7Version, Message, ModelRegistry, ParseOptions, Parser, ValidationIssue};
use clap::Parser as ClapParser;
use serde::Serialize;

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ER7 file to read. Reads stdin when omitted.
    input: Option<PathBuf>,

    /// Also report conformance issues (missing required fields, over-long values, ...).
    #[arg(long)]
    validate: bool,

    /// Version to assume when MSH-12 is empty.
    #[arg(long, value_enum)]
    default_version: Option<Hl7Version>,

    /// Reject fields holding more repetitions than their table allows.
    #[arg(long)]
    strict: bool,

    /// Print JSON on one line.
    #[arg(long)]
    compact: bool,
}

#[derive(Serialize)]
struct Report<'m> {
    message: &'m Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<ValidationIssue>>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let text = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };

    let options = ParseOptions {
        strict: args.strict,
        default_version: args.default_version,
    };
    let registry = ModelRegistry::with_enabled_versions();
    let message = Parser::new(&registry)
        .with_options(options)
        .parse(&text)
        .context("failed to decode message")?;

    let report = Report {
        message: &message,
        issues: args.validate.then(|| message.validate()),
    };
    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");
    Ok(())
}
