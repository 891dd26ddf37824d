//! # HL7 Generator CLI
//!
//! Command-line interface for generating the typed HL7 v2.x object model from the schema
//! tables listed in a registry manifest.
//!
//! ## Usage
//!
//! ```bash
//! # Generate every version listed in the manifest
//! atrius-hl7-gen --all
//!
//! # Generate one version as a module directory for a downstream crate
//! atrius-hl7-gen 2.3 --output src/hl7 --runtime-path atrius_hl7_lib
//!
//! # Generate one version as a single file (the build-script layout)
//! atrius-hl7-gen 2.1 --single-file
//! ```
//!
//! Set `RUST_LOG=debug` to see per-module progress.

use std::path::PathBuf;

use anyhow::{Context, Result};
use atrius_hl7_generator::{GeneratorConfig, process_hl7_version};
use atrius_hl7_schema::{Hl7Version, SchemaRegistry};
use clap::Parser;
use tracing::info;

/// Command-line arguments for the HL7 code generator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, disable_version_flag = true)]
struct Args {
    /// HL7 version to generate (e.g. 2.3). Defaults to every version in the manifest.
    #[arg(value_enum)]
    version: Option<Hl7Version>,

    /// Generate every version listed in the manifest.
    #[arg(long, short, conflicts_with = "version")]
    all: bool,

    /// Registry manifest mapping versions to schema files.
    #[arg(
        long,
        short,
        env = "ATRIUS_HL7_MANIFEST",
        default_value = "crates/AtriusHl7/resources/manifest.json"
    )]
    manifest: PathBuf,

    /// Directory the generated sources are written to.
    #[arg(long, short, env = "ATRIUS_HL7_OUTPUT", default_value = "generated")]
    output: PathBuf,

    /// Path under which generated code reaches the runtime crate.
    #[arg(long, default_value = "atrius_hl7_lib")]
    runtime_path: String,

    /// Write one `v2_x.rs` per version instead of a module directory.
    #[arg(long)]
    single_file: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error generating HL7 model: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let registry = SchemaRegistry::from_manifest(&args.manifest)
        .with_context(|| format!("failed to load manifest {}", args.manifest.display()))?;

    let version = if args.all { None } else { args.version };
    let config = GeneratorConfig::default().with_runtime_path(args.runtime_path);

    let written = process_hl7_version(
        &registry,
        version,
        &args.output,
        &config,
        args.single_file,
    )
    .context("code generation failed")?;

    for path in &written {
        info!("wrote {}", path.display());
    }
    Ok(())
}
