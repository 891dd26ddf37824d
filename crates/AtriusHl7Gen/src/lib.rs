//! # HL7 v2.x accessor generator
//!
//! Turns an [`Hl7Schema`] into Rust source for one HL7 version: typed views over the generic
//! field-storage tree of `atrius-hl7-lib`, plus the static field tables those views index
//! into.
//!
//! For each version the generator emits five sibling modules:
//!
//! - `datatypes`: one view per datatype; primitives expose `value()` (plus `to_decimal()`,
//!   `to_date()`, `to_datetime()` or `to_time()` by kind), composites one accessor per
//!   component
//! - `segments`: one view per segment with one accessor per declared field; repeating
//!   fields add `_rep(rep)`, `_all()` and `_count()`
//! - `groups` and `messages`: one accessor per member, with the same repetition forms for
//!   repeating members
//! - `tables`: `'static` `SegmentSpec`/`GroupSpec`/`MessageSpec`/`DatatypeSpec` values and
//!   the `TABLES` entry registered with the runtime `ModelRegistry`
//!
//! Generation is a pure function of the schema, formatted with `prettyplease`; running it
//! twice yields byte-identical output.
//!
//! ```rust,no_run
//! use atrius_hl7_generator::{GeneratorConfig, generate_version};
//! use atrius_hl7_schema::{Hl7Version, SchemaRegistry};
//!
//! let registry = SchemaRegistry::from_manifest("crates/AtriusHl7/resources/manifest.json")?;
//! let schema = registry.load(Hl7Version::V2_3)?;
//! let generated = generate_version(&schema, &GeneratorConfig::default())?;
//! std::fs::write(generated.file_name(), generated.render_single_file()?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Path, PathBuf};

use atrius_hl7_schema::{Hl7Schema, Hl7Version, SchemaRegistry};
use tracing::info;

pub mod config;
mod directory_output_helpers;
pub mod error;
pub mod format_helpers;
mod gen_context;
mod gen_datatypes;
mod gen_groups;
mod gen_segments;
mod gen_tables;
pub mod output;

pub use config::GeneratorConfig;
pub use error::{GeneratorError, GeneratorResult};
pub use output::GeneratedVersion;

use gen_context::GenContext;

/// Generates the object model for one schema.
///
/// The schema is validated first; generation never starts from a schema with dangling
/// references or gaps in its positions.
pub fn generate_version(
    schema: &Hl7Schema,
    config: &GeneratorConfig,
) -> GeneratorResult<GeneratedVersion> {
    schema.validate()?;
    let ctx = GenContext::new(schema, config)?;

    Ok(GeneratedVersion {
        version: schema.version,
        datatypes: gen_datatypes::generate_datatypes(&ctx)?,
        segments: gen_segments::generate_segments(&ctx)?,
        groups: gen_groups::generate_groups(&ctx)?,
        messages: gen_groups::generate_messages(&ctx)?,
        tables: gen_tables::generate_tables(&ctx)?,
    })
}

/// Loads, generates and writes one registered version, or every registered version when
/// `version` is `None`.
///
/// With `single_file` each version becomes `output_dir/v2_x.rs`; otherwise
/// `output_dir/v2_x/` holds a `mod.rs` and one file per module. Returns the written paths.
pub fn process_hl7_version(
    registry: &SchemaRegistry,
    version: Option<Hl7Version>,
    output_dir: &Path,
    config: &GeneratorConfig,
    single_file: bool,
) -> GeneratorResult<Vec<PathBuf>> {
    let versions: Vec<Hl7Version> = match version {
        Some(v) => vec![v],
        None => registry.versions().collect(),
    };

    let mut written = Vec::new();
    for version in versions {
        let schema = registry.load(version)?;
        let generated = generate_version(&schema, config)?;
        if single_file {
            written.push(generated.write_single_file(output_dir)?);
        } else {
            let dir = output_dir.join(version.module_name());
            written.extend(generated.write_directory(&dir)?);
        }
        info!(
            "Generated HL7 {} ({} segments, {} messages)",
            version,
            schema.segments.len(),
            schema.messages.len()
        );
    }
    Ok(written)
}
