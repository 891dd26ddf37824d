//! # HL7 v2.x schema tables
//!
//! Machine-readable definitions of HL7 v2.x segments, composite datatypes, groups and
//! message structures, one table set per HL7 version. These tables are the sole input of
//! the accessor generator (`atrius-hl7-generator`), which turns them into the typed model
//! of `atrius-hl7-lib`.
//!
//! ## Contents
//!
//! - [`Hl7Schema`] and its definition types: the per-version table set
//! - [`Hl7Schema::validate`]: structural invariants (contiguous 1-based positions,
//!   resolvable references, acyclic groups)
//! - [`Hl7Version`]: the known HL7 v2.x releases
//! - [`SchemaRegistry`]: explicit version → schema file mapping read from a manifest
//!
//! ## Example
//!
//! ```rust,no_run
//! use atrius_hl7_schema::{Hl7Version, SchemaRegistry};
//!
//! let registry = SchemaRegistry::from_manifest("crates/AtriusHl7/resources/manifest.json")?;
//! let schema = registry.load(Hl7Version::V2_3)?;
//! let obr = schema.segment("OBR").expect("OBR is part of 2.3");
//! println!("OBR has {} fields in HL7 {}", obr.fields.len(), schema.version);
//! # Ok::<(), atrius_hl7_schema::SchemaError>(())
//! ```

pub mod definition;
pub mod error;
pub mod registry;
mod validate;
pub mod version;

pub use definition::{
    ComponentDefinition, DatatypeDefinition, DatatypeKind, FieldDefinition, GroupDefinition,
    Hl7Schema, MemberDefinition, MemberReference, MessageDefinition, PrimitiveKind,
    Repeatability, SegmentDefinition,
};
pub use error::{SchemaError, SchemaResult};
pub use registry::SchemaRegistry;
pub use version::Hl7Version;
