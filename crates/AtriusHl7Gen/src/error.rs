use std::path::PathBuf;

use atrius_hl7_schema::SchemaError;
use thiserror::Error;

pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Errors raised while turning a schema into Rust source.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A field or component names a datatype the schema does not declare
    #[error("{owner} references unknown datatype {datatype}")]
    UnresolvedDatatype { owner: String, datatype: String },

    /// A member names a segment or group the schema does not declare
    #[error("{owner} references unknown {kind} {name}")]
    UnresolvedMember {
        owner: String,
        kind: &'static str,
        name: String,
    },

    /// Two schema names map onto the same Rust identifier
    #[error("{first} and {second} both generate the identifier {ident}")]
    NameCollision {
        ident: String,
        first: String,
        second: String,
    },

    #[error("invalid runtime path '{0}'")]
    InvalidRuntimePath(String),

    /// The emitted tokens are not a valid Rust file (a generator bug)
    #[error("generated tokens for {module} do not parse: {source}")]
    Syntax {
        module: String,
        #[source]
        source: syn::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
