//! Error types for loading and validating HL7 schema tables.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while reading, resolving or validating an HL7 schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema or manifest file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema or manifest file is not valid JSON for the expected shape
    #[error("failed to parse {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// A version string that does not name a known HL7 v2.x release
    #[error("unknown HL7 version '{0}'")]
    UnknownVersion(String),

    /// The registry has no schema file for the requested version
    #[error("no schema registered for HL7 version {0}")]
    VersionNotRegistered(String),

    /// A schema file declares a different version than the registry entry that points at it
    #[error("schema at {path} declares version {declared}, registry expects {expected}")]
    VersionMismatch {
        path: PathBuf,
        declared: String,
        expected: String,
    },

    /// The schema violates one or more structural invariants
    #[error("invalid schema for HL7 {version}:\n  {}", .issues.join("\n  "))]
    Invalid { version: String, issues: Vec<String> },
}
