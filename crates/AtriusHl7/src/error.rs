//! Error types for decoding HL7 messages and converting primitive values.

use thiserror::Error;

use crate::Hl7Version;

/// Result type alias for decoding operations
pub type Hl7Result<T> = Result<T, Hl7Error>;

/// Errors raised while decoding ER7 text into a message tree, or while converting a
/// primitive value into a typed one.
///
/// Absent data is never an error: accessors return `None` or an empty `Vec` for it.
#[derive(Debug, Error)]
pub enum Hl7Error {
    #[error("message contains no segments")]
    EmptyMessage,

    /// The first segment is not `MSH`
    #[error("message must start with an MSH segment, found '{0}'")]
    MissingHeader(String),

    #[error("invalid MSH encoding characters: {0}")]
    InvalidEncodingCharacters(String),

    /// A segment whose first three characters are not an upper-case mnemonic
    #[error("invalid segment name in '{0}'")]
    InvalidSegmentName(String),

    #[error("MSH-12 carries no version and no default version is configured")]
    MissingVersion,

    #[error("unknown HL7 version '{0}'")]
    UnknownVersion(String),

    /// The version is valid but its model was not compiled in or registered
    #[error("HL7 {0} is not available in this model registry")]
    VersionNotAvailable(Hl7Version),

    #[error("no HL7 {version} message structure for {message_type}^{trigger_event}")]
    UnknownStructure {
        version: Hl7Version,
        message_type: String,
        trigger_event: String,
    },

    /// More repetitions than a bounded field admits (strict decoding only)
    #[error("{segment}-{position} holds {found} repetitions, at most {max} allowed")]
    RepetitionLimit {
        segment: String,
        position: usize,
        max: u32,
        found: usize,
    },

    /// A primitive whose text cannot be read as its declared kind
    #[error("'{value}' is not a valid HL7 {kind} value")]
    InvalidValue { kind: &'static str, value: String },
}
