//! Context error types.

use thiserror::Error;

/// Errors that can occur while exporting, transporting or importing a context
#[derive(Debug, Error, PartialEq)]
pub enum ContextError {
    /// A key the importing component needs is absent
    #[error("Context key '{0}' is missing")]
    MissingKey(String),

    /// A key is present but its value has the wrong shape
    #[error("Context key '{key}' is invalid: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Context format version is not supported by this version
    #[error("Unsupported context version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Two components tried to write the same key
    #[error("Context key '{0}' is already taken")]
    Collision(String),

    /// Namespaces must be non-empty and contain only ASCII letters, digits or '_'
    #[error("Invalid context namespace '{0}'")]
    InvalidNamespace(String),

    /// Encoding the context for transport failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Decoding a transported context failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}
