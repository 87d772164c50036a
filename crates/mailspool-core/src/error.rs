//! Error types and result handling for spool operations.
//!
//! Defines the structured error taxonomy with stable codes for client
//! disambiguation and HTTP status mapping at the API boundary. Covers
//! authentication, payload validation, and storage failures.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for spool operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No presented API key resolved against the credential index,
    /// or the winning key has expired.
    #[error("could not validate credentials")]
    Unauthorized,

    /// The key resolved but lacks permission for the target stream
    /// and operation.
    #[error("permission denied for stream '{stream}' operation '{operation}'")]
    Forbidden {
        /// Stream the caller tried to act on.
        stream: String,
        /// Operation that was denied.
        operation: String,
    },

    /// The notification payload carries none of the identifying fields.
    #[error("payload contains no identifying field ({fields})")]
    MalformedPayload {
        /// Comma-separated list of the fields that were tried.
        fields: &'static str,
    },

    /// Durable write, read, or delete against the spool failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// The requested artifact does not exist.
    #[error("artifact '{name}' not found in stream '{stream}'")]
    NotFound {
        /// Stream that was searched.
        stream: String,
        /// Artifact name that was requested.
        name: String,
    },

    /// An artifact with this name already exists. The ingestion path
    /// retries with a disambiguating suffix rather than overwriting.
    #[error("artifact '{name}' already exists in stream '{stream}'")]
    ArtifactExists {
        /// Stream the write targeted.
        stream: String,
        /// Name that collided.
        name: String,
    },

    /// Startup-time credential or service configuration is invalid.
    /// Fatal: the process must not serve traffic with an ambiguous
    /// credential table.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the stable error code surfaced in API error bodies.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::Storage(_) => "storage_error",
            Self::NotFound { .. } => "not_found",
            Self::ArtifactExists { .. } => "artifact_exists",
            Self::Config(_) => "config_error",
        }
    }
}
