//! Shared error type across rsyslog-exporter crates.

use thiserror::Error;

/// Stable error classes (used in logs and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A stats line that could not be folded into the table.
    MalformedInput,
    /// Startup configuration rejected.
    ConfigurationInvalid,
    /// I/O or runtime failure outside the stats pipeline.
    Internal,
}

impl ErrorKind {
    /// String representation used in structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "MALFORMED_INPUT",
            ErrorKind::ConfigurationInvalid => "CONFIGURATION_INVALID",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Unified error type used by core and daemon.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("stats record has no name")]
    MissingName,
    #[error("stats record has no origin (name={0})")]
    MissingOrigin(String),
    #[error("global record has no values bucket")]
    MissingValues,
    #[error("global counter key without '.': {0}")]
    InvalidCounterKey(String),
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ExporterError {
    /// Map the error to its stable class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExporterError::InvalidJson(_)
            | ExporterError::MissingName
            | ExporterError::MissingOrigin(_)
            | ExporterError::MissingValues
            | ExporterError::InvalidCounterKey(_) => ErrorKind::MalformedInput,
            ExporterError::ConfigurationInvalid(_) => ErrorKind::ConfigurationInvalid,
            ExporterError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the input pipeline should count this and carry on.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::MalformedInput
    }
}
