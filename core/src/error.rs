//! Error types for demo parsing and analysis

use std::io;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the parsing and analysis API
///
/// One taxonomy covers the whole API surface so multi-file drivers can
/// report a single per-file code.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied configuration failed validation
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Generic parse failure
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// The stop flag was observed between snapshots
    #[error("operation canceled")]
    OperationCanceled,

    /// Job was admitted by the multi-file driver but never started
    #[error("file was not processed")]
    Unprocessed,

    /// Framing violation, unknown opcode, or corrupt message content
    #[error("invalid demo file: {0}")]
    InvalidDemoFile(String),

    /// I/O error while reading the recording
    #[error("unreadable demo file: {0}")]
    UnreadableDemoFile(#[source] io::Error),

    /// I/O error while writing an output file
    #[error("unwritable output file: {0}")]
    UnwritableFile(#[source] io::Error),

    /// The file extension names a protocol version newer than we support
    #[error("unsupported protocol version: {0}")]
    MaxProtocolExceeded(String),
}

/// Severity attached to messages sent through the caller's message callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageSeverity {
    /// Informational progress notes
    Info,
    /// Recoverable decode anomaly; parsing continued
    Warning,
    /// The recording was abandoned
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidArgument("rule count is zero").to_string(),
            "invalid argument: rule count is zero"
        );
        assert_eq!(Error::OperationCanceled.to_string(), "operation canceled");
        assert_eq!(
            Error::InvalidDemoFile("bad opcode 11".into()).to_string(),
            "invalid demo file: bad opcode 11"
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(MessageSeverity::Info < MessageSeverity::Warning);
        assert!(MessageSeverity::Warning < MessageSeverity::Error);
    }
}
