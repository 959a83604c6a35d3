use std::path::PathBuf;

use thiserror::Error;

/// Problems with the input document. Fatal, raised before any completion call.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("No text could be extracted from {0}")]
    NoContent(PathBuf),
}

/// The report artifact could not be written. Fatal: it is the run's only output.
#[derive(Error, Debug)]
#[error("Failed to write report to {path}: {source}")]
pub struct SinkError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failure at the completion-service boundary.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("throttled by completion service (HTTP {status})")]
    Throttled { status: u16 },

    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("run deadline exceeded")]
    DeadlineExceeded,
}

impl CapabilityError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CapabilityError::Timeout(_)
            | CapabilityError::Connection(_)
            | CapabilityError::Throttled { .. } => true,
            CapabilityError::Status { status, .. } => *status >= 500,
            CapabilityError::Malformed(_) | CapabilityError::DeadlineExceeded => false,
        }
    }
}

/// Errors that terminate a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Analysis exceeded the run budget of {0}s")]
    Timeout(u64),
}

impl PipelineError {
    /// Process exit status reported to the caller.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Input(_) => 2,
            PipelineError::Sink(_) => 3,
            PipelineError::Timeout(_) => 124,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CapabilityError::Timeout(300).is_transient());
        assert!(CapabilityError::Throttled { status: 429 }.is_transient());
        assert!(CapabilityError::Status { status: 503, body: String::new() }.is_transient());
        assert!(!CapabilityError::Status { status: 400, body: String::new() }.is_transient());
        assert!(!CapabilityError::Malformed("no choices".into()).is_transient());
        assert!(!CapabilityError::DeadlineExceeded.is_transient());
    }

    #[test]
    fn exit_codes_are_distinct() {
        let input = PipelineError::from(InputError::UnsupportedFormat("pdf".into()));
        let timeout = PipelineError::Timeout(300);
        assert_eq!(input.exit_code(), 2);
        assert_eq!(timeout.exit_code(), 124);
        assert_ne!(input.exit_code(), timeout.exit_code());
    }
}
