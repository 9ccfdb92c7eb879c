//! Error types for trace analysis orchestration

use thiserror::Error;
use trace_types::{ErrorCode, ErrorReport, TraceError};

/// Errors that can occur while analyzing a capture
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The capture itself could not be analyzed
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Input could not be fingerprinted for the cache
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A batch worker panicked or was cancelled
    #[error("Analysis task failed: {0}")]
    TaskFailed(String),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnalysisError {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Trace(error) => error.code(),
            _ => ErrorCode::Internal,
        }
    }
}

impl From<&AnalysisError> for ErrorReport {
    fn from(error: &AnalysisError) -> Self {
        match error {
            AnalysisError::Trace(trace_error) => trace_error.into(),
            other => ErrorReport {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

impl From<AnalysisError> for ErrorReport {
    fn from(error: AnalysisError) -> Self {
        ErrorReport::from(&error)
    }
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalysisError::InvalidConfiguration("test".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: test");

        let err = AnalysisError::from(TraceError::NoTracingStarted);
        assert_eq!(err.to_string(), "No tracing started event found in trace");
    }

    #[test]
    fn test_error_report_keeps_trace_code() {
        let report = ErrorReport::from(AnalysisError::from(TraceError::NoFirstContentfulPaint));
        assert_eq!(report.code, ErrorCode::NoFirstContentfulPaint);

        let report = ErrorReport::from(AnalysisError::TaskFailed("cancelled".into()));
        assert_eq!(report.code, ErrorCode::Internal);
        assert_eq!(report.message, "Analysis task failed: cancelled");
    }
}
