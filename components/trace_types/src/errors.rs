// Trace analysis error types
// Every failure carries a stable machine-readable code so batch callers can
// catch-and-continue per input.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable machine-readable error code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No trace-start marker could be found
    NoTracingStarted,
    /// No navigation-start for the resolved main frame
    #[serde(rename = "NO_NAVSTART")]
    NoNavigationStart,
    /// No resource send-request for the resolved main frame
    #[serde(rename = "NO_RESOURCE_REQUEST")]
    NoResourceSendRequest,
    /// No timespan marker event in marker mode
    NoTimespanMarker,
    /// No first contentful paint
    #[serde(rename = "NO_FCP")]
    NoFirstContentfulPaint,
    /// A main-frame process has no resolvable main thread
    NoMainThread,
    /// A CPU profile has mismatched samples/timeDeltas lengths
    ProfileLengthMismatch,
    /// A CPU profile references a node id it does not define
    UnknownProfileNode,
    /// A CPU profile's parent links form a cycle
    ProfileNodeCycle,
    /// A CPU profile fragment holds an entry of the wrong type
    MalformedProfile,
    /// Frame parent links form a cycle
    FrameCycle,
    /// The event log is not valid JSON
    InvalidTraceJson,
    /// Failure outside trace semantics, such as a crashed worker
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    /// The wire string for this code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoTracingStarted => "NO_TRACING_STARTED",
            Self::NoNavigationStart => "NO_NAVSTART",
            Self::NoResourceSendRequest => "NO_RESOURCE_REQUEST",
            Self::NoTimespanMarker => "NO_TIMESPAN_MARKER",
            Self::NoFirstContentfulPaint => "NO_FCP",
            Self::NoMainThread => "NO_MAIN_THREAD",
            Self::ProfileLengthMismatch => "PROFILE_LENGTH_MISMATCH",
            Self::UnknownProfileNode => "UNKNOWN_PROFILE_NODE",
            Self::ProfileNodeCycle => "PROFILE_NODE_CYCLE",
            Self::MalformedProfile => "MALFORMED_PROFILE",
            Self::FrameCycle => "FRAME_CYCLE",
            Self::InvalidTraceJson => "INVALID_TRACE_JSON",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Malformed input: the whole computation is aborted
    pub fn is_structural(&self) -> bool {
        !self.is_semantic_absence()
    }

    /// Valid but incomplete capture: callers may choose to degrade instead of fail
    pub fn is_semantic_absence(&self) -> bool {
        matches!(
            self,
            Self::NoFirstContentfulPaint | Self::NoResourceSendRequest | Self::NoTimespanMarker
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trace analysis error
#[derive(Error, Debug)]
pub enum TraceError {
    /// No `TracingStartedInBrowser`/`TracingStartedInPage` marker or usable fallback
    #[error("No tracing started event found in trace")]
    NoTracingStarted,

    /// The time-origin method needs a navigation start and none was found
    #[error("No navigationStart event found for main frame {frame_id}")]
    NoNavigationStart { frame_id: String },

    /// The time-origin method needs a send request and none was found
    #[error("No ResourceSendRequest event found for main frame {frame_id}")]
    NoResourceSendRequest { frame_id: String },

    /// Marker mode without a marker event
    #[error("No timespan marker event found in trace")]
    NoTimespanMarker,

    /// No first contentful paint after the time origin
    #[error("No firstContentfulPaint event found in trace")]
    NoFirstContentfulPaint,

    /// A main-frame renderer process without a main thread name
    #[error("Unable to determine main thread for renderer process {pid}")]
    NoMainThread { pid: u64 },

    /// samples/timeDeltas length mismatch
    #[error("CPU profile {profile_id} has {samples} samples but {time_deltas} time deltas")]
    ProfileLengthMismatch {
        profile_id: String,
        samples: usize,
        time_deltas: usize,
    },

    /// Sample or parent reference to an undefined node
    #[error("CPU profile {profile_id} references unknown node {node_id}")]
    UnknownProfileNode { profile_id: String, node_id: u32 },

    /// Cyclic parent links in a CPU profile
    #[error("CPU profile {profile_id} has a parent cycle through node {node_id}")]
    ProfileNodeCycle { profile_id: String, node_id: u32 },

    /// A nodes, samples or timeDeltas entry of the wrong type
    #[error("CPU profile {profile_id} has a malformed {field} entry: {reason}")]
    MalformedProfile {
        profile_id: String,
        field: &'static str,
        reason: String,
    },

    /// Cyclic parent links between frames
    #[error("Frame parent cycle through frame {frame_id}")]
    FrameCycle { frame_id: String },

    /// Unparseable event log
    #[error("Invalid trace JSON: {0}")]
    InvalidTraceJson(#[source] serde_json::Error),
}

impl TraceError {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoTracingStarted => ErrorCode::NoTracingStarted,
            Self::NoNavigationStart { .. } => ErrorCode::NoNavigationStart,
            Self::NoResourceSendRequest { .. } => ErrorCode::NoResourceSendRequest,
            Self::NoTimespanMarker => ErrorCode::NoTimespanMarker,
            Self::NoFirstContentfulPaint => ErrorCode::NoFirstContentfulPaint,
            Self::NoMainThread { .. } => ErrorCode::NoMainThread,
            Self::ProfileLengthMismatch { .. } => ErrorCode::ProfileLengthMismatch,
            Self::UnknownProfileNode { .. } => ErrorCode::UnknownProfileNode,
            Self::ProfileNodeCycle { .. } => ErrorCode::ProfileNodeCycle,
            Self::MalformedProfile { .. } => ErrorCode::MalformedProfile,
            Self::FrameCycle { .. } => ErrorCode::FrameCycle,
            Self::InvalidTraceJson(_) => ErrorCode::InvalidTraceJson,
        }
    }
}

/// Result type for trace analysis operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Serializable error summary for batch results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReport {
    /// Stable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorReport {}

impl From<TraceError> for ErrorReport {
    fn from(error: TraceError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl From<&TraceError> for ErrorReport {
    fn from(error: &TraceError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}
