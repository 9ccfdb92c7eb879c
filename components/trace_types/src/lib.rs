// Trace event, network record and CPU profile types, plus error definitions
//
// This module is part of the CortenBrowser tracehouse implementation. Every other
// component consumes these types; none of them own any processing logic.

pub mod errors;
pub mod events;
pub mod network;
pub mod profile;

// Re-export commonly used types
pub use errors::{ErrorCode, ErrorReport, Result, TraceError};
pub use events::{Phase, TraceEvent, TraceLog};
pub use network::{Initiator, InitiatorType, NetworkRecord, ResourcePriority, ResourceType};
pub use profile::{CallFrame, ProfileNode, ProfileNodeId};

/// Microseconds per millisecond, the conversion between trace timestamps and timings
pub const MICROS_PER_MILLI: f64 = 1000.0;

/// Convert a trace timestamp delta (µs) into a timing (ms)
pub fn to_timing(timestamp: f64, origin: f64) -> f64 {
    (timestamp - origin) / MICROS_PER_MILLI
}
