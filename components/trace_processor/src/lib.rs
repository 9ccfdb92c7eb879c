//! Trace and navigation processing
//!
//! Normalizes a complete event log into a [`ProcessedTrace`] (main frame, time
//! origin, deterministically sorted event partitions) and derives per-navigation
//! milestones as a [`ProcessedNavigation`].
//!
//! # Features
//!
//! - **Frame resolution**: main process/thread/frame from tracing-start metadata,
//!   frame trees resolved to their root frames
//! - **Time origin**: last navigation start, first resource request, or timespan marker
//! - **Deterministic ordering**: same-timestamp events ordered by nesting structure
//! - **Milestones**: FP, FCP, FMP, LCP (main frame and all frames), DCL, load
//! - **Responsiveness**: top-level main-thread tasks and queueing-delay percentiles

mod frames;
mod navigation;
mod processor;
mod responsiveness;
mod sorting;
mod types;

pub use frames::resolve_root_frames;
pub use processor::TraceProcessor;
pub use responsiveness::{BASE_RESPONSE_LATENCY, DEFAULT_RISK_PERCENTILES};
pub use sorting::{filtered_sort, sort_events};
pub use types::*;
