//! Type definitions for trace processing
//!
//! Contains the options, processed-trace and processed-navigation structures
//! produced by [`crate::TraceProcessor`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trace_types::TraceEvent;

// ============================================================================
// Options
// ============================================================================

/// How the time origin of a capture is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeOriginDeterminationMethod {
    /// The last navigation start of the main frame
    #[default]
    LastNavigationStart,
    /// The first resource request sent by the main frame
    FirstResourceSendRequest,
    /// An explicit timespan marker event
    LighthouseMarker,
}

/// Options for [`crate::TraceProcessor::process_trace`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTraceOptions {
    /// Time origin method
    pub time_origin_determination_method: TimeOriginDeterminationMethod,
}

impl ProcessTraceOptions {
    /// Options using the given time origin method
    pub fn with_method(method: TimeOriginDeterminationMethod) -> Self {
        Self {
            time_origin_determination_method: method,
        }
    }
}

// ============================================================================
// Processed trace
// ============================================================================

/// The process, thread and frame of the inspected page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainFrameIds {
    /// Renderer process the capture started in
    pub pid: u64,
    /// Main thread of that process
    pub tid: u64,
    /// Main frame id
    pub frame_id: String,
}

/// A frame declared by frame-tree metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    /// Frame id
    pub id: String,
    /// Committed URL
    #[serde(default)]
    pub url: String,
    /// Parent frame, absent for a root frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl FrameInfo {
    /// Create a frame declaration
    pub fn new(id: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            id: id.into(),
            url: String::new(),
            parent: parent.map(str::to_string),
        }
    }
}

/// Absolute timestamps (µs) of a processed trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceTimestamps {
    pub time_origin: f64,
    pub trace_end: f64,
}

/// Origin-relative timings (ms) of a processed trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceTimings {
    pub time_origin: f64,
    pub trace_end: f64,
}

/// End of a trace, absolute and origin-relative
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceEnd {
    /// Absolute timestamp (µs)
    pub timestamp: f64,
    /// Timing relative to the time origin (ms)
    pub timing: f64,
}

/// Normalized single-capture view of an event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTrace {
    /// Inspected process/thread/frame
    pub main_frame_ids: MainFrameIds,
    /// Every renderer process the main frame lived in, mapped to its main thread
    pub main_frame_pids: BTreeMap<u64, u64>,
    /// Frames declared by frame-tree metadata
    pub frames: Vec<FrameInfo>,
    /// Event chosen as the time origin
    pub time_origin_event: TraceEvent,
    /// Key (loading/timing/metadata) events
    pub key_events: Vec<TraceEvent>,
    /// Events on the main threads of the main-frame processes
    pub main_thread_events: Vec<TraceEvent>,
    /// Events of the main-frame processes
    pub process_events: Vec<TraceEvent>,
    /// Key events scoped to the main frame
    pub frame_events: Vec<TraceEvent>,
    /// Key events scoped to any frame of the main frame's tree
    pub frame_tree_events: Vec<TraceEvent>,
    /// Absolute timestamps
    pub timestamps: TraceTimestamps,
    /// Relative timings
    pub timings: TraceTimings,
}

// ============================================================================
// Processed navigation
// ============================================================================

/// Absolute milestone timestamps (µs) of a navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTimestamps {
    pub time_origin: f64,
    pub first_paint: Option<f64>,
    pub first_contentful_paint: f64,
    pub first_contentful_paint_all_frames: f64,
    pub first_meaningful_paint: Option<f64>,
    pub largest_contentful_paint: Option<f64>,
    pub largest_contentful_paint_all_frames: Option<f64>,
    pub trace_end: f64,
    pub load: Option<f64>,
    pub dom_content_loaded: Option<f64>,
}

/// Origin-relative milestone timings (ms) of a navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTimings {
    pub time_origin: f64,
    pub first_paint: Option<f64>,
    pub first_contentful_paint: f64,
    pub first_contentful_paint_all_frames: f64,
    pub first_meaningful_paint: Option<f64>,
    pub largest_contentful_paint: Option<f64>,
    pub largest_contentful_paint_all_frames: Option<f64>,
    pub trace_end: f64,
    pub load: Option<f64>,
    pub dom_content_loaded: Option<f64>,
}

/// Milestones for one navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedNavigation {
    pub first_paint_event: Option<TraceEvent>,
    pub first_contentful_paint_event: TraceEvent,
    pub first_contentful_paint_all_frames_event: TraceEvent,
    pub first_meaningful_paint_event: Option<TraceEvent>,
    pub largest_contentful_paint_event: Option<TraceEvent>,
    pub largest_contentful_paint_all_frames_event: Option<TraceEvent>,
    pub dom_content_loaded_event: Option<TraceEvent>,
    pub load_event: Option<TraceEvent>,
    pub timestamps: NavigationTimestamps,
    pub timings: NavigationTimings,
    /// FMP came from a candidate rather than a defined FMP event
    ///
    /// `false` when there is no FMP at all.
    pub fmp_fell_back: bool,
    /// The most recent main-frame LCP event was an invalidation
    pub lcp_invalidated: bool,
    /// The most recent all-frames LCP event was an invalidation
    pub lcp_all_frames_invalidated: bool,
}

/// Result of scanning LCP candidate/invalidate events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LcpResult {
    /// Current LCP candidate, if not invalidated
    pub lcp: Option<TraceEvent>,
    /// Whether the most recent relevant event was an invalidation
    pub invalidated: bool,
}

// ============================================================================
// Responsiveness
// ============================================================================

/// A non-nested main-thread task, in origin-relative milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopLevelEvent {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

/// Task durations inside a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDurations {
    /// Durations (ms), ascending
    pub durations: Vec<f64>,
    /// Portion of a task running past the window end (ms)
    pub clipped_length: f64,
}

/// Estimated input queueing delay at one percentile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPercentile {
    pub percentile: f64,
    pub time: f64,
}
