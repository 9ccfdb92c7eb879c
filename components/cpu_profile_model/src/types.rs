//! Type definitions for the CPU profile model
//!
//! Contains the merged [`CpuProfile`], the precisely-timed [`KnownTask`] hints
//! and the [`SyntheticTaskEvent`] records produced by synthesis.

use serde::{Deserialize, Serialize};
use serde_json::json;
use trace_processor::TraceProcessor;
use trace_types::{CallFrame, Phase, ProfileNode, ProfileNodeId, TraceEvent};

/// Name given to every synthesized function-call event
pub const SYNTHETIC_EVENT_NAME: &str = "FunctionCall-SynthesizedByProfilerModel";

/// Category given to every synthesized function-call event
pub const SYNTHETIC_EVENT_CATEGORY: &str = "lighthouse";

// ============================================================================
// Profiles
// ============================================================================

/// A sampled call-stack capture merged from its `Profile`/`ProfileChunk` fragments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CpuProfile {
    /// Fragment id shared by every event of this profile
    pub id: String,
    /// Process the profile was captured in
    pub pid: u64,
    /// Thread the profile was captured on
    pub tid: u64,
    /// Timestamp (µs) of the profile start
    pub start_time: f64,
    /// Call tree nodes
    pub nodes: Vec<ProfileNode>,
    /// Leaf node of each sample
    pub samples: Vec<ProfileNodeId>,
    /// Time (µs) elapsed before each sample
    pub time_deltas: Vec<f64>,
}

impl CpuProfile {
    /// Create an empty profile
    pub fn new(id: impl Into<String>, pid: u64, tid: u64, start_time: f64) -> Self {
        Self {
            id: id.into(),
            pid,
            tid,
            start_time,
            nodes: Vec::new(),
            samples: Vec::new(),
            time_deltas: Vec::new(),
        }
    }

    /// Set the call tree nodes
    pub fn with_nodes(mut self, nodes: Vec<ProfileNode>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the samples and the time deltas preceding them
    pub fn with_samples(mut self, samples: Vec<ProfileNodeId>, time_deltas: Vec<f64>) -> Self {
        self.samples = samples;
        self.time_deltas = time_deltas;
        self
    }

    /// Timestamp (µs) of the last sample
    ///
    /// Negative deltas are treated as zero.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.time_deltas.iter().map(|d| d.max(0.0)).sum::<f64>()
    }
}

// ============================================================================
// Known tasks
// ============================================================================

/// A precisely-timed task from native instrumentation, in absolute µs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnownTask {
    pub start: f64,
    pub end: f64,
}

impl KnownTask {
    /// Create a known task
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Top-level scheduled tasks with a duration on one thread
    pub fn from_trace_events(events: &[TraceEvent], pid: u64, tid: u64) -> Vec<Self> {
        events
            .iter()
            .filter(|e| e.process_id == pid && e.thread_id == tid && TraceProcessor::is_schedulable_task(e))
            .filter_map(|e| {
                let duration = e.duration.filter(|dur| *dur > 0.0)?;
                Some(Self::new(e.timestamp, e.timestamp + duration))
            })
            .collect()
    }
}

// ============================================================================
// Synthetic events
// ============================================================================

/// Phase of a synthesized event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntheticPhase {
    #[serde(rename = "B")]
    Begin,
    #[serde(rename = "E")]
    End,
}

impl From<SyntheticPhase> for Phase {
    fn from(phase: SyntheticPhase) -> Self {
        match phase {
            SyntheticPhase::Begin => Phase::Begin,
            SyntheticPhase::End => Phase::End,
        }
    }
}

/// A begin or end of a function call inferred from profiler samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticTaskEvent {
    pub phase: SyntheticPhase,
    /// Absolute timestamp (µs)
    pub timestamp: f64,
    pub pid: u64,
    pub tid: u64,
    /// Profile node this call belongs to
    pub node_id: ProfileNodeId,
    pub call_frame: CallFrame,
    /// Always set; marks the event as derived from samples
    pub synthetic: bool,
}

impl SyntheticTaskEvent {
    /// Convert into a trace event that can be merged back into a log
    pub fn to_trace_event(&self) -> TraceEvent {
        TraceEvent::new(
            SYNTHETIC_EVENT_NAME,
            SYNTHETIC_EVENT_CATEGORY,
            self.phase.into(),
            self.pid,
            self.tid,
            self.timestamp,
        )
        .with_args(json!({
            "data": {
                "callFrame": self.call_frame,
                "_syntheticProfilerRange": self.synthetic,
            }
        }))
    }
}
