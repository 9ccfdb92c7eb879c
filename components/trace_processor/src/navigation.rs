//! Navigation milestones
//!
//! Derives paint and load milestones from an already processed trace.

use tracing::debug;
use trace_types::{to_timing, Result, TraceError, TraceEvent};

use crate::processor::TraceProcessor;
use crate::types::{
    LcpResult, NavigationTimestamps, NavigationTimings, ProcessedNavigation, ProcessedTrace,
};

const LCP_CANDIDATE: &str = "largestContentfulPaint::Candidate";
const LCP_INVALIDATE: &str = "largestContentfulPaint::Invalidate";

impl TraceProcessor {
    /// Extract navigation milestones from a processed trace
    ///
    /// Fails with [`TraceError::NoFirstContentfulPaint`] when the main frame never
    /// painted content after the time origin.
    pub fn process_navigation(trace: &ProcessedTrace) -> Result<ProcessedNavigation> {
        let time_origin_event = &trace.time_origin_event;
        let origin = time_origin_event.timestamp;

        let first_after_origin = |events: &[TraceEvent], name: &str| -> Option<TraceEvent> {
            events
                .iter()
                .find(|e| e.name == name && e.timestamp > origin)
                .cloned()
        };
        let last_after_origin = |events: &[TraceEvent], name: &str| -> Option<TraceEvent> {
            events
                .iter()
                .rev()
                .find(|e| e.name == name && e.timestamp > origin)
                .cloned()
        };

        let frame_events = trace.frame_events.as_slice();
        let frame_tree_events = trace.frame_tree_events.as_slice();

        let first_paint_event = first_after_origin(frame_events, "firstPaint");
        let first_contentful_paint_event = first_after_origin(frame_events, "firstContentfulPaint")
            .ok_or(TraceError::NoFirstContentfulPaint)?;
        let first_contentful_paint_all_frames_event =
            first_after_origin(frame_tree_events, "firstContentfulPaint")
                .unwrap_or_else(|| first_contentful_paint_event.clone());

        let mut fmp_fell_back = false;
        let first_meaningful_paint_event = last_after_origin(frame_events, "firstMeaningfulPaint")
            .or_else(|| {
                let candidate = last_after_origin(frame_events, "firstMeaningfulPaintCandidate");
                fmp_fell_back = candidate.is_some();
                candidate
            });

        let lcp = Self::compute_valid_lcp(frame_events, time_origin_event);
        let lcp_all_frames = Self::compute_valid_lcp(frame_tree_events, time_origin_event);

        let load_event = first_after_origin(frame_events, "loadEventEnd");
        let dom_content_loaded_event = first_after_origin(frame_events, "domContentLoadedEventEnd");

        let ts = |event: &Option<TraceEvent>| event.as_ref().map(|e| e.timestamp);
        let timestamps = NavigationTimestamps {
            time_origin: origin,
            first_paint: ts(&first_paint_event),
            first_contentful_paint: first_contentful_paint_event.timestamp,
            first_contentful_paint_all_frames: first_contentful_paint_all_frames_event.timestamp,
            first_meaningful_paint: ts(&first_meaningful_paint_event),
            largest_contentful_paint: ts(&lcp.lcp),
            largest_contentful_paint_all_frames: ts(&lcp_all_frames.lcp),
            trace_end: trace.timestamps.trace_end,
            load: ts(&load_event),
            dom_content_loaded: ts(&dom_content_loaded_event),
        };

        let timing = |value: f64| to_timing(value, origin);
        let timings = NavigationTimings {
            time_origin: 0.0,
            first_paint: timestamps.first_paint.map(timing),
            first_contentful_paint: timing(timestamps.first_contentful_paint),
            first_contentful_paint_all_frames: timing(timestamps.first_contentful_paint_all_frames),
            first_meaningful_paint: timestamps.first_meaningful_paint.map(timing),
            largest_contentful_paint: timestamps.largest_contentful_paint.map(timing),
            largest_contentful_paint_all_frames: timestamps
                .largest_contentful_paint_all_frames
                .map(timing),
            trace_end: timing(timestamps.trace_end),
            load: timestamps.load.map(timing),
            dom_content_loaded: timestamps.dom_content_loaded.map(timing),
        };

        debug!(
            "Navigation FCP at {}ms (fmp fell back: {}, lcp invalidated: {})",
            timings.first_contentful_paint, fmp_fell_back, lcp.invalidated
        );

        Ok(ProcessedNavigation {
            first_paint_event,
            first_contentful_paint_event,
            first_contentful_paint_all_frames_event,
            first_meaningful_paint_event,
            largest_contentful_paint_event: lcp.lcp,
            largest_contentful_paint_all_frames_event: lcp_all_frames.lcp,
            dom_content_loaded_event,
            load_event,
            timestamps,
            timings,
            fmp_fell_back,
            lcp_invalidated: lcp.invalidated,
            lcp_all_frames_invalidated: lcp_all_frames.invalidated,
        })
    }

    /// Current LCP candidate among `events`, ignoring anything before the origin
    pub fn compute_valid_lcp(events: &[TraceEvent], time_origin_event: &TraceEvent) -> LcpResult {
        let origin = time_origin_event.timestamp;
        let latest = events
            .iter()
            .rev()
            .filter(|e| e.timestamp > origin)
            .find(|e| e.name == LCP_CANDIDATE || e.name == LCP_INVALIDATE);

        match latest {
            Some(event) if event.name == LCP_CANDIDATE => LcpResult {
                lcp: Some(event.clone()),
                invalidated: false,
            },
            Some(_) => LcpResult {
                lcp: None,
                invalidated: true,
            },
            None => LcpResult::default(),
        }
    }
}
