//! TraceProcessor implementation
//!
//! Resolves the inspected page's process, thread and frame, chooses a time
//! origin, and partitions the log into deterministically sorted event lists.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use trace_types::{to_timing, Phase, Result, TraceError, TraceEvent, TraceLog};

use crate::frames::resolve_root_frames;
use crate::sorting::filtered_sort;
use crate::types::{
    FrameInfo, MainFrameIds, ProcessTraceOptions, ProcessedTrace, TimeOriginDeterminationMethod,
    TraceEnd, TraceTimestamps, TraceTimings,
};

/// Name of the user-timing mark that anchors timespan captures
pub const TIMESPAN_MARKER_ID: &str = "__lighthouse-timespan-marker__";

const RENDERER_MAIN_THREAD: &str = "CrRendererMain";
const BROWSER_MAIN_THREAD: &str = "CrBrowserMain";

/// Stateless trace processing entry points
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceProcessor;

impl TraceProcessor {
    /// Normalize a complete event log
    pub fn process_trace(log: &TraceLog, options: &ProcessTraceOptions) -> Result<ProcessedTrace> {
        let method = options.time_origin_determination_method;
        let events = &log.events;
        debug!("Processing trace with {} events ({:?})", events.len(), method);

        let key_events = filtered_sort(events, Self::is_key_event);

        let main_frame_ids = Self::find_main_frame_ids(&key_events, method)?;
        let main_frame_pids = Self::find_main_frame_pids(&main_frame_ids, &key_events)?;

        let process_events =
            filtered_sort(events, |e| main_frame_pids.contains_key(&e.process_id));
        let main_thread_events: Vec<TraceEvent> = process_events
            .iter()
            .filter(|e| main_frame_pids.get(&e.process_id) == Some(&e.thread_id))
            .cloned()
            .collect();

        let frames = Self::collect_frames(&key_events);
        let frame_id_to_root = resolve_root_frames(&frames)?;
        let main_frame_id = main_frame_ids.frame_id.as_str();

        let frame_events: Vec<TraceEvent> = key_events
            .iter()
            .filter(|e| e.frame_id() == Some(main_frame_id))
            .cloned()
            .collect();

        let frame_tree_events: Vec<TraceEvent> = if frame_id_to_root.contains_key(main_frame_id) {
            let tree_frame_ids: HashSet<&str> = frame_id_to_root
                .iter()
                .filter(|(id, root)| root.as_str() == main_frame_id || id.as_str() == main_frame_id)
                .map(|(id, _)| id.as_str())
                .collect();
            key_events
                .iter()
                .filter(|e| e.frame_id().is_some_and(|id| tree_frame_ids.contains(id)))
                .cloned()
                .collect()
        } else {
            // Without frame metadata the main frame's tree cannot be told apart from
            // anything else in the log, so unscoped events of its processes count too.
            warn!("frameTreeEvents may be incomplete, make sure the trace has frame events");
            key_events
                .iter()
                .filter(|e| match e.frame_id() {
                    Some(id) => id == main_frame_id,
                    None => {
                        e.phase != Phase::Metadata && main_frame_pids.contains_key(&e.process_id)
                    }
                })
                .cloned()
                .collect()
        };

        let time_origin_event =
            Self::compute_time_origin(method, &key_events, &frame_events, main_frame_id)?;
        let trace_end = Self::compute_trace_end(events, &time_origin_event);

        debug!(
            "Resolved main frame {} (pid {}, tid {}), time origin {}",
            main_frame_ids.frame_id, main_frame_ids.pid, main_frame_ids.tid,
            time_origin_event.timestamp
        );

        Ok(ProcessedTrace {
            main_frame_ids,
            main_frame_pids,
            frames,
            timestamps: TraceTimestamps {
                time_origin: time_origin_event.timestamp,
                trace_end: trace_end.timestamp,
            },
            timings: TraceTimings {
                time_origin: 0.0,
                trace_end: trace_end.timing,
            },
            time_origin_event,
            key_events,
            main_thread_events,
            process_events,
            frame_events,
            frame_tree_events,
        })
    }

    /// Latest end of any event, absolute and relative to the time origin
    ///
    /// Events that end before the origin never pull the end earlier than the origin.
    pub fn compute_trace_end(events: &[TraceEvent], time_origin_event: &TraceEvent) -> TraceEnd {
        let origin = time_origin_event.timestamp;
        let timestamp = events
            .iter()
            .map(TraceEvent::end_timestamp)
            .fold(origin, f64::max);

        TraceEnd {
            timestamp,
            timing: to_timing(timestamp, origin),
        }
    }

    /// Whether a navigation start marks a real page load
    pub fn is_navigation_start_of_interest(event: &TraceEvent) -> bool {
        if event.name != "navigationStart" {
            return false;
        }
        // Older captures predate `documentLoaderURL` and are always of interest.
        match event.data().and_then(|data| data.get("documentLoaderURL")) {
            None => true,
            Some(Value::String(url)) => url.starts_with("http"),
            Some(_) => false,
        }
    }

    /// Resolve the inspected process, thread and frame
    pub fn find_main_frame_ids(
        key_events: &[TraceEvent],
        method: TimeOriginDeterminationMethod,
    ) -> Result<MainFrameIds> {
        if let Some(ids) = Self::main_frame_from_tracing_started_in_browser(key_events) {
            return Ok(ids);
        }

        // Legacy captures announce the page directly.
        if let Some(event) = key_events.iter().find(|e| e.name == "TracingStartedInPage") {
            if let Some(page) = event
                .data()
                .and_then(|data| data.get("page"))
                .and_then(Value::as_str)
            {
                return Ok(MainFrameIds {
                    pid: event.process_id,
                    tid: event.thread_id,
                    frame_id: page.to_string(),
                });
            }
        }

        let navigation_start = key_events.iter().find(|e| {
            Self::is_navigation_start_of_interest(e)
                && e.data()
                    .and_then(|data| data.get("isLoadingMainFrame"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
        });
        if let Some(event) = navigation_start {
            if let Some(frame_id) = event.frame_id() {
                return Ok(MainFrameIds {
                    pid: event.process_id,
                    tid: event.thread_id,
                    frame_id: frame_id.to_string(),
                });
            }
        }

        if method == TimeOriginDeterminationMethod::LighthouseMarker {
            if let Some(marker) = key_events.iter().find(|e| e.name == TIMESPAN_MARKER_ID) {
                if let Some(frame_id) = marker.frame_id() {
                    return Ok(MainFrameIds {
                        pid: marker.process_id,
                        tid: marker.thread_id,
                        frame_id: frame_id.to_string(),
                    });
                }
            }
        }

        Err(TraceError::NoTracingStarted)
    }

    fn main_frame_from_tracing_started_in_browser(key_events: &[TraceEvent]) -> Option<MainFrameIds> {
        let event = key_events
            .iter()
            .find(|e| e.name == "TracingStartedInBrowser")?;
        let frames = event.data()?.get("frames")?.as_array()?;
        let main_frame = frames
            .iter()
            .find(|frame| frame.get("parent").map_or(true, Value::is_null))?;

        let frame_id = main_frame.get("frame")?.as_str()?;
        let pid = main_frame.get("processId")?.as_u64()?;
        let tid = Self::find_thread_by_name(key_events, pid, RENDERER_MAIN_THREAD)?;

        Some(MainFrameIds {
            pid,
            tid,
            frame_id: frame_id.to_string(),
        })
    }

    fn find_thread_by_name(key_events: &[TraceEvent], pid: u64, thread_name: &str) -> Option<u64> {
        key_events
            .iter()
            .find(|e| {
                e.process_id == pid
                    && e.phase == Phase::Metadata
                    && e.name == "thread_name"
                    && e.args.get("name").and_then(Value::as_str) == Some(thread_name)
            })
            .map(|e| e.thread_id)
    }

    /// Every process the main frame lived in, mapped to its main thread
    ///
    /// Each `FrameCommittedInBrowser` for the main frame contributes its process.
    /// Captures without commits (old traces, timespans) keep the starting process.
    pub fn find_main_frame_pids(
        main_frame_ids: &MainFrameIds,
        key_events: &[TraceEvent],
    ) -> Result<BTreeMap<u64, u64>> {
        let mut pids: Vec<u64> = Vec::new();
        for event in key_events.iter().filter(|e| e.name == "FrameCommittedInBrowser") {
            let Some(data) = event.data() else { continue };
            if data.get("frame").and_then(Value::as_str) != Some(main_frame_ids.frame_id.as_str()) {
                continue;
            }
            if let Some(pid) = data.get("processId").and_then(Value::as_u64) {
                if !pids.contains(&pid) {
                    pids.push(pid);
                }
            }
        }
        if pids.is_empty() {
            pids.push(main_frame_ids.pid);
        }

        let mut pid_to_tid = BTreeMap::new();
        for pid in pids {
            let tid = Self::find_thread_by_name(key_events, pid, RENDERER_MAIN_THREAD)
                .or_else(|| Self::find_thread_by_name(key_events, pid, BROWSER_MAIN_THREAD))
                .or((pid == main_frame_ids.pid).then_some(main_frame_ids.tid))
                .ok_or(TraceError::NoMainThread { pid })?;
            pid_to_tid.insert(pid, tid);
        }

        Ok(pid_to_tid)
    }

    /// Frames declared by `TracingStartedInBrowser` and `FrameCommittedInBrowser`
    ///
    /// The first declaration of a frame id wins.
    pub fn collect_frames(key_events: &[TraceEvent]) -> Vec<FrameInfo> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut frames = Vec::new();

        let declared = key_events
            .iter()
            .filter(|e| e.name == "TracingStartedInBrowser")
            .filter_map(|e| e.data()?.get("frames")?.as_array())
            .flatten();
        let committed = key_events
            .iter()
            .filter(|e| e.name == "FrameCommittedInBrowser")
            .filter_map(|e| e.data())
            .filter(|data| data.get("url").and_then(Value::as_str).is_some());

        for data in declared.chain(committed) {
            let Some(id) = data.get("frame").and_then(Value::as_str) else {
                continue;
            };
            if !seen.insert(id.to_string()) {
                continue;
            }
            frames.push(FrameInfo {
                id: id.to_string(),
                url: data
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                parent: data
                    .get("parent")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }

        frames
    }

    fn compute_time_origin(
        method: TimeOriginDeterminationMethod,
        key_events: &[TraceEvent],
        frame_events: &[TraceEvent],
        main_frame_id: &str,
    ) -> Result<TraceEvent> {
        match method {
            TimeOriginDeterminationMethod::LastNavigationStart => frame_events
                .iter()
                .filter(|e| Self::is_navigation_start_of_interest(e))
                .last()
                .cloned()
                .ok_or_else(|| TraceError::NoNavigationStart {
                    frame_id: main_frame_id.to_string(),
                }),
            TimeOriginDeterminationMethod::FirstResourceSendRequest => key_events
                .iter()
                .find(|e| {
                    e.name == "ResourceSendRequest"
                        && e.data()
                            .and_then(|data| data.get("frame"))
                            .and_then(Value::as_str)
                            == Some(main_frame_id)
                })
                .cloned()
                .ok_or_else(|| TraceError::NoResourceSendRequest {
                    frame_id: main_frame_id.to_string(),
                }),
            TimeOriginDeterminationMethod::LighthouseMarker => key_events
                .iter()
                .find(|e| e.name == TIMESPAN_MARKER_ID)
                .cloned()
                .ok_or(TraceError::NoTimespanMarker),
        }
    }

    fn is_key_event(event: &TraceEvent) -> bool {
        event.category.contains("blink.user_timing")
            || event.category.contains("loading")
            || event.category.contains("devtools.timeline")
            || event.category == "__metadata"
    }
}
