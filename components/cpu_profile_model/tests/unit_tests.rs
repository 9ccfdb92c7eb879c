//! Unit tests for CpuProfileModel
//!
//! Covers fragment merging, stack discipline and known-task refinement.

use cpu_profile_model::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use trace_types::{CallFrame, ErrorCode, Phase, ProfileNode, TraceEvent, TraceLog};

const START: f64 = 1_000_000.0;

/// root -> (program), root -> Foo -> Bar, root -> Baz
fn fixture_profile() -> CpuProfile {
    let nodes = vec![
        ProfileNode::new(1, CallFrame::named("(root)"), None),
        ProfileNode::new(2, CallFrame::named("(program)"), Some(1)),
        ProfileNode::new(3, CallFrame::named("Foo").with_url("fileA.js"), Some(1)),
        ProfileNode::new(4, CallFrame::named("Bar").with_url("fileA.js"), Some(3)),
        ProfileNode::new(5, CallFrame::named("Baz").with_url("fileA.js"), Some(1)),
    ];
    let samples = vec![2, 2, 3, 4, 3, 3, 2, 5, 1, 1];
    let mut time_deltas = vec![1000.0; 10];
    time_deltas[0] = 10000.0;

    CpuProfile::new("P1", 7, 8, START)
        .with_nodes(nodes)
        .with_samples(samples, time_deltas)
}

/// `B<node>@<µs since start>` for each event
fn relative_summary(events: &[SyntheticTaskEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| {
            let phase = match e.phase {
                SyntheticPhase::Begin => "B",
                SyntheticPhase::End => "E",
            };
            format!("{}{}@{}", phase, e.node_id, e.timestamp - START)
        })
        .collect()
}

#[test]
fn test_stack_discipline() {
    // Test that each visited node opens and closes exactly once, properly nested
    let events = CpuProfileModel::synthesize_trace_events(&fixture_profile(), &[]).unwrap();

    assert_eq!(
        relative_summary(&events),
        vec![
            "B1@10000", "B2@10000", "E2@12000", "B3@12000", "B4@13000", "E4@14000", "E3@16000",
            "B2@16000", "E2@17000", "B5@17000", "E5@18000", "E1@19000",
        ]
    );

    let mut stack: Vec<u32> = Vec::new();
    for event in &events {
        match event.phase {
            SyntheticPhase::Begin => stack.push(event.node_id),
            SyntheticPhase::End => assert_eq!(stack.pop(), Some(event.node_id)),
        }
    }
    assert!(stack.is_empty());
    assert_eq!(events.last().map(|e| e.node_id), Some(1));
}

#[test]
fn test_known_task_refinement() {
    // Test that precisely-timed tasks pin the ambiguous transition timestamps
    let known_tasks = [
        KnownTask::new(START + 8000.0, START + 19500.0),
        KnownTask::new(START + 12500.0, START + 13400.0),
    ];
    let events = CpuProfileModel::synthesize_trace_events(&fixture_profile(), &known_tasks).unwrap();

    assert_eq!(
        relative_summary(&events),
        vec![
            "B1@8000", "B2@8000", "E2@12000", "B3@12000", "B4@12500", "E4@13400", "E3@16000",
            "B2@16000", "E2@17000", "B5@17000", "E5@18000", "E1@19500",
        ]
    );
}

#[test]
fn test_events_carry_call_frames() {
    // Test that synthesized events are tagged and keep their origin
    let events = CpuProfileModel::synthesize_trace_events(&fixture_profile(), &[]).unwrap();
    let bar = events.iter().find(|e| e.node_id == 4).unwrap();

    assert!(events.iter().all(|e| e.synthetic && e.pid == 7 && e.tid == 8));
    assert_eq!(bar.call_frame.function_name, "Bar");
    assert_eq!(bar.call_frame.url, "fileA.js");
}

#[test]
fn test_collect_merges_fragments() {
    // Test that nodes, samples and deltas from separate fragments are stitched by id
    let cat = "disabled-by-default-v8.cpu_profiler";
    let events = vec![
        TraceEvent::new("Profile", cat, Phase::Sample, 7, 8, 1100.0)
            .with_id("A")
            .with_args(json!({"data": {"startTime": 1000}})),
        TraceEvent::new("ProfileChunk", cat, Phase::Sample, 7, 8, 1200.0)
            .with_id("A")
            .with_args(json!({"data": {"cpuProfile": {"nodes": [
                {"id": 1, "callFrame": {"functionName": "(root)"}},
                {"id": 2, "callFrame": {"functionName": "main", "url": "app.js"}, "parent": 1}
            ]}}})),
        TraceEvent::new("ProfileChunk", cat, Phase::Sample, 7, 8, 1300.0)
            .with_id("A")
            .with_args(json!({"data": {"cpuProfile": {"samples": [1, 2, 2]}}})),
        TraceEvent::new("ProfileChunk", cat, Phase::Sample, 7, 8, 1400.0)
            .with_id("A")
            .with_args(json!({"data": {"timeDeltas": [5, 10, 10]}})),
        TraceEvent::new("ProfileChunk", cat, Phase::Sample, 7, 8, 1500.0)
            .with_args(json!({"data": {"cpuProfile": {"samples": [9]}, "timeDeltas": [1]}})),
    ];
    let profiles = CpuProfileModel::collect_profile_events(&TraceLog::new(events)).unwrap();

    assert_eq!(profiles.len(), 1);
    let profile = &profiles[0];
    assert_eq!(profile.id, "A");
    assert_eq!(profile.start_time, 1000.0);
    assert_eq!(profile.nodes.len(), 2);
    assert_eq!(profile.samples, vec![1, 2, 2]);
    assert_eq!(profile.time_deltas, vec![5.0, 10.0, 10.0]);
    assert_eq!(profile.end_time(), 1025.0);
}

#[test]
fn test_collect_keeps_earliest_start() {
    // Test that a later Profile fragment does not move the start forward
    let events = vec![
        TraceEvent::new("Profile", "v8", Phase::Sample, 1, 2, 500.0)
            .with_id("A")
            .with_args(json!({"data": {"startTime": 500}})),
        TraceEvent::new("Profile", "v8", Phase::Sample, 3, 4, 900.0)
            .with_id("A")
            .with_args(json!({"data": {"startTime": 900}})),
    ];
    let profiles = CpuProfileModel::collect_profile_events(&TraceLog::new(events)).unwrap();

    assert_eq!(profiles[0].start_time, 500.0);
    assert_eq!((profiles[0].pid, profiles[0].tid), (1, 2));
}

#[test]
fn test_collect_rejects_mismatched_lengths() {
    // Test that a structurally invalid profile fails fast
    let events = vec![TraceEvent::new("ProfileChunk", "v8", Phase::Sample, 1, 2, 0.0)
        .with_id("A")
        .with_args(json!({"data": {
            "cpuProfile": {"nodes": [{"id": 1, "callFrame": {}}], "samples": [1, 1]},
            "timeDeltas": [1]
        }}))];
    let err = CpuProfileModel::collect_profile_events(&TraceLog::new(events)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProfileLengthMismatch);
}

#[test]
fn test_collect_rejects_wrongly_typed_entries() {
    // Test that a non-numeric sample fails instead of shifting later samples onto other deltas
    let events = vec![TraceEvent::new("ProfileChunk", "v8", Phase::Sample, 1, 2, 0.0)
        .with_id("A")
        .with_args(json!({"data": {
            "cpuProfile": {"nodes": [{"id": 1, "callFrame": {}}], "samples": [1, "bogus", 1]},
            "timeDeltas": [5, 10, null]
        }}))];
    let err = CpuProfileModel::collect_profile_events(&TraceLog::new(events)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MalformedProfile);
}

#[test]
fn test_synthesize_events_for_log() {
    // Test that a whole log yields trace events refined by its own tasks
    let cat = "disabled-by-default-v8.cpu_profiler";
    let events = vec![
        TraceEvent::new("Profile", cat, Phase::Sample, 7, 8, 0.0)
            .with_id("A")
            .with_args(json!({"data": {"startTime": 0}})),
        TraceEvent::new("ProfileChunk", cat, Phase::Sample, 7, 8, 50.0)
            .with_id("A")
            .with_args(json!({"data": {
                "cpuProfile": {
                    "nodes": [
                        {"id": 1, "callFrame": {"functionName": "(root)"}},
                        {"id": 2, "callFrame": {"functionName": "work"}, "parent": 1}
                    ],
                    "samples": [2, 2, 1]
                },
                "timeDeltas": [100, 100, 100]
            }})),
        TraceEvent::new("RunTask", "disabled-by-default-devtools.timeline", Phase::Complete, 7, 8, 40.0)
            .with_duration(250.0),
    ];
    let merged = CpuProfileModel::synthesize_events_for_log(&TraceLog::new(events)).unwrap();
    assert_eq!(merged.len(), 7);
    let synthesized = &merged.events[3..];

    let summary: Vec<(String, f64)> = synthesized
        .iter()
        .map(|e| (e.phase.to_string(), e.timestamp))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("B".to_string(), 40.0),
            ("B".to_string(), 40.0),
            ("E".to_string(), 290.0),
            ("E".to_string(), 300.0),
        ]
    );
    assert!(synthesized
        .iter()
        .all(|e| e.name == SYNTHETIC_EVENT_NAME && e.category == SYNTHETIC_EVENT_CATEGORY));
}
