//! Main-thread busyness and input-latency risk

use tracing::debug;
use trace_types::{to_timing, Phase, TraceEvent};

use crate::processor::TraceProcessor;
use crate::types::{ProcessedTrace, RiskPercentile, TaskDurations, TopLevelEvent};

/// Latency floor (ms) added to every risk estimate, one frame at 60Hz
pub const BASE_RESPONSE_LATENCY: f64 = 16.0;

/// Percentiles reported when none are requested
pub const DEFAULT_RISK_PERCENTILES: [f64; 5] = [0.5, 0.75, 0.9, 0.99, 1.0];

const SCHEDULABLE_TASK_NAMES: [&str; 4] = [
    "RunTask",
    "ThreadControllerImpl::RunTask",
    "ThreadControllerImpl::DoWork",
    "TaskQueueManager::ProcessTaskFromWorkQueue",
];

impl TraceProcessor {
    /// Whether `event` is a top-level task scheduled by the main-thread message loop
    pub fn is_schedulable_task(event: &TraceEvent) -> bool {
        event.phase == Phase::Complete && SCHEDULABLE_TASK_NAMES.contains(&event.name.as_str())
    }

    /// Top-level main-thread tasks overlapping `[start_time, end_time]` (ms from origin)
    ///
    /// Overlapping tasks are trimmed so the result never nests.
    pub fn get_main_thread_top_level_events(
        trace: &ProcessedTrace,
        start_time: f64,
        end_time: f64,
    ) -> Vec<TopLevelEvent> {
        let origin = trace.time_origin_event.timestamp;
        let mut top_level_events: Vec<TopLevelEvent> = Vec::new();

        for event in &trace.main_thread_events {
            let Some(duration) = event.duration.filter(|dur| *dur != 0.0) else {
                continue;
            };
            if !Self::is_schedulable_task(event) {
                continue;
            }

            let start = to_timing(event.timestamp, origin);
            let end = to_timing(event.timestamp + duration, origin);
            if start > end_time || end < start_time {
                continue;
            }

            if let Some(previous) = top_level_events.last_mut() {
                if start < previous.end {
                    previous.end = start - 0.001;
                }
            }

            top_level_events.push(TopLevelEvent {
                start,
                end,
                duration: end - start,
            });
        }

        top_level_events
    }

    /// Durations of `events` inside `[start_time, end_time]`, ascending
    ///
    /// A task starting before the window counts from `start_time`. The part of a
    /// task running past `end_time` is reported as the clipped length.
    pub fn get_main_thread_top_level_event_durations(
        events: &[TopLevelEvent],
        start_time: f64,
        end_time: f64,
    ) -> TaskDurations {
        let mut durations = Vec::with_capacity(events.len());
        let mut clipped_length = 0.0;

        for event in events {
            if event.end < start_time || event.start > end_time {
                continue;
            }

            let mut duration = event.duration;
            let mut event_start = event.start;
            if event_start < start_time {
                event_start = start_time;
                duration = event.end - start_time;
            }
            if event.end > end_time {
                clipped_length = duration - (end_time - event_start);
            }

            durations.push(duration);
        }

        durations.sort_by(f64::total_cmp);

        TaskDurations {
            durations,
            clipped_length,
        }
    }

    /// Expected input latency at each percentile for a window
    pub fn get_risk_to_responsiveness(
        events: &[TopLevelEvent],
        start_time: f64,
        end_time: f64,
        percentiles: &[f64],
    ) -> Vec<RiskPercentile> {
        let total_time = end_time - start_time;
        let mut percentiles = percentiles.to_vec();
        percentiles.sort_by(f64::total_cmp);

        let TaskDurations {
            durations,
            clipped_length,
        } = Self::get_main_thread_top_level_event_durations(events, start_time, end_time);

        debug!(
            "Estimating input latency from {} tasks over {}ms",
            durations.len(),
            total_time
        );

        Self::risk_percentiles(&durations, total_time, &percentiles, clipped_length)
    }

    /// Queueing delay at each percentile for an input arriving uniformly at random
    ///
    /// `durations` must be sorted ascending and `percentiles` ascending. The
    /// cumulative distribution of wait time is walked task by task: an arrival
    /// lands in idle time with probability `completed / total`, and within a task
    /// of length `d` the wait is uniform on `[0, d]`. `clipped_length` is the part
    /// of a task that ran past the window end.
    pub fn risk_percentiles(
        durations: &[f64],
        total_time: f64,
        percentiles: &[f64],
        clipped_length: f64,
    ) -> Vec<RiskPercentile> {
        let mut clipped_length = clipped_length;
        let busy_time: f64 = durations.iter().sum::<f64>() - clipped_length;
        let mut completed_time = total_time - busy_time;
        let mut duration = 0.0_f64;
        let mut cdf_time = completed_time;
        let mut index: isize = -1;

        let mut remaining_count = durations.len() as f64 + 1.0;
        if clipped_length > 0.0 {
            remaining_count -= 1.0;
        }

        let last_index = durations.len() as isize - 1;
        let mut results = Vec::with_capacity(percentiles.len());

        for &percentile in percentiles {
            let percentile_time = percentile * total_time;

            while cdf_time < percentile_time && index < last_index {
                completed_time += duration;
                remaining_count -= if duration < 0.0 { -1.0 } else { 1.0 };

                let next = durations[(index + 1) as usize];
                if clipped_length > 0.0 && clipped_length < next {
                    duration = -clipped_length;
                    clipped_length = 0.0;
                } else {
                    index += 1;
                    duration = next;
                }

                cdf_time = completed_time + duration.abs() * remaining_count;
            }

            let time = ((percentile_time - completed_time) / remaining_count).max(0.0)
                + BASE_RESPONSE_LATENCY;
            results.push(RiskPercentile { percentile, time });
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MainFrameIds, TraceTimestamps, TraceTimings};
    use std::collections::BTreeMap;

    fn times(results: &[RiskPercentile]) -> Vec<f64> {
        results.iter().map(|r| r.time).collect()
    }

    fn task(name: &str, ts: f64, dur: f64) -> TraceEvent {
        TraceEvent::new(name, "toplevel", Phase::Complete, 1, 1, ts).with_duration(dur)
    }

    fn trace(main_thread_events: Vec<TraceEvent>) -> ProcessedTrace {
        ProcessedTrace {
            main_frame_ids: MainFrameIds {
                pid: 1,
                tid: 1,
                frame_id: "F".to_string(),
            },
            main_frame_pids: BTreeMap::from([(1, 1)]),
            frames: Vec::new(),
            time_origin_event: TraceEvent::new("navigationStart", "blink.user_timing", Phase::Mark, 1, 1, 1000.0),
            key_events: Vec::new(),
            main_thread_events,
            process_events: Vec::new(),
            frame_events: Vec::new(),
            frame_tree_events: Vec::new(),
            timestamps: TraceTimestamps {
                time_origin: 1000.0,
                trace_end: 1000.0,
            },
            timings: TraceTimings {
                time_origin: 0.0,
                trace_end: 0.0,
            },
        }
    }

    #[test]
    fn test_zero_tasks_is_baseline() {
        let percentiles = [0.0, 0.25, 0.5, 0.75, 0.9, 0.99, 1.0];
        for window in [1.0, 100.0, 5000.0] {
            let results = TraceProcessor::risk_percentiles(&[], window, &percentiles, 0.0);
            assert_eq!(times(&results), vec![16.0; 7]);
        }
    }

    #[test]
    fn test_single_task_fixture() {
        let results = TraceProcessor::risk_percentiles(
            &[50.0],
            100.0,
            &[0.0, 0.25, 0.5, 0.75, 0.9, 0.99, 1.0],
            0.0,
        );
        assert_eq!(times(&results), vec![16.0, 16.0, 16.0, 41.0, 56.0, 65.0, 66.0]);
    }

    #[test]
    fn test_busy_window() {
        // Fully busy with one task: the median arrival waits half of it.
        let results = TraceProcessor::risk_percentiles(&[100.0], 100.0, &[0.5, 1.0], 0.0);
        assert_eq!(times(&results), vec![66.0, 116.0]);
    }

    #[test]
    fn test_clipped_task_waits_for_its_full_length() {
        // A 100ms task starting halfway through a 100ms window: an arrival at 75ms
        // waits for the remaining 75ms of the task.
        let clipped = TraceProcessor::risk_percentiles(&[100.0], 100.0, &[0.5, 0.75, 1.0], 50.0);
        assert_eq!(times(&clipped), vec![16.0, 91.0, 116.0]);
    }

    #[test]
    fn test_risk_sorts_percentiles() {
        let events = [TopLevelEvent {
            start: 0.0,
            end: 50.0,
            duration: 50.0,
        }];
        let results = TraceProcessor::get_risk_to_responsiveness(&events, 0.0, 100.0, &[1.0, 0.75]);
        assert_eq!(results[0].percentile, 0.75);
        assert_eq!(times(&results), vec![41.0, 66.0]);
    }

    #[test]
    fn test_top_level_events() {
        let trace = trace(vec![
            task("RunTask", 2000.0, 3000.0),
            task("ThreadControllerImpl::DoWork", 11000.0, 0.0),
            task("v8.compile", 12000.0, 1000.0),
            task("ThreadControllerImpl::RunTask", 21000.0, 4000.0),
        ]);
        let events = TraceProcessor::get_main_thread_top_level_events(&trace, 0.0, f64::INFINITY);

        assert_eq!(
            events,
            vec![
                TopLevelEvent { start: 1.0, end: 4.0, duration: 3.0 },
                TopLevelEvent { start: 20.0, end: 24.0, duration: 4.0 },
            ]
        );
    }

    #[test]
    fn test_top_level_events_window() {
        let trace = trace(vec![
            task("RunTask", 2000.0, 1000.0),
            task("RunTask", 11000.0, 1000.0),
            task("RunTask", 51000.0, 1000.0),
        ]);
        let events = TraceProcessor::get_main_thread_top_level_events(&trace, 5.0, 30.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, 10.0);
    }

    #[test]
    fn test_overlapping_tasks_are_trimmed() {
        let trace = trace(vec![task("RunTask", 2000.0, 5000.0), task("RunTask", 4000.0, 1000.0)]);
        let events = TraceProcessor::get_main_thread_top_level_events(&trace, 0.0, f64::INFINITY);
        assert_eq!(events[0].end, 3.0 - 0.001);
        assert_eq!(events[1].start, 3.0);
    }

    #[test]
    fn test_durations_clip_to_window() {
        let events = [
            TopLevelEvent { start: 0.0, end: 20.0, duration: 20.0 },
            TopLevelEvent { start: 30.0, end: 35.0, duration: 5.0 },
            TopLevelEvent { start: 90.0, end: 130.0, duration: 40.0 },
            TopLevelEvent { start: 200.0, end: 210.0, duration: 10.0 },
        ];
        let result =
            TraceProcessor::get_main_thread_top_level_event_durations(&events, 10.0, 100.0);

        assert_eq!(result.durations, vec![5.0, 10.0, 40.0]);
        assert_eq!(result.clipped_length, 30.0);
    }
}
