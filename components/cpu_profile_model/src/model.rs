//! CpuProfileModel implementation

use tracing::debug;
use trace_types::{Result, TraceEvent, TraceLog};

use crate::collect::collect_profiles;
use crate::synthesize::synthesize_events;
use crate::types::{CpuProfile, KnownTask, SyntheticTaskEvent};

/// Entry points for turning sampled profiles into trace events
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuProfileModel;

impl CpuProfileModel {
    /// Merge every `Profile`/`ProfileChunk` fragment in the log into profiles
    pub fn collect_profile_events(log: &TraceLog) -> Result<Vec<CpuProfile>> {
        collect_profiles(&log.events)
    }

    /// Synthesize begin/end events for a profile, refined by `known_tasks`
    pub fn synthesize_trace_events(
        profile: &CpuProfile,
        known_tasks: &[KnownTask],
    ) -> Result<Vec<SyntheticTaskEvent>> {
        synthesize_events(profile, known_tasks)
    }

    /// A copy of the log with synthesized events appended for every profile
    ///
    /// Each profile is refined with the complete events recorded on its own thread.
    pub fn synthesize_events_for_log(log: &TraceLog) -> Result<TraceLog> {
        let mut synthesized: Vec<TraceEvent> = Vec::new();

        for profile in Self::collect_profile_events(log)? {
            let known_tasks = KnownTask::from_trace_events(&log.events, profile.pid, profile.tid);
            let events = Self::synthesize_trace_events(&profile, &known_tasks)?;
            debug!(
                "Synthesized {} events from profile {} ({} known tasks)",
                events.len(),
                profile.id,
                known_tasks.len()
            );
            synthesized.extend(events.iter().map(SyntheticTaskEvent::to_trace_event));
        }

        let mut merged = log.clone();
        merged.events.extend(synthesized);
        Ok(merged)
    }
}
