//! Function-call synthesis from sampled stacks
//!
//! Each sample names the leaf of the stack that was running. Walking the samples
//! in order and diffing consecutive stacks yields a begin for every frame that
//! was entered and an end for every frame that was left. The true moment of a
//! transition lies somewhere between the two samples around it; precisely-timed
//! tasks are used to narrow it down.

use std::collections::HashMap;
use trace_types::{ProfileNodeId, Result, TraceError};

use crate::collect::validate_profile;
use crate::types::{CpuProfile, KnownTask, SyntheticPhase, SyntheticTaskEvent};

/// Node lookup with memoized depths
struct NodeTable<'a> {
    profile: &'a CpuProfile,
    index: HashMap<ProfileNodeId, usize>,
    parents: Vec<Option<usize>>,
    depths: Vec<usize>,
}

impl<'a> NodeTable<'a> {
    fn build(profile: &'a CpuProfile) -> Result<Self> {
        let index: HashMap<ProfileNodeId, usize> = profile
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();

        let parents = profile
            .nodes
            .iter()
            .map(|node| {
                node.parent
                    .map(|parent| {
                        index.get(&parent).copied().ok_or_else(|| TraceError::UnknownProfileNode {
                            profile_id: profile.id.clone(),
                            node_id: parent,
                        })
                    })
                    .transpose()
            })
            .collect::<Result<Vec<Option<usize>>>>()?;

        let count = profile.nodes.len();
        let mut memo: Vec<Option<usize>> = vec![None; count];
        let mut visited = vec![false; count];

        for start in 0..count {
            let mut chain = Vec::new();
            let mut base = None;
            let mut current = Some(start);

            while let Some(i) = current {
                if let Some(depth) = memo[i] {
                    base = Some(depth);
                    break;
                }
                if visited[i] {
                    return Err(TraceError::ProfileNodeCycle {
                        profile_id: profile.id.clone(),
                        node_id: profile.nodes[i].id,
                    });
                }
                visited[i] = true;
                chain.push(i);
                current = parents[i];
            }

            let mut depth = base.map_or(0, |d| d + 1);
            for &i in chain.iter().rev() {
                memo[i] = Some(depth);
                depth += 1;
            }
        }

        Ok(Self {
            profile,
            index,
            parents,
            depths: memo.into_iter().map(Option::unwrap_or_default).collect(),
        })
    }

    fn lookup(&self, node_id: ProfileNodeId) -> Result<usize> {
        self.index
            .get(&node_id)
            .copied()
            .ok_or_else(|| TraceError::UnknownProfileNode {
                profile_id: self.profile.id.clone(),
                node_id,
            })
    }

    /// Stack depth counting the empty stack as zero
    fn stack_depth(&self, node: Option<usize>) -> usize {
        node.map_or(0, |i| self.depths[i] + 1)
    }

    /// Frames left (deepest first) and entered (shallowest first) between two stacks
    fn transition(&self, from: Option<usize>, to: Option<usize>) -> (Vec<usize>, Vec<usize>) {
        let mut ended = Vec::new();
        let mut begun = Vec::new();
        let (mut from, mut to) = (from, to);

        while self.stack_depth(from) > self.stack_depth(to) {
            let Some(i) = from else { break };
            ended.push(i);
            from = self.parents[i];
        }
        while self.stack_depth(to) > self.stack_depth(from) {
            let Some(i) = to else { break };
            begun.push(i);
            to = self.parents[i];
        }
        while from != to {
            let (Some(i), Some(j)) = (from, to) else { break };
            ended.push(i);
            begun.push(j);
            from = self.parents[i];
            to = self.parents[j];
        }

        begun.reverse();
        (ended, begun)
    }

    fn event(&self, node: usize, phase: SyntheticPhase, timestamp: f64) -> SyntheticTaskEvent {
        let node = &self.profile.nodes[node];
        SyntheticTaskEvent {
            phase,
            timestamp,
            pid: self.profile.pid,
            tid: self.profile.tid,
            node_id: node.id,
            call_frame: node.call_frame.clone(),
            synthetic: true,
        }
    }

    fn emit_transition(
        &self,
        from: Option<usize>,
        to: Option<usize>,
        timestamp: f64,
        events: &mut Vec<SyntheticTaskEvent>,
    ) {
        let (ended, begun) = self.transition(from, to);
        events.extend(ended.into_iter().map(|i| self.event(i, SyntheticPhase::End, timestamp)));
        events.extend(begun.into_iter().map(|i| self.event(i, SyntheticPhase::Begin, timestamp)));
    }
}

/// Two monotonic cursors over the known tasks, one by start and one by end
struct TaskCursors {
    by_start: Vec<KnownTask>,
    by_end: Vec<KnownTask>,
    start_index: usize,
    end_index: usize,
}

impl TaskCursors {
    fn new(known_tasks: &[KnownTask]) -> Self {
        let mut by_start = known_tasks.to_vec();
        by_start.sort_by(|a, b| a.start.total_cmp(&b.start));
        let mut by_end = known_tasks.to_vec();
        by_end.sort_by(|a, b| a.end.total_cmp(&b.end));

        Self {
            by_start,
            by_end,
            start_index: 0,
            end_index: 0,
        }
    }

    /// Best estimate of a transition known to lie in `[earliest, latest)`
    ///
    /// Windows must be queried in increasing order; both cursors only move forward.
    fn effective_timestamp(&mut self, earliest: f64, latest: f64, fallback: f64) -> f64 {
        while self.start_index < self.by_start.len() && self.by_start[self.start_index].start < earliest {
            self.start_index += 1;
        }
        let mut earliest_start: Option<f64> = None;
        while self.start_index < self.by_start.len() && self.by_start[self.start_index].start < latest {
            let task = self.by_start[self.start_index];
            if task.end >= latest {
                earliest_start = Some(earliest_start.map_or(task.start, |s| s.min(task.start)));
            }
            self.start_index += 1;
        }

        while self.end_index < self.by_end.len() && self.by_end[self.end_index].end < earliest {
            self.end_index += 1;
        }
        let mut latest_end: Option<f64> = None;
        while self.end_index < self.by_end.len() && self.by_end[self.end_index].end < latest {
            let task = self.by_end[self.end_index];
            if task.start < earliest {
                latest_end = Some(latest_end.map_or(task.end, |e| e.max(task.end)));
            }
            self.end_index += 1;
        }

        earliest_start.or(latest_end).unwrap_or(fallback)
    }
}

/// Synthesize begin/end events for every call the samples imply
///
/// Events are ordered by timestamp; at each transition ends precede begins.
/// Every frame still open after the last sample is closed at the profile's end
/// time, unless a known task pins it later.
pub fn synthesize_events(
    profile: &CpuProfile,
    known_tasks: &[KnownTask],
) -> Result<Vec<SyntheticTaskEvent>> {
    validate_profile(profile)?;
    let table = NodeTable::build(profile)?;
    let mut cursors = TaskCursors::new(known_tasks);

    let mut events = Vec::new();
    let mut current: Option<usize> = None;
    let mut window_start = profile.start_time;
    let mut timestamp = profile.start_time;

    for (&sample, &delta) in profile.samples.iter().zip(&profile.time_deltas) {
        timestamp += delta.max(0.0);
        let node = table.lookup(sample)?;

        if current != Some(node) {
            let at = cursors.effective_timestamp(window_start, timestamp, timestamp);
            table.emit_transition(current, Some(node), at, &mut events);
            current = Some(node);
        }
        window_start = timestamp;
    }

    if current.is_some() {
        let at = cursors.effective_timestamp(timestamp, f64::INFINITY, timestamp);
        table.emit_transition(current, None, at, &mut events);
    }

    Ok(events)
}
