//! Profile fragment collection
//!
//! `Profile` and `ProfileChunk` events are emitted with no closing marker. Each
//! id accumulates into its own builder; builders are finalized and
//! validated only when the collected profiles are read.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use trace_types::{ProfileNode, ProfileNodeId, Result, TraceError, TraceEvent};

use crate::types::CpuProfile;

/// Accumulated state for one profile id
#[derive(Debug, Default)]
struct ProfileBuilder {
    id: String,
    thread: Option<(u64, u64)>,
    profile_start: Option<f64>,
    first_fragment_ts: Option<f64>,
    nodes: Vec<ProfileNode>,
    samples: Vec<ProfileNodeId>,
    time_deltas: Vec<f64>,
}

impl ProfileBuilder {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    fn malformed(&self, field: &'static str, reason: impl Into<String>) -> TraceError {
        TraceError::MalformedProfile {
            profile_id: self.id.clone(),
            field,
            reason: reason.into(),
        }
    }

    /// Elements of an array field, rejecting a field of any other type
    fn array<'v>(&self, field: &'static str, value: Option<&'v Value>) -> Result<&'v [Value]> {
        match value {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(self.malformed(field, format!("expected an array, found {}", other))),
        }
    }

    fn add_fragment(&mut self, event: &TraceEvent) -> Result<()> {
        let data = event.data();

        if event.name == "Profile" {
            let start = data
                .and_then(|d| d.get("startTime"))
                .and_then(Value::as_f64)
                .unwrap_or(event.timestamp);
            if self.profile_start.map_or(true, |current| start < current) {
                self.profile_start = Some(start);
                self.thread = Some((event.process_id, event.thread_id));
            }
        }
        if self.first_fragment_ts.map_or(true, |current| event.timestamp < current) {
            self.first_fragment_ts = Some(event.timestamp);
        }
        if self.thread.is_none() {
            self.thread = Some((event.process_id, event.thread_id));
        }

        let Some(data) = data else { return Ok(()) };
        let cpu_profile = data.get("cpuProfile");

        if let Some(nodes) = cpu_profile.and_then(|p| p.get("nodes")) {
            let nodes = serde_json::from_value::<Vec<ProfileNode>>(nodes.clone())
                .map_err(|err| self.malformed("nodes", err.to_string()))?;
            self.nodes.extend(nodes);
        }

        let samples = self.array("samples", cpu_profile.and_then(|p| p.get("samples")))?;
        let samples = samples
            .iter()
            .enumerate()
            .map(|(position, sample)| {
                sample
                    .as_u64()
                    .and_then(|id| ProfileNodeId::try_from(id).ok())
                    .ok_or_else(|| self.malformed("samples", format!("{} at position {}", sample, position)))
            })
            .collect::<Result<Vec<_>>>()?;

        let time_deltas = data
            .get("timeDeltas")
            .or_else(|| cpu_profile.and_then(|p| p.get("timeDeltas")));
        let time_deltas = self
            .array("timeDeltas", time_deltas)?
            .iter()
            .enumerate()
            .map(|(position, delta)| {
                delta
                    .as_f64()
                    .ok_or_else(|| self.malformed("timeDeltas", format!("{} at position {}", delta, position)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.samples.extend(samples);
        self.time_deltas.extend(time_deltas);
        Ok(())
    }

    fn finish(self) -> Result<CpuProfile> {
        let (pid, tid) = self.thread.unwrap_or_default();
        let start_time = self
            .profile_start
            .or(self.first_fragment_ts)
            .unwrap_or_default();

        let profile = CpuProfile {
            id: self.id,
            pid,
            tid,
            start_time,
            nodes: self.nodes,
            samples: self.samples,
            time_deltas: self.time_deltas,
        };
        validate_profile(&profile)?;
        Ok(profile)
    }
}

/// Check that a profile is structurally sound
///
/// Samples and deltas must pair up, every sample and parent must name a declared
/// node, and parent links must not form a cycle.
pub fn validate_profile(profile: &CpuProfile) -> Result<()> {
    if profile.samples.len() != profile.time_deltas.len() {
        return Err(TraceError::ProfileLengthMismatch {
            profile_id: profile.id.clone(),
            samples: profile.samples.len(),
            time_deltas: profile.time_deltas.len(),
        });
    }

    let parents: HashMap<ProfileNodeId, Option<ProfileNodeId>> = profile
        .nodes
        .iter()
        .map(|node| (node.id, node.parent))
        .collect();

    let unknown = |node_id: ProfileNodeId| TraceError::UnknownProfileNode {
        profile_id: profile.id.clone(),
        node_id,
    };

    for &sample in &profile.samples {
        if !parents.contains_key(&sample) {
            return Err(unknown(sample));
        }
    }

    let mut acyclic: HashSet<ProfileNodeId> = HashSet::with_capacity(parents.len());
    for node in &profile.nodes {
        let mut chain: HashSet<ProfileNodeId> = HashSet::new();
        let mut current = Some(node.id);
        while let Some(id) = current {
            if acyclic.contains(&id) {
                break;
            }
            if !chain.insert(id) {
                return Err(TraceError::ProfileNodeCycle {
                    profile_id: profile.id.clone(),
                    node_id: id,
                });
            }
            current = match parents.get(&id) {
                Some(parent) => *parent,
                None => return Err(unknown(id)),
            };
        }
        acyclic.extend(chain);
    }

    Ok(())
}

/// Merge all profile fragments in `events` by id
///
/// Profiles are returned in order of their first fragment. Fragments without an
/// id cannot be attributed and are dropped.
pub fn collect_profiles(events: &[TraceEvent]) -> Result<Vec<CpuProfile>> {
    let mut order: Vec<String> = Vec::new();
    let mut builders: HashMap<String, ProfileBuilder> = HashMap::new();

    for event in events {
        if event.name != "Profile" && event.name != "ProfileChunk" {
            continue;
        }
        let Some(id) = event.id.as_deref() else {
            debug!("Dropping {} fragment without an id at {}", event.name, event.timestamp);
            continue;
        };

        let builder = builders.entry(id.to_string()).or_insert_with(|| {
            order.push(id.to_string());
            ProfileBuilder::new(id)
        });
        builder.add_fragment(event)?;
    }

    let mut profiles = Vec::with_capacity(order.len());
    for id in order {
        if let Some(builder) = builders.remove(&id) {
            profiles.push(builder.finish()?);
        }
    }

    debug!("Collected {} CPU profiles", profiles.len());
    Ok(profiles)
}
