//! Type definitions for critical request chains

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trace_processor::ProcessedTrace;
use trace_types::NetworkRecord;

/// Root request id → chain rooted at that request
pub type CriticalChains = BTreeMap<String, CriticalChainNode>;

/// What the builder needs to know about the navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationContext {
    /// Main frame of the navigation
    pub main_frame_id: String,
    /// Time origin in seconds, the network record clock
    pub time_origin: f64,
}

impl NavigationContext {
    /// Create a navigation context
    pub fn new(main_frame_id: impl Into<String>, time_origin: f64) -> Self {
        Self {
            main_frame_id: main_frame_id.into(),
            time_origin,
        }
    }

    /// Context for the navigation of a processed trace
    pub fn from_processed_trace(trace: &ProcessedTrace) -> Self {
        Self {
            main_frame_id: trace.main_frame_ids.frame_id.clone(),
            time_origin: trace.timestamps.time_origin / 1_000_000.0,
        }
    }
}

/// Chain construction options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOptions {
    /// Drop requests that started before the time origin
    pub exclude_before_time_origin: bool,
}

/// One request in a chain and the requests it initiated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalChainNode {
    pub request: NetworkRecord,
    pub children: BTreeMap<String, CriticalChainNode>,
}

impl CriticalChainNode {
    /// Leaf node for a request
    pub fn new(request: NetworkRecord) -> Self {
        Self {
            request,
            children: BTreeMap::new(),
        }
    }

    /// Number of requests on the longest path from this node to a leaf
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(&CriticalChainNode, usize)> = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.children.values().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// Number of requests in this subtree
    pub fn count_nodes(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&CriticalChainNode> = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.values());
        }
        count
    }
}

impl Drop for CriticalChainNode {
    // Flatten the subtree first so dropping a deep chain does not recurse
    fn drop(&mut self) {
        let mut pending: Vec<CriticalChainNode> = std::mem::take(&mut self.children).into_values().collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(std::mem::take(&mut node.children).into_values());
        }
    }
}

/// Number of requests on the longest chain
pub fn longest_chain_length(chains: &CriticalChains) -> usize {
    chains.values().map(CriticalChainNode::depth).max().unwrap_or(0)
}
