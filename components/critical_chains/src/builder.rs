//! CriticalRequestChainBuilder implementation
//!
//! Links every request to the request that caused it, then keeps the eligible
//! part of that forest. A request whose parent was excluded is dropped along
//! with everything below it.

use std::collections::{HashMap, HashSet};
use tracing::debug;
use trace_types::NetworkRecord;

use crate::eligibility::is_eligible;
use crate::types::{ChainOptions, CriticalChainNode, CriticalChains, NavigationContext};

const REDIRECT_SUFFIX: &str = ":redirect";

/// Where a request ends up in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement<'a> {
    Root,
    Child(&'a str),
    Pruned,
}

/// Stateless critical chain construction
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalRequestChainBuilder;

impl CriticalRequestChainBuilder {
    /// Build the chains with default options
    pub fn build(records: &[NetworkRecord], context: &NavigationContext) -> CriticalChains {
        Self::build_with_options(records, context, &ChainOptions::default())
    }

    /// Build the chains
    ///
    /// The result does not depend on the order of `records`.
    pub fn build_with_options(
        records: &[NetworkRecord],
        context: &NavigationContext,
        options: &ChainOptions,
    ) -> CriticalChains {
        let graph = RequestGraph::new(records, context, options);

        // Pass one: decide where every request goes.
        let mut placements: HashMap<&str, Placement> = HashMap::with_capacity(graph.by_id.len());
        for &id in graph.by_id.keys() {
            graph.place(id, &mut placements);
        }

        // Pass two: wire children under their parents.
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut roots: Vec<&str> = Vec::new();
        for (&id, &placement) in &placements {
            match placement {
                Placement::Root => roots.push(id),
                Placement::Child(parent) => children.entry(parent).or_default().push(id),
                Placement::Pruned => {}
            }
        }

        let chains: CriticalChains = roots
            .into_iter()
            .filter_map(|id| {
                let node = graph.assemble(id, &children)?;
                Some((id.to_string(), node))
            })
            .collect();

        debug!(
            "Built {} critical chains from {} network records",
            chains.len(),
            records.len()
        );
        chains
    }
}

/// Requests indexed for parent resolution
struct RequestGraph<'a> {
    by_id: HashMap<&'a str, &'a NetworkRecord>,
    by_url: HashMap<&'a str, Vec<&'a NetworkRecord>>,
    context: &'a NavigationContext,
    options: &'a ChainOptions,
}

impl<'a> RequestGraph<'a> {
    fn new(records: &'a [NetworkRecord], context: &'a NavigationContext, options: &'a ChainOptions) -> Self {
        let mut by_id: HashMap<&str, &NetworkRecord> = HashMap::with_capacity(records.len());
        let mut by_url: HashMap<&str, Vec<&NetworkRecord>> = HashMap::new();

        for record in records {
            by_id.entry(record.request_id.as_str()).or_insert(record);
            by_url.entry(record.url.as_str()).or_default().push(record);
        }

        Self {
            by_id,
            by_url,
            context,
            options,
        }
    }

    /// Eligibility, judged on the final destination of a redirect chain
    fn is_eligible_request(&self, id: &str) -> bool {
        let mut final_id = id.to_string();
        loop {
            let next = format!("{}{}", final_id, REDIRECT_SUFFIX);
            if !self.by_id.contains_key(next.as_str()) {
                break;
            }
            final_id = next;
        }

        self.by_id
            .get(final_id.as_str())
            .is_some_and(|record| is_eligible(record, self.context, self.options))
    }

    fn known_id(&self, id: &str) -> Option<&'a str> {
        self.by_id.get_key_value(id).map(|(known, _)| *known)
    }

    /// The request that caused `record`, if any
    fn parent_of(&self, record: &'a NetworkRecord) -> Option<&'a str> {
        if let Some(base) = record.request_id.strip_suffix(REDIRECT_SUFFIX) {
            if let Some(parent) = self.known_id(base) {
                return Some(parent);
            }
        }

        if let Some(parent) = record.initiator.request_id.as_deref() {
            if parent != record.request_id {
                if let Some(parent) = self.known_id(parent) {
                    return Some(parent);
                }
            }
        }

        let url = record.initiator.url.as_deref()?;
        self.by_url
            .get(url)?
            .iter()
            .copied()
            .filter(|candidate| candidate.request_id != record.request_id)
            .min_by(|a, b| {
                let a_other_frame = a.frame_id != record.frame_id;
                let b_other_frame = b.frame_id != record.frame_id;
                a_other_frame
                    .cmp(&b_other_frame)
                    .then(a.start_time.total_cmp(&b.start_time))
                    .then(a.request_id.cmp(&b.request_id))
            })
            .map(|candidate| candidate.request_id.as_str())
    }

    /// Resolve the placement of `id` and of every unresolved ancestor above it
    fn place(&self, id: &'a str, placements: &mut HashMap<&'a str, Placement<'a>>) -> Placement<'a> {
        if let Some(&placement) = placements.get(id) {
            return placement;
        }

        let mut chain: Vec<&'a str> = Vec::new();
        let mut on_chain: HashSet<&'a str> = HashSet::new();
        let mut current = id;

        // Placement of the topmost request on the chain
        let top = loop {
            if let Some(&placement) = placements.get(current) {
                break match placement {
                    Placement::Pruned => Placement::Pruned,
                    _ => Placement::Child(current),
                };
            }
            if !on_chain.insert(current) {
                debug!("Pruning initiator cycle through request {}", current);
                break Placement::Pruned;
            }
            chain.push(current);

            let Some(&record) = self.by_id.get(current) else {
                break Placement::Pruned;
            };
            if !self.is_eligible_request(current) {
                break Placement::Pruned;
            }
            let Some(parent) = self.parent_of(record) else {
                break Placement::Root;
            };

            let parent_is_data = self.by_id.get(parent).is_some_and(|p| p.is_data_url());
            if parent_is_data || !self.is_eligible_request(parent) {
                debug!("Dropping request {} under excluded parent {}", current, parent);
                break Placement::Pruned;
            }
            current = parent;
        };

        let mut placement = top;
        while let Some(member) = chain.pop() {
            placements.insert(member, placement);
            placement = match placement {
                Placement::Pruned => Placement::Pruned,
                _ => Placement::Child(member),
            };
        }

        placements.get(id).copied().unwrap_or(Placement::Pruned)
    }

    /// Build the tree under `root` without recursing, so chain depth is unbounded
    fn assemble(&self, root: &'a str, children: &HashMap<&str, Vec<&'a str>>) -> Option<CriticalChainNode> {
        // Pre-order walk; every node precedes its descendants
        let mut order: Vec<&'a str> = Vec::new();
        let mut visited: HashSet<&'a str> = HashSet::new();
        let mut pending: Vec<&'a str> = vec![root];
        while let Some(id) = pending.pop() {
            if !visited.insert(id) || !self.by_id.contains_key(id) {
                continue;
            }
            order.push(id);
            pending.extend(children.get(id).map(Vec::as_slice).unwrap_or_default());
        }

        let mut built: HashMap<&'a str, CriticalChainNode> = HashMap::with_capacity(order.len());
        for &id in order.iter().rev() {
            let Some(record) = self.by_id.get(id) else { continue };
            let mut node = CriticalChainNode::new((*record).clone());
            for &child in children.get(id).map(Vec::as_slice).unwrap_or_default() {
                if let Some(child_node) = built.remove(child) {
                    node.children.insert(child.to_string(), child_node);
                }
            }
            built.insert(id, node);
        }

        built.remove(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_types::Initiator;

    fn context() -> NavigationContext {
        NavigationContext::new("MAIN", 0.0)
    }

    fn document() -> NetworkRecord {
        NetworkRecord::new("1", "https://a.com/").with_timing(1.0, 1.2)
    }

    #[test]
    fn test_empty_input() {
        assert!(CriticalRequestChainBuilder::build(&[], &context()).is_empty());
    }

    #[test]
    fn test_initiator_request_wins_over_url() {
        let records = vec![
            document(),
            NetworkRecord::new("2", "https://a.com/app.js").with_initiator(Initiator::parser("https://a.com/")),
            NetworkRecord::new("3", "https://a.com/lazy.js").with_initiator(Initiator {
                request_id: Some("2".into()),
                ..Initiator::parser("https://a.com/")
            }),
        ];
        let chains = CriticalRequestChainBuilder::build(&records, &context());

        let app = &chains["1"].children["2"];
        assert!(app.children.contains_key("3"));
        assert_eq!(chains["1"].children.len(), 1);
    }

    #[test]
    fn test_unknown_initiator_makes_root() {
        let records = vec![NetworkRecord::new("7", "https://a.com/x.js").with_initiator(Initiator::request("missing"))];
        let chains = CriticalRequestChainBuilder::build(&records, &context());
        assert!(chains.contains_key("7"));
    }

    #[test]
    fn test_cycle_is_pruned() {
        let records = vec![
            document(),
            NetworkRecord::new("a", "https://a.com/a.js").with_initiator(Initiator::request("b")),
            NetworkRecord::new("b", "https://a.com/b.js").with_initiator(Initiator::request("a")),
        ];
        let chains = CriticalRequestChainBuilder::build(&records, &context());

        assert_eq!(chains.keys().collect::<Vec<_>>(), vec!["1"]);
        assert!(chains["1"].children.is_empty());
    }

    #[test]
    fn test_data_url_is_leaf() {
        let records = vec![
            document(),
            NetworkRecord::new("2", "data:image/png;base64,AAAA").with_initiator(Initiator::parser("https://a.com/")),
            NetworkRecord::new("3", "https://a.com/after.js").with_initiator(Initiator::request("2")),
        ];
        let chains = CriticalRequestChainBuilder::build(&records, &context());

        let data = &chains["1"].children["2"];
        assert!(data.children.is_empty());
        assert_eq!(chains["1"].count_nodes(), 2);
    }

    #[test]
    fn test_initiator_url_prefers_same_frame() {
        let records = vec![
            NetworkRecord::new("early", "https://a.com/lib.js").with_timing(1.0, 1.1),
            NetworkRecord::new("main", "https://a.com/lib.js")
                .with_timing(2.0, 2.1)
                .with_frame_id("MAIN"),
            NetworkRecord::new("child", "https://a.com/img.png")
                .with_frame_id("MAIN")
                .with_initiator(Initiator::parser("https://a.com/lib.js")),
        ];
        let chains = CriticalRequestChainBuilder::build(&records, &context());

        assert!(chains["main"].children.contains_key("child"));
        assert!(chains["early"].children.is_empty());
    }

    #[test]
    fn test_very_long_chain() {
        let depth = 50_000;
        let mut records = vec![document()];
        for i in 2..=depth {
            records.push(
                NetworkRecord::new(i.to_string(), format!("https://a.com/{}.js", i))
                    .with_initiator(Initiator::request((i - 1).to_string())),
            );
        }
        let chains = CriticalRequestChainBuilder::build(&records, &context());

        assert_eq!(chains.len(), 1);
        assert_eq!(chains["1"].count_nodes(), depth);
        assert_eq!(chains["1"].depth(), depth);
    }
}
