//! Frame tree resolution

use std::collections::{HashMap, HashSet};
use trace_types::{Result, TraceError};

use crate::types::FrameInfo;

/// Map every frame id to the id of its root ancestor
///
/// Frames may be listed in any order; a parent may appear after its children.
/// A parent that is referenced but never declared is treated as a root. Chains
/// are walked iteratively and every frame on a walked chain is memoized, so
/// shared prefixes are only walked once. A cyclic parent graph is rejected with
/// [`TraceError::FrameCycle`].
pub fn resolve_root_frames(frames: &[FrameInfo]) -> Result<HashMap<String, String>> {
    let parents: HashMap<&str, Option<&str>> = frames
        .iter()
        .map(|frame| (frame.id.as_str(), frame.parent.as_deref()))
        .collect();

    let mut roots: HashMap<String, String> = HashMap::with_capacity(frames.len());

    for frame in frames {
        if roots.contains_key(&frame.id) {
            continue;
        }

        let mut chain: Vec<&str> = Vec::new();
        let mut on_chain: HashSet<&str> = HashSet::new();
        let mut current = frame.id.as_str();

        let root = loop {
            if let Some(root) = roots.get(current) {
                break root.clone();
            }
            match parents.get(current).copied() {
                // Undeclared frame: a parent reference with no declaration of its own
                None => break current.to_string(),
                Some(parent) => {
                    if !on_chain.insert(current) {
                        return Err(TraceError::FrameCycle {
                            frame_id: current.to_string(),
                        });
                    }
                    chain.push(current);
                    match parent {
                        Some(parent) => current = parent,
                        None => break current.to_string(),
                    }
                }
            }
        };

        for id in chain {
            roots.insert(id.to_string(), root.clone());
        }
    }

    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_types::ErrorCode;

    #[test]
    fn test_single_frame_maps_to_itself() {
        let roots = resolve_root_frames(&[FrameInfo::new("A", None)]).unwrap();
        assert_eq!(roots.get("A").map(String::as_str), Some("A"));
    }

    #[test]
    fn test_chain_maps_to_root() {
        let frames = vec![
            FrameInfo::new("C", Some("B")),
            FrameInfo::new("B", Some("A")),
            FrameInfo::new("A", None),
        ];
        let roots = resolve_root_frames(&frames).unwrap();

        assert_eq!(roots.len(), 3);
        for id in ["A", "B", "C"] {
            assert_eq!(roots[id], "A");
        }
    }

    #[test]
    fn test_independent_trees() {
        let frames = vec![
            FrameInfo::new("A", None),
            FrameInfo::new("A1", Some("A")),
            FrameInfo::new("X", None),
            FrameInfo::new("X1", Some("X")),
            FrameInfo::new("X2", Some("X1")),
        ];
        let roots = resolve_root_frames(&frames).unwrap();

        assert_eq!(roots["A1"], "A");
        assert_eq!(roots["X2"], "X");
        assert_eq!(roots["X"], "X");
    }

    #[test]
    fn test_undeclared_parent_is_root() {
        let roots = resolve_root_frames(&[FrameInfo::new("B", Some("A"))]).unwrap();
        assert_eq!(roots["B"], "A");
        assert!(!roots.contains_key("A"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let frames = vec![
            FrameInfo::new("A", Some("C")),
            FrameInfo::new("B", Some("A")),
            FrameInfo::new("C", Some("B")),
        ];
        let err = resolve_root_frames(&frames).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FrameCycle);
    }

    #[test]
    fn test_self_parent_is_rejected() {
        let err = resolve_root_frames(&[FrameInfo::new("A", Some("A"))]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FrameCycle);
    }
}
