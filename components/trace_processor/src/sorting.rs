//! Deterministic event ordering
//!
//! Events are ordered by timestamp. Events sharing a timestamp are ordered by
//! their nesting structure:
//!
//! 1. `E` events, in arrival order
//! 2. `B`/`X` events, longest first (unmatched `B` counts as unbounded), then arrival order
//! 3. everything else, in arrival order
//!
//! An `E` that closes a zero-length `B` at the same timestamp is placed with the
//! third group so it lands after the begin it closes.
//!
//! A zero-length span (a `B`/`E` pair or an `X` with no duration) that arrives
//! before an `E` closing an enclosing span at that timestamp joins the first
//! group instead, keeping it inside that span.

use std::cmp::Ordering;
use std::collections::HashMap;
use trace_types::{Phase, TraceEvent};

/// Same-timestamp precedence group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    End,
    Begin,
    Other,
}

#[derive(Debug, Clone, Copy)]
struct SortKey {
    timestamp: f64,
    precedence: Precedence,
    /// Enclosing span length, used within the `Begin` group only
    span: f64,
    index: usize,
}

fn compare_keys(a: &SortKey, b: &SortKey) -> Ordering {
    a.timestamp
        .total_cmp(&b.timestamp)
        .then(a.precedence.cmp(&b.precedence))
        .then_with(|| match a.precedence {
            Precedence::Begin => b.span.total_cmp(&a.span),
            _ => Ordering::Equal,
        })
        .then(a.index.cmp(&b.index))
}

/// Indices of `events` that pass `filter`, in deterministic order
fn sorted_indices<F>(events: &[TraceEvent], filter: F) -> Vec<usize>
where
    F: Fn(&TraceEvent) -> bool,
{
    let mut indices: Vec<usize> = (0..events.len()).filter(|&i| filter(&events[i])).collect();

    // Timestamp-only pass, used to pair B/E events per thread and name.
    indices.sort_by(|&a, &b| {
        events[a]
            .timestamp
            .total_cmp(&events[b].timestamp)
            .then(a.cmp(&b))
    });

    let mut spans: HashMap<usize, f64> = HashMap::new();
    let mut zero_length_ends: Vec<bool> = vec![false; events.len()];
    let mut zero_length_pairs: Vec<(usize, usize)> = Vec::new();
    let mut open: HashMap<(u64, u64, &str), Vec<usize>> = HashMap::new();

    for &index in &indices {
        let event = &events[index];
        match event.phase {
            Phase::Begin => {
                open.entry((event.process_id, event.thread_id, event.name.as_str()))
                    .or_default()
                    .push(index);
            }
            Phase::End => {
                let key = (event.process_id, event.thread_id, event.name.as_str());
                if let Some(begin) = open.get_mut(&key).and_then(Vec::pop) {
                    let span = event.timestamp - events[begin].timestamp;
                    spans.insert(begin, span);
                    if span == 0.0 {
                        zero_length_ends[index] = true;
                        zero_length_pairs.push((begin, index));
                    }
                }
            }
            Phase::Complete => {
                spans.insert(index, event.duration.unwrap_or(0.0));
            }
            _ => {}
        }
    }

    // Latest arrival of an `E` closing an earlier span, per timestamp and thread
    let group_key = |event: &TraceEvent| (event.timestamp.to_bits(), event.process_id, event.thread_id);
    let mut last_closing_end: HashMap<(u64, u64, u64), usize> = HashMap::new();
    for &index in &indices {
        let event = &events[index];
        if event.phase == Phase::End && !zero_length_ends[index] {
            let latest = last_closing_end.entry(group_key(event)).or_insert(index);
            *latest = (*latest).max(index);
        }
    }
    let closes_after = |index: usize| {
        last_closing_end
            .get(&group_key(&events[index]))
            .is_some_and(|&end| end > index)
    };

    let mut nested_in_closing: Vec<bool> = vec![false; events.len()];
    for &(begin, end) in &zero_length_pairs {
        if closes_after(begin) {
            nested_in_closing[begin] = true;
            nested_in_closing[end] = true;
        }
    }
    for &index in &indices {
        let event = &events[index];
        if event.phase == Phase::Complete && event.duration.unwrap_or(0.0) == 0.0 && closes_after(index) {
            nested_in_closing[index] = true;
        }
    }

    let mut keys: Vec<SortKey> = indices
        .iter()
        .map(|&index| {
            let event = &events[index];
            let precedence = match event.phase {
                _ if nested_in_closing[index] => Precedence::End,
                Phase::End if !zero_length_ends[index] => Precedence::End,
                Phase::Begin | Phase::Complete => Precedence::Begin,
                _ => Precedence::Other,
            };
            SortKey {
                timestamp: event.timestamp,
                precedence,
                span: spans.get(&index).copied().unwrap_or(f64::INFINITY),
                index,
            }
        })
        .collect();

    keys.sort_by(compare_keys);
    keys.into_iter().map(|key| key.index).collect()
}

/// Clone the events passing `filter`, in deterministic order
pub fn filtered_sort<F>(events: &[TraceEvent], filter: F) -> Vec<TraceEvent>
where
    F: Fn(&TraceEvent) -> bool,
{
    sorted_indices(events, filter)
        .into_iter()
        .map(|index| events[index].clone())
        .collect()
}

/// Sort all events in deterministic order
pub fn sort_events(events: &[TraceEvent]) -> Vec<TraceEvent> {
    filtered_sort(events, |_| true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, phase: Phase, ts: f64) -> TraceEvent {
        TraceEvent::new(name, "toplevel", phase, 1, 1, ts)
    }

    fn names(events: &[TraceEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| format!("{}:{}", e.name, e.phase))
            .collect()
    }

    #[test]
    fn test_sorts_by_timestamp() {
        let events = vec![
            event("c", Phase::Instant, 30.0),
            event("a", Phase::Instant, 10.0),
            event("b", Phase::Instant, 20.0),
        ];
        assert_eq!(names(&sort_events(&events)), vec!["a:I", "b:I", "c:I"]);
    }

    #[test]
    fn test_end_before_begin_at_same_timestamp() {
        let events = vec![
            event("first", Phase::Begin, 0.0),
            event("second", Phase::Begin, 10.0),
            event("first", Phase::End, 10.0),
            event("second", Phase::End, 20.0),
        ];
        assert_eq!(
            names(&sort_events(&events)),
            vec!["first:B", "first:E", "second:B", "second:E"]
        );
    }

    #[test]
    fn test_longer_begin_encloses_shorter() {
        let events = vec![
            event("inner", Phase::Complete, 0.0).with_duration(5.0),
            event("outer", Phase::Complete, 0.0).with_duration(50.0),
            event("middle", Phase::Begin, 0.0),
            event("middle", Phase::End, 20.0),
        ];
        assert_eq!(
            names(&sort_events(&events)),
            vec!["outer:X", "middle:B", "inner:X", "middle:E"]
        );
    }

    #[test]
    fn test_unmatched_begins_keep_arrival_order() {
        let events = vec![
            event("x", Phase::Begin, 5.0),
            event("y", Phase::Begin, 5.0),
            event("z", Phase::Begin, 5.0),
        ];
        assert_eq!(names(&sort_events(&events)), vec!["x:B", "y:B", "z:B"]);
    }

    #[test]
    fn test_zero_length_pair_stays_nested() {
        let events = vec![
            event("zero", Phase::Begin, 5.0),
            event("zero", Phase::End, 5.0),
        ];
        assert_eq!(names(&sort_events(&events)), vec!["zero:B", "zero:E"]);
    }

    #[test]
    fn test_zero_length_span_stays_inside_closing_parent() {
        let events = vec![
            event("call", Phase::Begin, 10.0),
            event("call", Phase::Begin, 10.0),
            event("call", Phase::End, 20.0),
            event("call", Phase::Begin, 20.0),
            event("call", Phase::End, 20.0),
            event("call", Phase::End, 20.0),
        ];
        // The zero-length call at 20 stays open inside the first call
        assert_eq!(sorted_indices(&events, |_| true), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_zero_duration_complete_stays_inside_closing_parent() {
        let events = vec![
            event("outer", Phase::Begin, 0.0),
            event("mark", Phase::Complete, 5.0).with_duration(0.0),
            event("outer", Phase::End, 5.0),
            event("next", Phase::Complete, 5.0).with_duration(3.0),
        ];
        assert_eq!(
            names(&sort_events(&events)),
            vec!["outer:B", "mark:X", "outer:E", "next:X"]
        );
    }

    #[test]
    fn test_other_events_after_begins_in_arrival_order() {
        let events = vec![
            event("mark2", Phase::Instant, 1.0),
            event("task", Phase::Complete, 1.0).with_duration(3.0),
            event("mark1", Phase::Instant, 1.0),
        ];
        assert_eq!(
            names(&sort_events(&events)),
            vec!["task:X", "mark2:I", "mark1:I"]
        );
    }

    #[test]
    fn test_filtered_sort() {
        let events = vec![
            event("keep", Phase::Instant, 2.0),
            event("drop", Phase::Instant, 1.0),
            event("keep", Phase::Instant, 0.0),
        ];
        let sorted = filtered_sort(&events, |e| e.name == "keep");
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].timestamp, 0.0);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let events = vec![
            event("a", Phase::Begin, 1.0),
            event("b", Phase::End, 1.0),
            event("c", Phase::Instant, 1.0),
            event("a", Phase::End, 2.0),
        ];
        assert_eq!(sort_events(&events), sort_events(&events));
    }
}
